use crate::domain::{ConvertError, ConvertResult};
use std::fs;
use std::path::{Path, PathBuf};

/// Which `#` comment line names the columns of a [`TextTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeaderLine {
    /// The comment line right before the trailing data block. Rows of earlier
    /// blocks are dropped. Companion files written by the population-synthesis
    /// code prepend free-form banners and repeat the header above the data.
    #[default]
    BeforeTrailingBlock,
    /// The first non-empty comment line. Later comment lines are ignored and
    /// every data row is kept, so commented-out rows and banners below the
    /// header are skipped.
    First,
}

/// Whitespace-separated text table whose column names sit on a `#` comment
/// line.
#[derive(Debug, Clone, PartialEq)]
pub struct TextTable {
    path: PathBuf,
    columns: Vec<String>,
    rows: Vec<TableRow>,
}

#[derive(Debug, Clone, PartialEq)]
struct TableRow {
    line: usize,
    cells: Vec<String>,
}

impl TextTable {
    pub fn load(path: &Path) -> ConvertResult<Self> {
        Self::load_with(path, HeaderLine::default())
    }

    pub fn load_with(path: &Path, header_line: HeaderLine) -> ConvertResult<Self> {
        let source = fs::read_to_string(path)
            .map_err(|source| ConvertError::io("read text table", path, source))?;
        Self::parse_with(path, &source, header_line)
    }

    pub fn parse(path: &Path, source: &str) -> ConvertResult<Self> {
        Self::parse_with(path, source, HeaderLine::default())
    }

    pub fn parse_with(path: &Path, source: &str, header_line: HeaderLine) -> ConvertResult<Self> {
        match header_line {
            HeaderLine::BeforeTrailingBlock => Self::parse_trailing_block(path, source),
            HeaderLine::First => Self::parse_first_header(path, source),
        }
    }

    fn parse_first_header(path: &Path, source: &str) -> ConvertResult<Self> {
        let mut header: Option<Vec<String>> = None;
        let mut rows: Vec<TableRow> = Vec::new();

        for (index, line) in source.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            if let Some(comment) = trimmed.strip_prefix('#') {
                if header.is_none() {
                    let names = comment_names(comment);
                    if !names.is_empty() {
                        header = Some(names);
                    }
                }
                continue;
            }

            if header.is_none() {
                return Err(ConvertError::MalformedTable {
                    path: path.to_path_buf(),
                    line: index + 1,
                    reason: "data row before the commented column header".to_string(),
                });
            }
            rows.push(TableRow {
                line: index + 1,
                cells: trimmed.split_whitespace().map(str::to_string).collect(),
            });
        }

        let columns = header.ok_or_else(|| missing_header(path))?;
        Ok(Self {
            path: path.to_path_buf(),
            columns,
            rows,
        })
    }

    fn parse_trailing_block(path: &Path, source: &str) -> ConvertResult<Self> {
        let mut pending_header: Option<Vec<String>> = None;
        let mut header: Option<Vec<String>> = None;
        let mut rows: Vec<TableRow> = Vec::new();
        let mut block_open = false;

        for (index, line) in source.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            if let Some(comment) = trimmed.strip_prefix('#') {
                let names = comment_names(comment);
                if !names.is_empty() {
                    pending_header = Some(names);
                }
                block_open = false;
                continue;
            }

            if !block_open {
                rows.clear();
                header = pending_header.clone();
                block_open = true;
            }
            rows.push(TableRow {
                line: index + 1,
                cells: trimmed.split_whitespace().map(str::to_string).collect(),
            });
        }

        // A header with no data rows after it still names the columns.
        if rows.is_empty() {
            header = pending_header;
        }

        let columns = header.ok_or_else(|| missing_header(path))?;

        Ok(Self {
            path: path.to_path_buf(),
            columns,
            rows,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|column| column == name)
    }

    pub fn column_str(&self, name: &str) -> ConvertResult<Vec<&str>> {
        let index = self.column_index(name)?;
        self.rows
            .iter()
            .map(|row| {
                row.cells
                    .get(index)
                    .map(String::as_str)
                    .ok_or_else(|| self.short_row(row, name))
            })
            .collect()
    }

    pub fn column_f32(&self, name: &str) -> ConvertResult<Vec<f32>> {
        let index = self.column_index(name)?;
        self.rows
            .iter()
            .map(|row| {
                let cell = row
                    .cells
                    .get(index)
                    .ok_or_else(|| self.short_row(row, name))?;
                cell.parse::<f32>().map_err(|_| ConvertError::MalformedTable {
                    path: self.path.clone(),
                    line: row.line,
                    reason: format!("column '{name}' value '{cell}' is not a number"),
                })
            })
            .collect()
    }

    fn column_index(&self, name: &str) -> ConvertResult<usize> {
        self.columns
            .iter()
            .position(|column| column == name)
            .ok_or_else(|| ConvertError::MissingColumn {
                path: self.path.clone(),
                column: name.to_string(),
            })
    }

    fn short_row(&self, row: &TableRow, name: &str) -> ConvertError {
        ConvertError::MalformedTable {
            path: self.path.clone(),
            line: row.line,
            reason: format!(
                "row has {} cells, column '{name}' is missing",
                row.cells.len()
            ),
        }
    }
}

fn comment_names(comment: &str) -> Vec<String> {
    comment
        .trim_start_matches('#')
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

fn missing_header(path: &Path) -> ConvertError {
    ConvertError::MalformedTable {
        path: path.to_path_buf(),
        line: 1,
        reason: "missing commented column header".to_string(),
    }
}
