use crate::companion::{HeaderLine, TextTable};
use crate::config::expand_env_vars;
use crate::domain::{ConvertError, ConvertResult};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const FILE_NAME_COLUMN: &str = "file_name";

/// One row of the templates list: a binary template and its position on the
/// non-age grid axes.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateEntry {
    pub file: PathBuf,
    pub axis_values: BTreeMap<String, f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemplatesList {
    path: PathBuf,
    entries: Vec<TemplateEntry>,
}

impl TemplatesList {
    /// Loads the list at `path`. The first comment line names the columns;
    /// later comment lines are skipped. Template names resolve against
    /// `folder` when given, otherwise against the list's own directory.
    pub fn load<'a>(
        path: &Path,
        folder: Option<&Path>,
        parameters: impl IntoIterator<Item = &'a str>,
    ) -> ConvertResult<Self> {
        let table = TextTable::load_with(path, HeaderLine::First)?;
        let base_dir = match folder {
            Some(folder) => folder.to_path_buf(),
            None => path.parent().map(Path::to_path_buf).unwrap_or_default(),
        };
        Self::from_table(&table, &base_dir, parameters)
    }

    pub fn from_table<'a>(
        table: &TextTable,
        base_dir: &Path,
        parameters: impl IntoIterator<Item = &'a str>,
    ) -> ConvertResult<Self> {
        if table.row_count() == 0 {
            return Err(ConvertError::MalformedTable {
                path: table.path().to_path_buf(),
                line: 0,
                reason: "templates list names no templates".to_string(),
            });
        }

        let files = table
            .column_str(FILE_NAME_COLUMN)?
            .into_iter()
            .map(|name| resolve_template(base_dir, name))
            .collect::<Vec<_>>();

        let mut entries = files
            .into_iter()
            .map(|file| TemplateEntry {
                file,
                axis_values: BTreeMap::new(),
            })
            .collect::<Vec<_>>();

        for parameter in parameters {
            let values = table.column_f32(parameter)?;
            for (entry, value) in entries.iter_mut().zip(values) {
                entry.axis_values.insert(parameter.to_string(), value);
            }
        }

        Ok(Self {
            path: table.path().to_path_buf(),
            entries,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entries(&self) -> &[TemplateEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// File stem of the list, used to name the output containers.
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "grid".to_string())
    }

    /// Directory holding the list; outputs land here unless redirected.
    pub fn directory(&self) -> PathBuf {
        self.path.parent().map(Path::to_path_buf).unwrap_or_default()
    }
}

fn resolve_template(base_dir: &Path, name: &str) -> PathBuf {
    let expanded = PathBuf::from(expand_env_vars(name));
    if expanded.is_absolute() {
        expanded
    } else {
        base_dir.join(expanded)
    }
}
