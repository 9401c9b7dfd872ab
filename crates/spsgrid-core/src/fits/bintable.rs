use super::header::{Card, Header};
use crate::domain::{ConvertError, ConvertResult};

const FLOAT32_BYTES: usize = 4;

/// A float32 (`E`) column with a fixed repeat count per row, stored
/// row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    unit: Option<String>,
    repeat: usize,
    shaped: bool,
    values: Vec<f32>,
}

impl Column {
    /// One value per row.
    pub fn scalar(name: impl Into<String>, values: Vec<f32>) -> Self {
        Self {
            name: name.into(),
            unit: None,
            repeat: 1,
            shaped: false,
            values,
        }
    }

    /// One fixed-length vector per row; every row must hold `width` values.
    pub fn vector<'a, I>(name: impl Into<String>, width: usize, rows: I) -> ConvertResult<Self>
    where
        I: IntoIterator<Item = &'a [f32]>,
    {
        let name = name.into();
        let mut values = Vec::new();
        for row in rows {
            if row.len() != width {
                return Err(ConvertError::length_mismatch(&name, width, row.len()));
            }
            values.extend_from_slice(row);
        }

        Ok(Self {
            name,
            unit: None,
            repeat: width,
            shaped: true,
            values,
        })
    }

    /// A single-row vector column.
    pub fn single_row(name: impl Into<String>, values: Vec<f32>) -> Self {
        Self {
            name: name.into(),
            unit: None,
            repeat: values.len(),
            shaped: true,
            values,
        }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    pub fn repeat(&self) -> usize {
        self.repeat
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn row_count(&self) -> usize {
        if self.repeat == 0 {
            0
        } else {
            self.values.len() / self.repeat
        }
    }

    pub fn width_bytes(&self) -> usize {
        self.repeat * FLOAT32_BYTES
    }

    pub fn tform(&self) -> String {
        format!("{}E", self.repeat)
    }

    pub fn tdim(&self) -> Option<String> {
        self.shaped.then(|| format!("({})", self.repeat))
    }

    fn row(&self, index: usize) -> &[f32] {
        let start = index * self.repeat;
        &self.values[start..start + self.repeat]
    }
}

/// A binary-table extension. Every column must carry the same row count.
#[derive(Debug, Clone, PartialEq)]
pub struct BinTable {
    name: String,
    rows: Option<usize>,
    columns: Vec<Column>,
    cards: Vec<Card>,
}

impl BinTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: None,
            columns: Vec::new(),
            cards: Vec::new(),
        }
    }

    /// Fixes the row count up front, so zero-width columns cannot leave it
    /// ambiguous.
    pub fn with_rows(mut self, rows: usize) -> Self {
        self.rows = Some(rows);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.name == name)
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn push_column(&mut self, column: Column) -> ConvertResult<()> {
        let expected_values = self.rows.map(|rows| rows * column.repeat);
        match expected_values {
            Some(expected) if column.values.len() != expected => {
                let rows = self.rows.unwrap_or_default();
                let actual = if column.repeat == 0 {
                    rows
                } else {
                    column.values.len() / column.repeat
                };
                return Err(ConvertError::length_mismatch(&column.name, rows, actual));
            }
            Some(_) => {}
            None if column.repeat > 0 => self.rows = Some(column.row_count()),
            None => {}
        }

        self.columns.push(column);
        Ok(())
    }

    /// Extra cards stamped after the mandatory keywords.
    pub fn push_card(&mut self, card: Card) {
        self.cards.push(card);
    }

    pub fn row_count(&self) -> usize {
        self.rows.unwrap_or_default()
    }

    pub fn row_width(&self) -> usize {
        self.columns.iter().map(Column::width_bytes).sum()
    }

    pub fn header(&self) -> Header {
        let mut header = Header::new();
        header.push(Card::new("XTENSION", "BINTABLE").with_comment("binary table extension"));
        header.push(Card::new("BITPIX", 8_i64));
        header.push(Card::new("NAXIS", 2_i64));
        header.push(Card::new("NAXIS1", self.row_width()).with_comment("width of table in bytes"));
        header.push(Card::new("NAXIS2", self.row_count()).with_comment("number of rows"));
        header.push(Card::new("PCOUNT", 0_i64));
        header.push(Card::new("GCOUNT", 1_i64));
        header.push(Card::new("TFIELDS", self.columns.len()));

        for (index, column) in self.columns.iter().enumerate() {
            let n = index + 1;
            header.push(Card::new(format!("TTYPE{n}"), column.name.as_str()));
            header.push(Card::new(format!("TFORM{n}"), column.tform()));
            if let Some(unit) = &column.unit {
                header.push(Card::new(format!("TUNIT{n}"), unit.as_str()));
            }
            if let Some(dim) = column.tdim() {
                header.push(Card::new(format!("TDIM{n}"), dim));
            }
        }

        header.push(Card::new("EXTNAME", self.name.as_str()));
        for card in &self.cards {
            header.push(card.clone());
        }
        header
    }

    /// Row-interleaved big-endian payload, unpadded.
    pub fn data(&self) -> Vec<u8> {
        let rows = self.row_count();
        let mut bytes = Vec::with_capacity(rows * self.row_width());
        for row in 0..rows {
            for column in &self.columns {
                for value in column.row(row) {
                    bytes.extend_from_slice(&value.to_be_bytes());
                }
            }
        }
        bytes
    }
}
