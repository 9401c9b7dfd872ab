use super::bintable::BinTable;
use super::header::{Card, Header};
use crate::domain::ConvertResult;

pub const BLOCK_SIZE: usize = 2880;

/// A FITS file made of an empty primary HDU followed by binary tables.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FitsFile {
    tables: Vec<BinTable>,
}

impl FitsFile {
    pub fn new(tables: Vec<BinTable>) -> Self {
        Self { tables }
    }

    pub fn tables(&self) -> &[BinTable] {
        &self.tables
    }

    pub fn table(&self, name: &str) -> Option<&BinTable> {
        self.tables.iter().find(|table| table.name() == name)
    }

    pub fn encode(&self) -> ConvertResult<Vec<u8>> {
        let mut bytes = primary_header().encode(BLOCK_SIZE)?;
        for table in &self.tables {
            bytes.extend(table.header().encode(BLOCK_SIZE)?);

            let mut data = table.data();
            let padded = data.len().div_ceil(BLOCK_SIZE) * BLOCK_SIZE;
            data.resize(padded, 0);
            bytes.extend(data);
        }
        Ok(bytes)
    }
}

fn primary_header() -> Header {
    let mut header = Header::new();
    header.push(Card::new("SIMPLE", true).with_comment("conforms to FITS standard"));
    header.push(Card::new("BITPIX", 8_i64));
    header.push(Card::new("NAXIS", 0_i64));
    header.push(Card::new("EXTEND", true));
    header
}
