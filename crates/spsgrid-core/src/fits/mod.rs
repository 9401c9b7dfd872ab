//! Minimal FITS writer: an empty primary HDU followed by float32 binary
//! tables.

mod bintable;
mod header;
mod writer;

pub use bintable::{BinTable, Column};
pub use header::{CARD_SIZE, Card, CardValue, Header};
pub use writer::{BLOCK_SIZE, FitsFile};
