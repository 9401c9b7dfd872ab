//! Decoding of the unformatted binary record stream written by the
//! photoionisation code (`*.ineb` templates).

mod cursor;

pub use cursor::{BinaryCursor, RECORD_MARKER_BYTES};
