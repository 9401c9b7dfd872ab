//! Conversion of stellar-population template grids into FITS containers.
//!
//! [`pipeline::convert`] is the entry point; the other modules are the
//! stages it drives and are public for tools that need only one of them.

pub mod binary;
pub mod catalog;
pub mod companion;
pub mod config;
pub mod container;
pub mod domain;
pub mod fits;
pub mod grid;
pub mod pipeline;
pub mod template;

pub use domain::{ConvertError, ConvertResult};
pub use pipeline::{ConversionSummary, ConvertRequest, convert};
