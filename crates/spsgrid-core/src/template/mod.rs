//! Template record extraction: one binary template file in, one
//! [`TemplateRecord`] out.

mod extractor;
mod model;

pub use extractor::{IONIC_FRACTION_BYTES, TemplateExtractor};
pub use model::{
    EmissionLineRecord, StepDiagnostics, TemplateDiagnostics, TemplateRecord, TemplateStep,
};
