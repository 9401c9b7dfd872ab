use super::model::{
    EmissionLineRecord, StepDiagnostics, TemplateDiagnostics, TemplateRecord, TemplateStep,
};
use crate::binary::BinaryCursor;
use crate::companion::load_additional_quantities;
use crate::config::AdditionalQuantitySpec;
use crate::domain::{ByteOrder, ConvertError, ConvertResult, DecodeError};
use std::fs;
use std::path::Path;

/// Ionic-fraction block written after the step diagnostics: 16 doubles.
pub const IONIC_FRACTION_BYTES: usize = 16 * 8;

/// Word at the head of the continuum record, ahead of the fluxes.
const SPECTRUM_LEADING_WORD_BYTES: usize = 4;

/// Line-presence marker value announcing a line block after the continuum.
const LINES_PRESENT: i32 = 0;

/// Decodes template files one at a time, caching the wavelength axis of the
/// first file and checking every later file against it.
#[derive(Debug, Clone, Default)]
pub struct TemplateExtractor {
    byte_order: ByteOrder,
    wavelengths: Option<Vec<f32>>,
}

impl TemplateExtractor {
    pub fn new(byte_order: ByteOrder) -> Self {
        Self {
            byte_order,
            wavelengths: None,
        }
    }

    pub fn wavelengths(&self) -> Option<&[f32]> {
        self.wavelengths.as_deref()
    }

    /// Reads and decodes `path`, then merges the companion quantities
    /// declared in `groups`.
    pub fn extract(
        &mut self,
        path: &Path,
        groups: &[AdditionalQuantitySpec],
    ) -> ConvertResult<TemplateRecord> {
        let mut record = {
            let bytes =
                fs::read(path).map_err(|source| ConvertError::io("read template", path, source))?;
            self.decode(path, &bytes)?
        };

        record.quantities = load_additional_quantities(path, record.step_count(), groups)?;
        tracing::info!(
            template = %path.display(),
            steps = record.step_count(),
            line_steps = record.line_step_count(),
            quantities = record.quantities.len(),
            "extracted template"
        );
        Ok(record)
    }

    /// Decodes one template byte stream. `source` names the file in errors.
    pub fn decode(&mut self, source: &Path, bytes: &[u8]) -> ConvertResult<TemplateRecord> {
        let mut cursor = BinaryCursor::with_byte_order(bytes, self.byte_order);
        let decoded = decode_stream(&mut cursor).map_err(|error| error.in_template(source))?;
        if !cursor.is_exhausted() {
            tracing::debug!(
                template = %source.display(),
                trailing_bytes = cursor.remaining(),
                "ignoring bytes after the last time step"
            );
        }

        let wavelengths = self.check_wavelengths(source, decoded.wavelengths)?;
        Ok(TemplateRecord {
            source: source.to_path_buf(),
            time_steps: decoded.time_steps,
            wavelengths,
            diagnostics: decoded.diagnostics,
            steps: decoded.steps,
            quantities: Vec::new(),
        })
    }

    fn check_wavelengths(&mut self, source: &Path, decoded: Vec<f32>) -> ConvertResult<Vec<f32>> {
        let Some(cached) = &self.wavelengths else {
            tracing::debug!(
                template = %source.display(),
                points = decoded.len(),
                "caching wavelength axis"
            );
            self.wavelengths = Some(decoded.clone());
            return Ok(decoded);
        };

        if cached.len() != decoded.len() {
            return Err(ConvertError::length_mismatch(
                "wavelengths",
                cached.len(),
                decoded.len(),
            ));
        }
        if let Some(index) = cached
            .iter()
            .zip(&decoded)
            .position(|(cached, decoded)| cached.to_bits() != decoded.to_bits())
        {
            return Err(ConvertError::WavelengthAxisMismatch {
                template: source.to_path_buf(),
                index,
            });
        }

        Ok(decoded)
    }
}

struct DecodedTemplate {
    time_steps: Vec<f32>,
    wavelengths: Vec<f32>,
    diagnostics: TemplateDiagnostics,
    steps: Vec<TemplateStep>,
}

fn decode_stream(cursor: &mut BinaryCursor<'_>) -> Result<DecodedTemplate, DecodeError> {
    cursor.skip_marker()?;
    let n_steps = cursor.read_count("time step")?;
    let time_steps = cursor.read_float32_array(n_steps)?;

    cursor.skip_record_markers()?;
    let n_wavelengths = cursor.read_count("wavelength")?;
    let wavelengths = cursor.read_float32_array(n_wavelengths)?;

    cursor.skip_record_markers()?;
    let m_hii_region = cursor.read_float32()?;
    let filling_factor = cursor.read_float32()?;

    cursor.skip_record_markers()?;
    let diagnostics = TemplateDiagnostics {
        m_hii_region,
        filling_factor,
        inner_radius: cursor.read_float32()?,
        metal_fraction: cursor.read_float32()?,
        dust_fraction: cursor.read_float32()?,
    };

    let mut steps = Vec::with_capacity(n_steps);
    if n_steps > 0 {
        // Empty record separating the header from the per-step records.
        cursor.skip_record_markers()?;
        cursor.skip_marker()?;
    }
    for _ in 0..n_steps {
        steps.push(decode_step(cursor, n_wavelengths)?);
    }

    Ok(DecodedTemplate {
        time_steps,
        wavelengths,
        diagnostics,
        steps,
    })
}

fn decode_step(
    cursor: &mut BinaryCursor<'_>,
    n_wavelengths: usize,
) -> Result<TemplateStep, DecodeError> {
    cursor.skip_marker()?;
    let diagnostics = StepDiagnostics {
        column_density: cursor.read_float32()?,
        electron_temperature: cursor.read_float32()?,
        density_weighted_temperature: cursor.read_float32()?,
        lyman_continuum_rate: cursor.read_float32()?,
    };
    cursor.skip(IONIC_FRACTION_BYTES)?;

    cursor.skip_record_markers()?;
    let line_marker = cursor.read_int32()?;

    cursor.skip_record_markers()?;
    cursor.skip(SPECTRUM_LEADING_WORD_BYTES)?;
    let continuum = cursor.read_float32_array(n_wavelengths)?;

    let lines = if line_marker == LINES_PRESENT {
        cursor.skip_record_markers()?;
        let n_lines = cursor.read_count("emission line")?;
        let capacity = n_lines.min(cursor.remaining() / 8);
        let mut luminosities = Vec::with_capacity(capacity);
        let mut equivalent_widths = Vec::with_capacity(capacity);
        for _ in 0..n_lines {
            luminosities.push(cursor.read_float32()?);
            equivalent_widths.push(cursor.read_float32()?);
        }
        cursor.skip_marker()?;
        Some(EmissionLineRecord {
            luminosities,
            equivalent_widths,
        })
    } else {
        cursor.skip_marker()?;
        None
    };

    Ok(TemplateStep {
        diagnostics,
        continuum,
        lines,
    })
}
