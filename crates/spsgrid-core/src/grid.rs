//! Grid assembly: template records flattened into per-sample columns.
//!
//! Every non-line column holds exactly one value per sample. Line records are
//! sparse; `line_rows` maps each sample to its line record, if any, so the
//! line table never has to infer alignment from positions.

use crate::domain::{AGE_AXIS, ConvertError, ConvertResult};
use crate::template::{EmissionLineRecord, StepDiagnostics, TemplateDiagnostics, TemplateRecord};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct GridColumn {
    pub name: String,
    pub values: Vec<f32>,
}

impl GridColumn {
    fn empty(name: &str) -> Self {
        Self {
            name: name.to_string(),
            values: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    axes: Vec<GridColumn>,
    wavelengths: Option<Vec<f32>>,
    spectra: Vec<Vec<f32>>,
    diagnostics: Vec<GridColumn>,
    quantities: Vec<GridColumn>,
    line_rows: Vec<Option<usize>>,
    lines: Vec<EmissionLineRecord>,
    template_count: usize,
}

impl Grid {
    pub fn new<A, Q>(axis_names: A, quantity_names: Q) -> Self
    where
        A: IntoIterator,
        A::Item: AsRef<str>,
        Q: IntoIterator,
        Q::Item: AsRef<str>,
    {
        let diagnostics = TemplateDiagnostics::NAMES
            .iter()
            .chain(StepDiagnostics::NAMES.iter())
            .map(|name| GridColumn::empty(name))
            .collect();

        Self {
            axes: axis_names
                .into_iter()
                .map(|name| GridColumn::empty(name.as_ref()))
                .collect(),
            wavelengths: None,
            spectra: Vec::new(),
            diagnostics,
            quantities: quantity_names
                .into_iter()
                .map(|name| GridColumn::empty(name.as_ref()))
                .collect(),
            line_rows: Vec::new(),
            lines: Vec::new(),
            template_count: 0,
        }
    }

    /// Appends every step of `record`. Non-age axis values come from
    /// `axis_values` and are broadcast over the template's steps.
    ///
    /// The record is validated in full before any column grows.
    pub fn append(
        &mut self,
        record: TemplateRecord,
        axis_values: &BTreeMap<String, f32>,
    ) -> ConvertResult<()> {
        let n_steps = record.step_count();
        let template = record.source.display().to_string();

        if record.steps.len() != n_steps {
            return Err(ConvertError::length_mismatch(
                "spectrum",
                n_steps,
                record.steps.len(),
            ));
        }

        let expected_width = self
            .wavelengths
            .as_ref()
            .map_or(record.wavelengths.len(), Vec::len);
        if record.wavelengths.len() != expected_width {
            return Err(ConvertError::length_mismatch(
                "wavelengths",
                expected_width,
                record.wavelengths.len(),
            ));
        }
        if let Some(step) = record
            .steps
            .iter()
            .find(|step| step.continuum.len() != expected_width)
        {
            return Err(ConvertError::length_mismatch(
                "spectrum",
                expected_width,
                step.continuum.len(),
            ));
        }

        let mut broadcast = Vec::with_capacity(self.axes.len());
        for axis in &self.axes {
            if axis.name == AGE_AXIS {
                broadcast.push(None);
                continue;
            }
            let value = axis_values.get(&axis.name).copied().ok_or_else(|| {
                ConvertError::MissingTemplateParameter {
                    template: template.clone(),
                    parameter: axis.name.clone(),
                }
            })?;
            broadcast.push(Some(value));
        }

        let mut quantity_values = Vec::with_capacity(self.quantities.len());
        for column in &self.quantities {
            let series = record
                .quantities
                .iter()
                .find(|series| series.name == column.name)
                .ok_or_else(|| ConvertError::MissingColumn {
                    path: record.source.clone(),
                    column: column.name.clone(),
                })?;
            if series.values.len() != n_steps {
                return Err(ConvertError::length_mismatch(
                    &column.name,
                    n_steps,
                    series.values.len(),
                ));
            }
            quantity_values.push(series.values.as_slice());
        }

        for (axis, value) in self.axes.iter_mut().zip(&broadcast) {
            match value {
                Some(value) => axis.values.extend(std::iter::repeat_n(*value, n_steps)),
                None => axis.values.extend_from_slice(&record.time_steps),
            }
        }
        for (column, values) in self.quantities.iter_mut().zip(quantity_values) {
            column.values.extend_from_slice(values);
        }

        let template_diagnostics = record.diagnostics.values();
        for step in record.steps {
            let step_diagnostics = step.diagnostics.values();
            let values = template_diagnostics.iter().chain(step_diagnostics.iter());
            for (column, value) in self.diagnostics.iter_mut().zip(values) {
                column.values.push(*value);
            }

            self.spectra.push(step.continuum);
            match step.lines {
                Some(lines) => {
                    self.line_rows.push(Some(self.lines.len()));
                    self.lines.push(lines);
                }
                None => self.line_rows.push(None),
            }
        }

        if self.wavelengths.is_none() {
            self.wavelengths = Some(record.wavelengths);
        }
        self.template_count += 1;
        self.check_invariants()?;

        tracing::debug!(
            template = %template,
            samples = self.sample_count(),
            line_samples = self.line_sample_count(),
            "appended template to grid"
        );
        Ok(())
    }

    pub fn template_count(&self) -> usize {
        self.template_count
    }

    pub fn sample_count(&self) -> usize {
        self.spectra.len()
    }

    pub fn line_sample_count(&self) -> usize {
        self.lines.len()
    }

    pub fn wavelengths(&self) -> &[f32] {
        self.wavelengths.as_deref().unwrap_or_default()
    }

    pub fn axes(&self) -> &[GridColumn] {
        &self.axes
    }

    pub fn axis(&self, name: &str) -> Option<&GridColumn> {
        self.axes.iter().find(|axis| axis.name == name)
    }

    /// Sorted distinct values of one axis.
    pub fn unique_axis_values(&self, name: &str) -> Option<Vec<f32>> {
        let mut values = self.axis(name)?.values.clone();
        values.sort_by(f32::total_cmp);
        values.dedup();
        Some(values)
    }

    pub fn spectra(&self) -> &[Vec<f32>] {
        &self.spectra
    }

    /// Decoded diagnostics, template-level first, in output order.
    pub fn diagnostics(&self) -> &[GridColumn] {
        &self.diagnostics
    }

    pub fn quantities(&self) -> &[GridColumn] {
        &self.quantities
    }

    pub fn line_record(&self, sample: usize) -> Option<&EmissionLineRecord> {
        let row = (*self.line_rows.get(sample)?)?;
        self.lines.get(row)
    }

    pub fn has_lines(&self, sample: usize) -> bool {
        matches!(self.line_rows.get(sample), Some(Some(_)))
    }

    fn check_invariants(&self) -> ConvertResult<()> {
        let samples = self.sample_count();
        let columns = self
            .axes
            .iter()
            .chain(&self.diagnostics)
            .chain(&self.quantities)
            .map(|column| (column.name.as_str(), column.values.len()))
            .chain(std::iter::once(("line presence", self.line_rows.len())));

        for (name, length) in columns {
            if length != samples {
                return Err(ConvertError::length_mismatch(name, samples, length));
            }
        }

        let present = self.line_rows.iter().flatten().count();
        if present != self.lines.len() {
            return Err(ConvertError::length_mismatch(
                "line records",
                present,
                self.lines.len(),
            ));
        }
        Ok(())
    }
}
