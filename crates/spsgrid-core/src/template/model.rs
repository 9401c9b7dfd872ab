use crate::companion::QuantitySeries;
use std::path::PathBuf;

/// Whole-file diagnostics of the ionising-region model, broadcast to every
/// step of the template.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TemplateDiagnostics {
    pub m_hii_region: f32,
    pub filling_factor: f32,
    pub inner_radius: f32,
    pub metal_fraction: f32,
    pub dust_fraction: f32,
}

impl TemplateDiagnostics {
    pub const NAMES: [&'static str; 5] = ["mHIIR", "epsfil", "rad0", "fracmet", "fracdust"];

    pub fn values(&self) -> [f32; 5] {
        [
            self.m_hii_region,
            self.filling_factor,
            self.inner_radius,
            self.metal_fraction,
            self.dust_fraction,
        ]
    }
}

/// Per-step scalar diagnostics decoded ahead of each continuum.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StepDiagnostics {
    pub column_density: f32,
    pub electron_temperature: f32,
    pub density_weighted_temperature: f32,
    pub lyman_continuum_rate: f32,
}

impl StepDiagnostics {
    pub const NAMES: [&'static str; 4] = ["colden", "temp_elec", "temp_eden_elec", "qlyc"];

    pub fn values(&self) -> [f32; 4] {
        [
            self.column_density,
            self.electron_temperature,
            self.density_weighted_temperature,
            self.lyman_continuum_rate,
        ]
    }
}

/// Line block of one step, positionally aligned to the emission-line
/// catalog.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EmissionLineRecord {
    pub luminosities: Vec<f32>,
    pub equivalent_widths: Vec<f32>,
}

impl EmissionLineRecord {
    pub fn len(&self) -> usize {
        self.luminosities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.luminosities.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemplateStep {
    pub diagnostics: StepDiagnostics,
    pub continuum: Vec<f32>,
    pub lines: Option<EmissionLineRecord>,
}

/// Everything decoded from one template file, plus the companion quantities
/// merged in afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateRecord {
    pub source: PathBuf,
    pub time_steps: Vec<f32>,
    pub wavelengths: Vec<f32>,
    pub diagnostics: TemplateDiagnostics,
    pub steps: Vec<TemplateStep>,
    pub quantities: Vec<QuantitySeries>,
}

impl TemplateRecord {
    pub fn step_count(&self) -> usize {
        self.time_steps.len()
    }

    pub fn line_step_count(&self) -> usize {
        self.steps.iter().filter(|step| step.lines.is_some()).count()
    }
}
