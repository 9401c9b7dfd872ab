//! End-to-end conversion: configuration in, FITS containers out.

mod templates_list;

pub use templates_list::{FILE_NAME_COLUMN, TemplateEntry, TemplatesList};

use crate::catalog::EmissionLineCatalog;
use crate::config::{ConversionConfig, SplitSpec};
use crate::container::{ContainerLayout, build_containers, write_containers};
use crate::domain::ConvertResult;
use crate::grid::Grid;
use crate::template::TemplateExtractor;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertRequest {
    pub config_path: PathBuf,
    pub template_folder: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub split_override: Option<SplitSpec>,
    pub fallback_split: Option<SplitSpec>,
}

impl ConvertRequest {
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            template_folder: None,
            output_dir: None,
            split_override: None,
            fallback_split: None,
        }
    }

    pub fn with_template_folder(mut self, folder: impl Into<PathBuf>) -> Self {
        self.template_folder = Some(folder.into());
        self
    }

    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(output_dir.into());
        self
    }

    /// Partitions the output by `split`, taking precedence over any split in
    /// the configuration.
    pub fn with_split(mut self, split: SplitSpec) -> Self {
        self.split_override = Some(split);
        self
    }

    /// Partitions the output by `split` only when the configuration names no
    /// split of its own.
    pub fn with_fallback_split(mut self, split: SplitSpec) -> Self {
        self.fallback_split = Some(split);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConversionSummary {
    pub templates: usize,
    pub samples: usize,
    pub line_samples: usize,
    pub outputs: Vec<PathBuf>,
}

/// Runs one conversion. Every template is decoded and every container built
/// before the first output file is written; any failure leaves no output.
pub fn convert(request: &ConvertRequest) -> ConvertResult<ConversionSummary> {
    let config = ConversionConfig::load(&request.config_path)?;
    let split = request
        .split_override
        .clone()
        .or_else(|| config.split.clone())
        .or_else(|| request.fallback_split.clone());
    if let Some(split) = &split {
        config.validate_split(split)?;
    }

    let catalog = EmissionLineCatalog::load(&config.emission_lines_list)?;
    let templates = TemplatesList::load(
        &config.templates_list,
        request.template_folder.as_deref(),
        config.template_parameters(),
    )?;
    let layout = ContainerLayout::new(templates.stem())
        .with_split(split)
        .with_resolution_fwhm(config.resolution_fwhm)
        .with_header(&config.header)?;

    tracing::info!(
        config = %request.config_path.display(),
        templates = templates.len(),
        catalog_lines = catalog.len(),
        byte_order = %config.byte_order,
        "starting conversion"
    );

    let mut extractor = TemplateExtractor::new(config.byte_order);
    let mut grid = Grid::new(&config.parameters, config.quantity_names());
    for entry in templates.entries() {
        let record = extractor.extract(&entry.file, &config.additional_quantities)?;
        grid.append(record, &entry.axis_values)?;
    }

    let containers = build_containers(&grid, &catalog, &layout)?;
    let output_dir = request
        .output_dir
        .clone()
        .unwrap_or_else(|| templates.directory());
    let outputs = write_containers(&output_dir, &containers)?;

    tracing::info!(
        samples = grid.sample_count(),
        line_samples = grid.line_sample_count(),
        outputs = outputs.len(),
        "conversion finished"
    );

    Ok(ConversionSummary {
        templates: grid.template_count(),
        samples: grid.sample_count(),
        line_samples: grid.line_sample_count(),
        outputs,
    })
}
