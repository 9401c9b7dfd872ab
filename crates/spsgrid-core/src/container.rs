//! Output containers: the grid laid out as PARAMETERS, CONTINUUM and LINES
//! binary tables, one file per partition.

use crate::catalog::EmissionLineCatalog;
use crate::config::SplitSpec;
use crate::domain::{ConvertError, ConvertResult};
use crate::fits::{BinTable, Card, CardValue, Column, FitsFile};
use crate::grid::Grid;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

pub const PARAMETERS_EXTENSION: &str = "PARAMETERS";
pub const CONTINUUM_EXTENSION: &str = "CONTINUUM";
pub const LINES_EXTENSION: &str = "LINES";

pub const WAVELENGTHS_COLUMN: &str = "wavelengths";
pub const FWHM_COLUMN: &str = "FWHM";
pub const SPECTRUM_COLUMN: &str = "spectrum";
pub const LINE_WAVELENGTH_PREFIX: &str = "Wl_";
pub const LINE_LUMINOSITY_PREFIX: &str = "Lum_";

/// Column names the writer owns; grid axes and quantities may not reuse them.
pub const RESERVED_COLUMNS: [&str; 3] = [WAVELENGTHS_COLUMN, FWHM_COLUMN, SPECTRUM_COLUMN];

const WAVELENGTH_UNIT: &str = "Ang";
const FLUX_UNIT: &str = "erg s^-1 Ang^-1";
const LUMINOSITY_UNIT: &str = "log(L_sun)";

/// Naming, partitioning and header stamping shared by every container of a
/// run.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerLayout {
    stem: String,
    split: Option<SplitSpec>,
    resolution_fwhm: f32,
    header: Vec<Card>,
}

impl ContainerLayout {
    pub fn new(stem: impl Into<String>) -> Self {
        Self {
            stem: stem.into(),
            split: None,
            resolution_fwhm: 0.0,
            header: Vec::new(),
        }
    }

    pub fn with_split(mut self, split: Option<SplitSpec>) -> Self {
        self.split = split;
        self
    }

    pub fn with_resolution_fwhm(mut self, fwhm: f32) -> Self {
        self.resolution_fwhm = fwhm;
        self
    }

    /// Converts and renders every header entry now, so a bad key fails the
    /// run before any output exists.
    pub fn with_header(mut self, header: &Map<String, Value>) -> ConvertResult<Self> {
        let mut cards = Vec::with_capacity(header.len());
        for (key, value) in header {
            let card = Card::new(key.as_str(), CardValue::from_json(key, value)?);
            card.render()?;
            cards.push(card);
        }
        self.header = cards;
        Ok(self)
    }

    pub fn split(&self) -> Option<&SplitSpec> {
        self.split.as_ref()
    }

    pub fn file_name(&self, split_value: Option<f32>) -> String {
        match (&self.split, split_value) {
            (Some(split), Some(value)) => format!("{}_{}_{}.fits", self.stem, split.tag(), value),
            _ => format!("{}.fits", self.stem),
        }
    }
}

/// One fully built output file, not yet written.
#[derive(Debug, Clone, PartialEq)]
pub struct Container {
    pub file_name: String,
    pub split_value: Option<f32>,
    pub fits: FitsFile,
}

impl Container {
    pub fn parameters(&self) -> Option<&BinTable> {
        self.fits.table(PARAMETERS_EXTENSION)
    }

    pub fn continuum(&self) -> Option<&BinTable> {
        self.fits.table(CONTINUUM_EXTENSION)
    }

    pub fn lines(&self) -> Option<&BinTable> {
        self.fits.table(LINES_EXTENSION)
    }
}

/// Builds every container for `grid`. All tables are validated here; nothing
/// touches the filesystem.
pub fn build_containers(
    grid: &Grid,
    catalog: &EmissionLineCatalog,
    layout: &ContainerLayout,
) -> ConvertResult<Vec<Container>> {
    check_line_records(grid, catalog)?;

    let Some(split) = layout.split() else {
        let rows = (0..grid.sample_count()).collect::<Vec<_>>();
        return Ok(vec![build_container(grid, catalog, layout, &rows, None)?]);
    };

    let axis = grid
        .axis(&split.axis)
        .ok_or_else(|| ConvertError::UnknownSplitAxis(split.axis.clone()))?;
    let values = grid.unique_axis_values(&split.axis).unwrap_or_default();

    let mut containers = Vec::with_capacity(values.len());
    for value in values {
        let rows = axis
            .values
            .iter()
            .enumerate()
            .filter(|(_, sample)| **sample == value)
            .map(|(index, _)| index)
            .collect::<Vec<_>>();
        containers.push(build_container(
            grid,
            catalog,
            layout,
            &rows,
            Some((split.axis.as_str(), value)),
        )?);
    }
    Ok(containers)
}

/// Encodes every container before writing the first file, then writes them
/// into `output_dir`.
pub fn write_containers(output_dir: &Path, containers: &[Container]) -> ConvertResult<Vec<PathBuf>> {
    let mut encoded = Vec::with_capacity(containers.len());
    for container in containers {
        encoded.push((output_dir.join(&container.file_name), container.fits.encode()?));
    }

    fs::create_dir_all(output_dir)
        .map_err(|source| ConvertError::io("create output directory", output_dir, source))?;

    let mut written = Vec::with_capacity(encoded.len());
    for (path, bytes) in encoded {
        fs::write(&path, bytes).map_err(|source| ConvertError::io("write FITS file", &path, source))?;
        tracing::info!(path = %path.display(), "wrote container");
        written.push(path);
    }
    Ok(written)
}

fn check_line_records(grid: &Grid, catalog: &EmissionLineCatalog) -> ConvertResult<()> {
    for sample in 0..grid.sample_count() {
        let Some(record) = grid.line_record(sample) else {
            continue;
        };
        if record.len() < catalog.len() {
            return Err(ConvertError::length_mismatch(
                "emission lines",
                catalog.len(),
                record.len(),
            ));
        }
    }
    Ok(())
}

fn build_container(
    grid: &Grid,
    catalog: &EmissionLineCatalog,
    layout: &ContainerLayout,
    rows: &[usize],
    split: Option<(&str, f32)>,
) -> ConvertResult<Container> {
    let line_rows = rows
        .iter()
        .copied()
        .filter(|sample| grid.has_lines(*sample))
        .collect::<Vec<_>>();

    let tables = vec![
        parameters_table(grid, catalog, layout, split)?,
        continuum_table(grid, rows)?,
        lines_table(grid, catalog, &line_rows)?,
    ];

    let split_value = split.map(|(_, value)| value);
    tracing::debug!(
        samples = rows.len(),
        line_samples = line_rows.len(),
        split = ?split_value,
        "built container"
    );

    Ok(Container {
        file_name: layout.file_name(split_value),
        split_value,
        fits: FitsFile::new(tables),
    })
}

fn parameters_table(
    grid: &Grid,
    catalog: &EmissionLineCatalog,
    layout: &ContainerLayout,
    split: Option<(&str, f32)>,
) -> ConvertResult<BinTable> {
    let wavelengths = grid.wavelengths();
    let mut table = BinTable::new(PARAMETERS_EXTENSION).with_rows(1);

    table.push_column(
        Column::single_row(WAVELENGTHS_COLUMN, wavelengths.to_vec()).with_unit(WAVELENGTH_UNIT),
    )?;
    table.push_column(
        Column::single_row(FWHM_COLUMN, vec![layout.resolution_fwhm; wavelengths.len()])
            .with_unit(WAVELENGTH_UNIT),
    )?;

    for axis in grid.axes() {
        let values = match split {
            Some((name, value)) if name == axis.name => vec![value],
            _ => grid.unique_axis_values(&axis.name).unwrap_or_default(),
        };
        table.push_column(Column::single_row(axis.name.as_str(), values))?;
    }

    for (_, entry) in catalog.used() {
        table.push_column(
            Column::scalar(
                format!("{LINE_WAVELENGTH_PREFIX}{}", entry.name),
                vec![entry.wavelength],
            )
            .with_unit(WAVELENGTH_UNIT),
        )?;
    }

    for card in &layout.header {
        table.push_card(card.clone());
    }
    Ok(table)
}

fn continuum_table(grid: &Grid, rows: &[usize]) -> ConvertResult<BinTable> {
    let mut table = BinTable::new(CONTINUUM_EXTENSION).with_rows(rows.len());

    for axis in grid.axes() {
        table.push_column(Column::scalar(axis.name.as_str(), gather(&axis.values, rows)))?;
    }

    let spectra = grid.spectra();
    let width = grid.wavelengths().len();
    table.push_column(
        Column::vector(
            SPECTRUM_COLUMN,
            width,
            rows.iter().map(|row| spectra[*row].as_slice()),
        )?
        .with_unit(FLUX_UNIT),
    )?;

    for quantity in grid.quantities() {
        table.push_column(Column::scalar(
            quantity.name.as_str(),
            gather(&quantity.values, rows),
        ))?;
    }
    Ok(table)
}

fn lines_table(
    grid: &Grid,
    catalog: &EmissionLineCatalog,
    rows: &[usize],
) -> ConvertResult<BinTable> {
    let mut table = BinTable::new(LINES_EXTENSION).with_rows(rows.len());

    for axis in grid.axes() {
        table.push_column(Column::scalar(axis.name.as_str(), gather(&axis.values, rows)))?;
    }

    for (index, entry) in catalog.used() {
        let name = format!("{LINE_LUMINOSITY_PREFIX}{}", entry.name);
        let mut values = Vec::with_capacity(rows.len());
        for row in rows {
            let luminosity = grid
                .line_record(*row)
                .and_then(|record| record.luminosities.get(index))
                .ok_or_else(|| ConvertError::length_mismatch(&name, index + 1, 0))?;
            values.push(*luminosity);
        }
        table.push_column(Column::scalar(name, values).with_unit(LUMINOSITY_UNIT))?;
    }

    for column in grid.diagnostics().iter().chain(grid.quantities()) {
        table.push_column(Column::scalar(column.name.as_str(), gather(&column.values, rows)))?;
    }
    Ok(table)
}

fn gather(values: &[f32], rows: &[usize]) -> Vec<f32> {
    rows.iter().map(|row| values[*row]).collect()
}
