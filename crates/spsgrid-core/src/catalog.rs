//! Emission-line catalog: the ordered list of candidate lines, one per text
//! line, encoded as `wl:<float> use:<T|F> <ignored> name:<string>`.

use crate::domain::{ConvertError, ConvertResult};
use std::fs;
use std::path::Path;

const WAVELENGTH_TOKEN: usize = 0;
const USE_TOKEN: usize = 1;
const NAME_TOKEN: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub wavelength: f32,
    pub use_line: bool,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct EmissionLineCatalog {
    entries: Vec<CatalogEntry>,
}

impl EmissionLineCatalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    pub fn load(path: &Path) -> ConvertResult<Self> {
        let source = fs::read_to_string(path)
            .map_err(|source| ConvertError::io("read emission-line catalog", path, source))?;
        let catalog = Self::parse(&source)?;
        tracing::debug!(
            path = %path.display(),
            entries = catalog.len(),
            used = catalog.used().count(),
            "loaded emission-line catalog"
        );
        Ok(catalog)
    }

    pub fn parse(source: &str) -> ConvertResult<Self> {
        let mut entries = Vec::new();
        for (index, line) in source.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            entries.push(parse_entry(index + 1, trimmed)?);
        }

        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries flagged for output, with their position in the full catalog.
    pub fn used(&self) -> impl Iterator<Item = (usize, &CatalogEntry)> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.use_line)
    }

    pub fn wavelengths(&self) -> Vec<f32> {
        self.entries.iter().map(|entry| entry.wavelength).collect()
    }

    pub fn use_flags(&self) -> Vec<bool> {
        self.entries.iter().map(|entry| entry.use_line).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|entry| entry.name.as_str()).collect()
    }
}

fn parse_entry(line: usize, source: &str) -> ConvertResult<CatalogEntry> {
    let tokens = source.split_whitespace().collect::<Vec<_>>();

    let wavelength_text = token_value(&tokens, WAVELENGTH_TOKEN, "wavelength", line)?;
    let wavelength = wavelength_text.parse::<f32>().map_err(|_| {
        malformed(
            line,
            format!("wavelength '{wavelength_text}' is not a number"),
        )
    })?;

    let use_text = token_value(&tokens, USE_TOKEN, "use flag", line)?;
    let use_line = match use_text.to_ascii_uppercase().as_str() {
        "T" => true,
        "F" => false,
        _ => {
            return Err(malformed(
                line,
                format!("use flag '{use_text}' is neither T nor F"),
            ));
        }
    };

    let name = token_value(&tokens, NAME_TOKEN, "name", line)?.to_string();

    Ok(CatalogEntry {
        wavelength,
        use_line,
        name,
    })
}

fn token_value<'a>(
    tokens: &[&'a str],
    index: usize,
    field: &str,
    line: usize,
) -> ConvertResult<&'a str> {
    let token: &'a str = tokens
        .get(index)
        .copied()
        .ok_or_else(|| malformed(line, format!("missing {field} token")))?;
    token
        .split_once(':')
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| malformed(line, format!("{field} token '{token}' has no value")))
}

fn malformed(line: usize, reason: String) -> ConvertError {
    ConvertError::MalformedCatalogEntry { line, reason }
}
