use crate::config::AdditionalQuantitySpec;
use crate::domain::{ConvertError, ConvertResult};
use globset::Glob;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// One way of locating a companion file for a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompanionPattern {
    /// `<template without extension>.<suffix>` next to the template.
    Sibling { suffix: String },
    /// `[<prefix>*]<ztoken>*<suffix>` inside `folder` (or the template's
    /// directory), where `<ztoken>` is the metallicity token embedded in the
    /// template file name.
    MetallicityGlob {
        folder: Option<PathBuf>,
        prefix: Option<String>,
        suffix: String,
    },
}

impl CompanionPattern {
    fn describe(&self, template: &Path) -> String {
        match self {
            Self::Sibling { suffix } => template.with_extension(suffix).display().to_string(),
            Self::MetallicityGlob { .. } => match self.glob_location(template) {
                Some((dir, pattern)) => dir.join(pattern).display().to_string(),
                None => format!(
                    "<no metallicity token in '{}'>",
                    template.file_name().unwrap_or_default().to_string_lossy()
                ),
            },
        }
    }

    fn find(&self, template: &Path) -> ConvertResult<Option<PathBuf>> {
        match self {
            Self::Sibling { suffix } => {
                let candidate = template.with_extension(suffix);
                Ok(candidate.is_file().then_some(candidate))
            }
            Self::MetallicityGlob { .. } => {
                let Some((dir, pattern)) = self.glob_location(template) else {
                    return Ok(None);
                };
                first_glob_match(&dir, &pattern)
            }
        }
    }

    fn glob_location(&self, template: &Path) -> Option<(PathBuf, String)> {
        let Self::MetallicityGlob {
            folder,
            prefix,
            suffix,
        } = self
        else {
            return None;
        };

        let token = metallicity_token(template)?;
        let dir = match folder {
            Some(folder) => folder.clone(),
            None => template
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default(),
        };
        let pattern = match prefix {
            Some(prefix) => format!("{prefix}*{token}*{suffix}"),
            None => format!("{token}*{suffix}"),
        };
        Some((dir, pattern))
    }
}

/// Ordered list of companion-file strategies; the first one that finds a
/// file wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanionResolver {
    patterns: Vec<CompanionPattern>,
}

impl CompanionResolver {
    pub fn new(patterns: Vec<CompanionPattern>) -> Self {
        Self { patterns }
    }

    pub fn for_quantity(spec: &AdditionalQuantitySpec) -> Self {
        Self::new(vec![
            CompanionPattern::Sibling {
                suffix: spec.suffix.clone(),
            },
            CompanionPattern::MetallicityGlob {
                folder: spec.folder.clone(),
                prefix: spec.prefix.clone(),
                suffix: spec.suffix.clone(),
            },
        ])
    }

    pub fn patterns(&self) -> &[CompanionPattern] {
        &self.patterns
    }

    pub fn resolve(&self, template: &Path) -> ConvertResult<PathBuf> {
        for pattern in &self.patterns {
            if let Some(found) = pattern.find(template)? {
                tracing::debug!(
                    template = %template.display(),
                    companion = %found.display(),
                    "resolved companion file"
                );
                return Ok(found);
            }
        }

        Err(ConvertError::MissingCompanionFile {
            template: template.to_path_buf(),
            tried: self
                .patterns
                .iter()
                .map(|pattern| pattern.describe(template))
                .collect(),
        })
    }
}

/// First `_`-separated token of the file stem starting with `z`, e.g.
/// `z0008` in `bc2003_hr_z0008_chab_ssp.ineb`.
pub fn metallicity_token(template: &Path) -> Option<&str> {
    template
        .file_stem()?
        .to_str()?
        .split('_')
        .find(|token| token.starts_with('z'))
}

fn first_glob_match(dir: &Path, pattern: &str) -> ConvertResult<Option<PathBuf>> {
    let matcher = Glob::new(pattern)
        .map_err(|source| ConvertError::InvalidGlob {
            pattern: pattern.to_string(),
            source,
        })?
        .compile_matcher();

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(error) if error.kind() == ErrorKind::NotFound => return Ok(None),
        Err(error) => return Err(ConvertError::io("list companion folder", dir, error)),
    };

    let mut matches = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| ConvertError::io("list companion folder", dir, source))?;
        let path = entry.path();
        if path.is_file() && matcher.is_match(entry.file_name()) {
            matches.push(path);
        }
    }

    matches.sort();
    Ok(matches.into_iter().next())
}
