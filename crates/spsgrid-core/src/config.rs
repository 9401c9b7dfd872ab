//! JSON run configuration.
//!
//! Keys follow the historical converter configuration files, including the
//! space in `"additional quantities"`. Relative paths resolve against the
//! directory holding the configuration file; `$VAR` and `${VAR}` references
//! are expanded from the environment first.

use crate::container::RESERVED_COLUMNS;
use crate::domain::{AGE_AXIS, ByteOrder, ConvertError, ConvertResult};
use crate::template::{StepDiagnostics, TemplateDiagnostics};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct ConversionConfig {
    pub templates_list: PathBuf,
    pub emission_lines_list: PathBuf,
    pub parameters: Vec<String>,
    #[serde(default)]
    pub split: Option<SplitSpec>,
    #[serde(default)]
    pub byte_order: ByteOrder,
    #[serde(default)]
    pub resolution_fwhm: f32,
    #[serde(rename = "additional quantities", default)]
    pub additional_quantities: Vec<AdditionalQuantitySpec>,
    #[serde(default)]
    pub header: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SplitSpec {
    pub axis: String,
    #[serde(default)]
    pub tag: Option<String>,
}

impl SplitSpec {
    pub fn new(axis: impl Into<String>) -> Self {
        Self {
            axis: axis.into(),
            tag: None,
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Label used in partition file names; defaults to the axis name.
    pub fn tag(&self) -> &str {
        self.tag.as_deref().unwrap_or(&self.axis)
    }
}

/// One group of per-step quantities read from a companion text table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AdditionalQuantitySpec {
    pub suffix: String,
    #[serde(default)]
    pub folder: Option<PathBuf>,
    #[serde(default)]
    pub prefix: Option<String>,
    pub quantities: Vec<String>,
}

impl ConversionConfig {
    pub fn load(path: &Path) -> ConvertResult<Self> {
        let source = fs::read_to_string(path)
            .map_err(|source| ConvertError::io("read configuration", path, source))?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
        Self::from_json(&source, path, base_dir)
    }

    /// Parses and validates a configuration document. `origin` is only used
    /// in error messages.
    pub fn from_json(source: &str, origin: &Path, base_dir: &Path) -> ConvertResult<Self> {
        let mut config: Self =
            serde_json::from_str(source).map_err(|error| ConvertError::InvalidConfig {
                path: origin.to_path_buf(),
                reason: error.to_string(),
            })?;

        config.templates_list = resolve_path(base_dir, &config.templates_list);
        config.emission_lines_list = resolve_path(base_dir, &config.emission_lines_list);
        for group in &mut config.additional_quantities {
            if let Some(folder) = group.folder.as_mut() {
                *folder = resolve_path(base_dir, folder);
            }
        }

        config.validate(origin)?;
        Ok(config)
    }

    pub fn quantity_names(&self) -> impl Iterator<Item = &str> {
        self.additional_quantities
            .iter()
            .flat_map(|group| group.quantities.iter().map(String::as_str))
    }

    /// Grid parameters that come from the templates list rather than the
    /// decoded time steps.
    pub fn template_parameters(&self) -> impl Iterator<Item = &str> {
        self.parameters
            .iter()
            .map(String::as_str)
            .filter(|name| *name != AGE_AXIS)
    }

    pub fn validate_split(&self, split: &SplitSpec) -> ConvertResult<()> {
        if self.parameters.iter().any(|name| name == &split.axis) {
            Ok(())
        } else {
            Err(ConvertError::UnknownSplitAxis(split.axis.clone()))
        }
    }

    fn validate(&self, origin: &Path) -> ConvertResult<()> {
        let invalid = |reason: String| ConvertError::InvalidConfig {
            path: origin.to_path_buf(),
            reason,
        };

        if self.parameters.is_empty() {
            return Err(invalid("'parameters' must name at least one grid axis".into()));
        }

        let mut seen = BTreeSet::new();
        for name in &self.parameters {
            if !seen.insert(name.as_str()) {
                return Err(invalid(format!("grid parameter '{name}' is listed twice")));
            }
        }

        let reserved = RESERVED_COLUMNS
            .iter()
            .chain(TemplateDiagnostics::NAMES.iter())
            .chain(StepDiagnostics::NAMES.iter())
            .copied()
            .collect::<BTreeSet<_>>();

        for name in self.quantity_names() {
            if !seen.insert(name) {
                return Err(invalid(format!(
                    "additional quantity '{name}' collides with another column"
                )));
            }
        }

        if let Some(name) = seen.iter().find(|name| reserved.contains(**name)) {
            return Err(invalid(format!("'{name}' is a reserved output column")));
        }

        for group in &self.additional_quantities {
            if group.suffix.trim().is_empty() {
                return Err(invalid("additional quantity suffix must not be empty".into()));
            }
        }

        if let Some(split) = &self.split {
            self.validate_split(split)?;
        }

        Ok(())
    }
}

/// Expands `$VAR` and `${VAR}` from the environment. Unknown variables are
/// left untouched.
pub fn expand_env_vars(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(dollar) = rest.find('$') {
        output.push_str(&rest[..dollar]);
        let after = &rest[dollar + 1..];

        let (name, consumed) = if let Some(braced) = after.strip_prefix('{') {
            match braced.find('}') {
                Some(end) => (&braced[..end], end + 2),
                None => ("", 0),
            }
        } else {
            let end = after
                .find(|ch: char| !(ch.is_ascii_alphanumeric() || ch == '_'))
                .unwrap_or(after.len());
            (&after[..end], end)
        };

        match std::env::var(name) {
            Ok(value) if !name.is_empty() => output.push_str(&value),
            _ => output.push_str(&rest[dollar..dollar + 1 + consumed]),
        }
        rest = &after[consumed..];
    }

    output.push_str(rest);
    output
}

fn resolve_path(base_dir: &Path, raw: &Path) -> PathBuf {
    let expanded = PathBuf::from(expand_env_vars(&raw.to_string_lossy()));
    if expanded.is_absolute() {
        expanded
    } else {
        base_dir.join(expanded)
    }
}

#[cfg(test)]
mod tests {
    use super::{ConversionConfig, SplitSpec, expand_env_vars};
    use crate::domain::{ByteOrder, ConvertError};
    use std::path::{Path, PathBuf};

    const CONFIG: &str = r#"
    {
      "templates_list": "lists/templates.txt",
      "emission_lines_list": "/data/lines.dat",
      "parameters": ["metallicity", "age"],
      "split": {"axis": "metallicity", "tag": "Z"},
      "additional quantities": [
        {"suffix": "4color", "folder": "colors", "prefix": "bc2003", "quantities": ["M_star", "b4_vn"]}
      ],
      "header": {"IMF": "chabrier", "MUP": 100, "NEBULAR": true}
    }
    "#;

    fn parse(source: &str) -> Result<ConversionConfig, ConvertError> {
        ConversionConfig::from_json(source, Path::new("run.json"), Path::new("/runs"))
    }

    #[test]
    fn parses_configuration_and_resolves_relative_paths() {
        let config = parse(CONFIG).expect("config should parse");

        assert_eq!(config.templates_list, PathBuf::from("/runs/lists/templates.txt"));
        assert_eq!(config.emission_lines_list, PathBuf::from("/data/lines.dat"));
        assert_eq!(config.byte_order, ByteOrder::Little);
        assert_eq!(
            config.additional_quantities[0].folder.as_deref(),
            Some(Path::new("/runs/colors"))
        );
        assert_eq!(
            config.quantity_names().collect::<Vec<_>>(),
            vec!["M_star", "b4_vn"]
        );
        assert_eq!(config.template_parameters().collect::<Vec<_>>(), vec!["metallicity"]);
        assert_eq!(config.split.as_ref().map(SplitSpec::tag), Some("Z"));
    }

    #[test]
    fn header_keeps_file_order() {
        let config = parse(CONFIG).expect("config should parse");
        let keys = config.header.keys().cloned().collect::<Vec<_>>();
        assert_eq!(keys, vec!["IMF", "MUP", "NEBULAR"]);
    }

    #[test]
    fn split_axis_must_be_a_grid_parameter() {
        let source = CONFIG.replace(r#""axis": "metallicity""#, r#""axis": "logU""#);
        let error = parse(&source).expect_err("logU is not a parameter");
        assert!(matches!(error, ConvertError::UnknownSplitAxis(axis) if axis == "logU"));
    }

    #[test]
    fn duplicate_columns_are_rejected() {
        let source = CONFIG.replace(r#""b4_vn""#, r#""age""#);
        let error = parse(&source).expect_err("age is already a grid parameter");
        assert!(matches!(error, ConvertError::InvalidConfig { .. }));
    }

    #[test]
    fn decoded_diagnostic_names_are_reserved() {
        let source = CONFIG.replace(r#""b4_vn""#, r#""qlyc""#);
        let error = parse(&source).expect_err("qlyc is a decoded column");
        assert!(matches!(error, ConvertError::InvalidConfig { reason, .. } if reason.contains("qlyc")));
    }

    #[test]
    fn missing_required_keys_are_invalid_config() {
        let error = parse(r#"{"parameters": ["age"]}"#).expect_err("lists are required");
        assert_eq!(error.code(), "INPUT.INVALID_CONFIG");
    }

    #[test]
    fn split_tag_defaults_to_axis_name() {
        assert_eq!(SplitSpec::new("logU").tag(), "logU");
        assert_eq!(SplitSpec::new("metallicity").with_tag("Z").tag(), "Z");
    }

    #[test]
    fn expands_environment_variables() {
        let search_path = std::env::var("PATH").expect("PATH is set in test environments");
        assert_eq!(expand_env_vars("$PATH/x"), format!("{search_path}/x"));
        assert_eq!(expand_env_vars("${PATH}-y"), format!("{search_path}-y"));
        assert_eq!(
            expand_env_vars("$SPSGRID_SURELY_UNSET_VARIABLE/z"),
            "$SPSGRID_SURELY_UNSET_VARIABLE/z"
        );
        assert_eq!(expand_env_vars("cost$"), "cost$");
        assert_eq!(expand_env_vars("${open"), "${open");
    }
}
