use std::path::PathBuf;

pub type ConvertResult<T> = Result<T, ConvertError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    InputValidationError,
    IoSystemError,
}

impl ErrorCategory {
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::InputValidationError => 2,
            Self::IoSystemError => 3,
        }
    }
}

/// Low-level failure of the binary cursor, without file context.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error(
        "record truncated at byte {offset}: needed {requested} bytes, {available} available"
    )]
    TruncatedRecord {
        offset: usize,
        requested: usize,
        available: usize,
    },
    #[error("negative {field} count {value} at byte {offset}")]
    NegativeCount {
        field: &'static str,
        value: i32,
        offset: usize,
    },
}

impl DecodeError {
    pub fn in_template(self, template: impl Into<PathBuf>) -> ConvertError {
        let template = template.into();
        match self {
            Self::TruncatedRecord {
                offset,
                requested,
                available,
            } => ConvertError::TruncatedRecord {
                template,
                offset,
                requested,
                available,
            },
            Self::NegativeCount {
                field,
                value,
                offset,
            } => ConvertError::NegativeCount {
                template,
                field,
                value,
                offset,
            },
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error(
        "template '{}' truncated at byte {offset}: needed {requested} bytes, {available} available",
        template.display()
    )]
    TruncatedRecord {
        template: PathBuf,
        offset: usize,
        requested: usize,
        available: usize,
    },
    #[error(
        "template '{}' declares a negative {field} count {value} at byte {offset}",
        template.display()
    )]
    NegativeCount {
        template: PathBuf,
        field: &'static str,
        value: i32,
        offset: usize,
    },
    #[error("emission-line catalog line {line}: {reason}")]
    MalformedCatalogEntry { line: usize, reason: String },
    #[error(
        "no companion file for template '{}' (tried: {})",
        template.display(),
        tried.join(", ")
    )]
    MissingCompanionFile { template: PathBuf, tried: Vec<String> },
    #[error("column '{column}' length mismatch: expected {expected}, got {actual}")]
    ColumnLengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },
    #[error(
        "template '{}' wavelength axis differs from the cached axis at index {index}",
        template.display()
    )]
    WavelengthAxisMismatch { template: PathBuf, index: usize },
    #[error("table '{}' line {line}: {reason}", path.display())]
    MalformedTable {
        path: PathBuf,
        line: usize,
        reason: String,
    },
    #[error("table '{}' has no column '{column}'", path.display())]
    MissingColumn { path: PathBuf, column: String },
    #[error("template '{template}' has no value for grid parameter '{parameter}'")]
    MissingTemplateParameter { template: String, parameter: String },
    #[error("split axis '{0}' is not one of the configured grid parameters")]
    UnknownSplitAxis(String),
    #[error("header card '{key}' cannot be encoded: {reason}")]
    InvalidHeaderCard { key: String, reason: String },
    #[error("invalid companion pattern '{pattern}': {source}")]
    InvalidGlob {
        pattern: String,
        #[source]
        source: globset::Error,
    },
    #[error("invalid configuration '{}': {reason}", path.display())]
    InvalidConfig { path: PathBuf, reason: String },
    #[error("failed to {action} '{}': {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConvertError {
    pub fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }

    pub fn length_mismatch(column: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::ColumnLengthMismatch {
            column: column.into(),
            expected,
            actual,
        }
    }

    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::Io { .. } => ErrorCategory::IoSystemError,
            _ => ErrorCategory::InputValidationError,
        }
    }

    /// Stable diagnostic code, independent of the rendered message.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::TruncatedRecord { .. } => "INPUT.TRUNCATED_RECORD",
            Self::NegativeCount { .. } => "INPUT.NEGATIVE_COUNT",
            Self::MalformedCatalogEntry { .. } => "INPUT.MALFORMED_CATALOG_ENTRY",
            Self::MissingCompanionFile { .. } => "INPUT.MISSING_COMPANION_FILE",
            Self::ColumnLengthMismatch { .. } => "INPUT.COLUMN_LENGTH_MISMATCH",
            Self::WavelengthAxisMismatch { .. } => "INPUT.WAVELENGTH_AXIS_MISMATCH",
            Self::MalformedTable { .. } => "INPUT.MALFORMED_TABLE",
            Self::MissingColumn { .. } => "INPUT.MISSING_COLUMN",
            Self::MissingTemplateParameter { .. } => "INPUT.MISSING_TEMPLATE_PARAMETER",
            Self::UnknownSplitAxis(_) => "INPUT.UNKNOWN_SPLIT_AXIS",
            Self::InvalidHeaderCard { .. } => "INPUT.INVALID_HEADER_CARD",
            Self::InvalidGlob { .. } => "INPUT.INVALID_GLOB",
            Self::InvalidConfig { .. } => "INPUT.INVALID_CONFIG",
            Self::Io { .. } => "IO.FILE",
        }
    }

    pub const fn exit_code(&self) -> i32 {
        self.category().exit_code()
    }

    pub fn diagnostic_line(&self) -> String {
        format!("ERROR: [{}] {}", self.code(), self)
    }

    pub fn fatal_exit_line(&self) -> String {
        format!("FATAL EXIT CODE: {}", self.exit_code())
    }
}
