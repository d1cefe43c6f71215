//! Error types for statlab.

use std::fmt;

/// All errors produced by statlab operations.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// An analysis was requested before any dataset was loaded.
    NoDatasetLoaded,
    /// Delimited-text parsing failed.
    CsvParse { line: usize, message: String },
    /// Column not found in the active dataset.
    ColumnNotFound { name: String },
    /// A column was used in a role it does not have.
    WrongRole { column: String, expected: String },
    /// A two-group test was given a grouping column without exactly 2 levels.
    InvalidGroupCount { column: String, actual: usize },
    /// A multi-group test found fewer than 2 non-empty groups.
    InsufficientGroups { actual: usize },
    /// An operation over several variables was given too few.
    InsufficientVariables { min_required: usize, actual: usize },
    /// Insufficient data rows for the requested operation.
    InsufficientData { min_required: usize, actual: usize },
    /// An invalid configuration value was supplied.
    InvalidParameter { name: String, message: String },
    /// Dimension mismatch when assembling columns.
    DimensionMismatch { expected: usize, actual: usize },
    /// A numeric routine failed on otherwise valid input.
    Computation {
        operation: String,
        columns: Vec<String>,
        detail: String,
    },
    /// I/O error during file reading or writing.
    Io(String),
}

impl AnalysisError {
    /// Wraps an engine failure with the operation name and the columns involved.
    pub fn computation(
        operation: impl Into<String>,
        columns: &[&str],
        detail: impl Into<String>,
    ) -> Self {
        Self::Computation {
            operation: operation.into(),
            columns: columns.iter().map(|c| (*c).to_string()).collect(),
            detail: detail.into(),
        }
    }
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoDatasetLoaded => {
                write!(f, "no dataset loaded")
            }
            Self::CsvParse { line, message } => {
                write!(f, "CSV parse error at line {line}: {message}")
            }
            Self::ColumnNotFound { name } => {
                write!(f, "column '{name}' not found")
            }
            Self::WrongRole { column, expected } => {
                write!(f, "column '{column}' is not {expected}")
            }
            Self::InvalidGroupCount { column, actual } => {
                write!(
                    f,
                    "grouping column '{column}' must have exactly 2 levels, found {actual}"
                )
            }
            Self::InsufficientGroups { actual } => {
                write!(f, "need at least 2 non-empty groups, found {actual}")
            }
            Self::InsufficientVariables {
                min_required,
                actual,
            } => {
                write!(f, "need at least {min_required} variables, got {actual}")
            }
            Self::InsufficientData {
                min_required,
                actual,
            } => {
                write!(f, "need at least {min_required} rows, got {actual}")
            }
            Self::InvalidParameter { name, message } => {
                write!(f, "invalid parameter '{name}': {message}")
            }
            Self::DimensionMismatch { expected, actual } => {
                write!(f, "expected {expected} elements, got {actual}")
            }
            Self::Computation {
                operation,
                columns,
                detail,
            } => {
                write!(f, "{operation} failed for [{}]: {detail}", columns.join(", "))
            }
            Self::Io(msg) => write!(f, "I/O error: {msg}"),
        }
    }
}

impl std::error::Error for AnalysisError {}

impl From<std::io::Error> for AnalysisError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}
