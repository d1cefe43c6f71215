//! Analysis session and active dataset.
//!
//! An [`AnalysisSession`] owns at most one loaded [`Dataset`]. Loading
//! parses and classifies the file completely before swapping it in, so
//! a failed load never disturbs the dataset already active. Every
//! analysis entry point starts from [`AnalysisSession::dataset`],
//! which is the single place the no-data state is reported.
//!
//! # Example
//!
//! ```
//! use statlab::session::AnalysisSession;
//!
//! let csv = "age,group\nyears,arm\n34,a\n41,b\n29,a\n";
//! let mut session = AnalysisSession::new();
//! let summary = session.load_str(csv).unwrap();
//! assert_eq!(summary.rows, 3);
//! assert!(session.dataset().is_ok());
//! ```

use std::path::{Path, PathBuf};

use log::info;

use crate::classify::{classify, ColumnRole, RolePartition};
use crate::dataframe::DataFrame;
use crate::error::AnalysisError;
use crate::loader::DatasetLoader;

/// A loaded, classified dataset.
#[derive(Debug, Clone)]
pub struct Dataset {
    frame: DataFrame,
    roles: RolePartition,
    source: Option<PathBuf>,
}

impl Dataset {
    /// Wraps an already-parsed frame, classifying its columns.
    pub fn from_frame(frame: DataFrame) -> Self {
        let roles = classify(&frame);
        Self {
            frame,
            roles,
            source: None,
        }
    }

    /// The underlying data.
    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    /// The column role partition.
    pub fn roles(&self) -> &RolePartition {
        &self.roles
    }

    /// The file this dataset was loaded from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Names of continuous columns, in dataset order.
    pub fn continuous_columns(&self) -> &[String] {
        &self.roles.continuous
    }

    /// Names of categorical columns, in dataset order.
    pub fn categorical_columns(&self) -> &[String] {
        &self.roles.categorical
    }

    /// Verifies that `name` exists and has the expected role.
    pub fn require_role(&self, name: &str, role: ColumnRole) -> Result<(), AnalysisError> {
        match self.roles.role_of(name) {
            None => Err(AnalysisError::ColumnNotFound {
                name: name.to_string(),
            }),
            Some(actual) if actual == role => Ok(()),
            Some(_) => Err(AnalysisError::WrongRole {
                column: name.to_string(),
                expected: role.to_string(),
            }),
        }
    }
}

/// Summary returned by a successful load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadSummary {
    /// Data rows after pruning.
    pub rows: usize,
    /// Columns after pruning.
    pub columns: usize,
    /// Continuous column count.
    pub continuous: usize,
    /// Categorical column count.
    pub categorical: usize,
}

/// Owns the active dataset across an interactive analysis session.
#[derive(Debug, Default)]
pub struct AnalysisSession {
    active: Option<Dataset>,
}

impl AnalysisSession {
    /// Creates a session with no dataset loaded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a file with default loader settings.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<LoadSummary, AnalysisError> {
        self.load_with(&DatasetLoader::new(), path)
    }

    /// Loads a file with a configured loader. The active dataset is
    /// replaced only after parsing and classification succeed.
    pub fn load_with(
        &mut self,
        loader: &DatasetLoader,
        path: impl AsRef<Path>,
    ) -> Result<LoadSummary, AnalysisError> {
        let frame = loader.load_path(path.as_ref())?;
        let mut dataset = Dataset::from_frame(frame);
        dataset.source = Some(path.as_ref().to_path_buf());
        Ok(self.install(dataset))
    }

    /// Loads from already-decoded text (embedding and tests).
    pub fn load_str(&mut self, input: &str) -> Result<LoadSummary, AnalysisError> {
        let frame = DatasetLoader::new().load_str(input)?;
        Ok(self.install(Dataset::from_frame(frame)))
    }

    /// Returns the active dataset or `NoDatasetLoaded`.
    pub fn dataset(&self) -> Result<&Dataset, AnalysisError> {
        self.active.as_ref().ok_or(AnalysisError::NoDatasetLoaded)
    }

    /// Returns `true` when a dataset is active.
    pub fn is_loaded(&self) -> bool {
        self.active.is_some()
    }

    /// Discards the active dataset.
    pub fn clear(&mut self) {
        self.active = None;
    }

    fn install(&mut self, dataset: Dataset) -> LoadSummary {
        let summary = LoadSummary {
            rows: dataset.frame.row_count(),
            columns: dataset.frame.column_count(),
            continuous: dataset.roles.continuous.len(),
            categorical: dataset.roles.categorical.len(),
        };
        info!(
            "dataset ready: {} rows, {} continuous + {} categorical columns",
            summary.rows, summary.continuous, summary.categorical
        );
        self.active = Some(dataset);
        summary
    }
}

/// Resolves a two-column selection: takes the first two entries and
/// ignores any extras, mirroring how list-box selections behave in the
/// desktop front end this engine serves.
pub(crate) fn first_two<'a>(
    selection: &'a [&'a str],
    what: &str,
) -> Result<(&'a str, &'a str), AnalysisError> {
    match selection {
        [] | [_] => Err(AnalysisError::InvalidParameter {
            name: "selection".to_string(),
            message: format!("need two {what} columns, got {}", selection.len()),
        }),
        [a, b, ..] => Ok((*a, *b)),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────
