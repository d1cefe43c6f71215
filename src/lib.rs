//! # statlab
//!
//! Interactive statistics engine for delimited tabular data.
//!
//! statlab loads a dataset, classifies every column as continuous or
//! categorical, and answers analysis requests against that loaded
//! state: descriptive summaries, classical hypothesis tests,
//! correlation and regression, dimensionality reduction, clustering,
//! chart specifications, and workbook export. One dataset is active at
//! a time; loading a new file replaces it wholesale.
//!
//! ## Modules
//!
//! - [`dataframe`] — Column-major tabular data model (DataFrame, Column, DataType)
//! - [`loader`] — Delimited-file loading with encoding detection and type inference
//! - [`classify`] — Continuous/categorical column classification
//! - [`session`] — The active dataset and its load/replace lifecycle
//! - [`descriptive`] — Per-column summaries, frequency tables, missing-value report
//! - [`hypothesis`] — t-tests, ANOVA, chi-square, Mann-Whitney, Kruskal-Wallis, normality
//! - [`correlation`] — Correlation matrix with strong-pair digest, simple linear regression
//! - [`reduction`] — Standardization, PCA, K-Means (with elbow curve), hierarchical clustering
//! - [`chart`] — Chart specifications as data for an external renderer
//! - [`export`] — Excel workbook export with CSV fallback
//! - [`interpret`] — Significance and correlation-strength wording policy
//! - [`engine`] — Rank-based test statistics and p-value machinery
//! - [`error`] — Error types
//!
//! ## Quick Start
//!
//! ```
//! use statlab::session::AnalysisSession;
//! use statlab::hypothesis;
//!
//! let csv = "\
//! group,score
//! unit,point
//! a,61.1
//! a,62.2
//! a,63.3
//! a,64.4
//! a,65.5
//! a,66.6
//! b,81.2
//! b,82.4
//! b,83.6
//! b,84.8
//! b,86.0
//! b,87.2";
//!
//! let mut session = AnalysisSession::new();
//! let summary = session.load_str(csv).unwrap();
//! assert_eq!(summary.rows, 12);
//! assert_eq!(summary.continuous, 1);
//!
//! let report = hypothesis::t_test(session.dataset().unwrap(), "group", "score").unwrap();
//! assert!(report.significance.is_significant());
//! ```

pub mod chart;
pub mod classify;
pub mod correlation;
pub mod dataframe;
pub mod descriptive;
pub mod engine;
pub mod error;
pub mod export;
pub mod hypothesis;
pub mod interpret;
pub mod loader;
pub mod reduction;
pub mod session;

pub use error::AnalysisError;
pub use session::AnalysisSession;
