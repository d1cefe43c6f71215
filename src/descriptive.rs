//! Descriptive statistics and missing-value analysis.
//!
//! Numeric columns get the eight-number summary (count, mean, std,
//! min, quartiles, max); label columns get a frequency table. The
//! batch table and the missing-value report cover every column in
//! dataset order, the shape the spreadsheet export reuses.

use std::fmt::Write as _;

use crate::dataframe::Column;
use crate::error::AnalysisError;
use crate::session::Dataset;

/// Eight-number summary of a numeric column.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericSummary {
    pub count: usize,
    pub missing: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

/// One level of a frequency table.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelCount {
    pub level: String,
    pub count: usize,
    /// Share of valid values, in [0, 1].
    pub share: f64,
}

/// Frequency summary of a label column.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoricalSummary {
    pub count: usize,
    pub missing: usize,
    pub distinct: usize,
    /// Levels in descending count order.
    pub frequencies: Vec<LevelCount>,
}

/// Per-column summary, shaped by the column's storage type.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnSummary {
    Numeric(NumericSummary),
    Categorical(CategoricalSummary),
}

impl ColumnSummary {
    /// Missing-value count, regardless of shape.
    pub fn missing(&self) -> usize {
        match self {
            Self::Numeric(s) => s.missing,
            Self::Categorical(s) => s.missing,
        }
    }
}

/// Describes a single column.
pub fn describe(dataset: &Dataset, column: &str) -> Result<ColumnSummary, AnalysisError> {
    let col = dataset.frame().require_column(column)?;
    summarize(dataset, column, col)
}

fn summarize(
    dataset: &Dataset,
    name: &str,
    col: &Column,
) -> Result<ColumnSummary, AnalysisError> {
    if col.is_numeric() {
        let values = col.valid_numeric_values().unwrap_or_default();
        if values.is_empty() {
            return Err(AnalysisError::InsufficientData {
                min_required: 1,
                actual: 0,
            });
        }
        Ok(ColumnSummary::Numeric(NumericSummary {
            count: values.len(),
            missing: col.null_count(),
            mean: u_numflow::stats::mean(&values).unwrap_or(f64::NAN),
            std_dev: u_numflow::stats::std_dev(&values).unwrap_or(f64::NAN),
            min: u_numflow::stats::min(&values).unwrap_or(f64::NAN),
            q1: u_numflow::stats::quantile(&values, 0.25).unwrap_or(f64::NAN),
            median: u_numflow::stats::median(&values).unwrap_or(f64::NAN),
            q3: u_numflow::stats::quantile(&values, 0.75).unwrap_or(f64::NAN),
            max: u_numflow::stats::max(&values).unwrap_or(f64::NAN),
        }))
    } else {
        let frequencies = dataset.frame().level_frequencies(name)?;
        let total: usize = frequencies.iter().map(|(_, c)| c).sum();
        let frequencies = frequencies
            .into_iter()
            .map(|(level, count)| LevelCount {
                level,
                count,
                share: count as f64 / total as f64,
            })
            .collect();
        Ok(ColumnSummary::Categorical(CategoricalSummary {
            count: total,
            missing: col.null_count(),
            distinct: col.distinct_count(),
            frequencies,
        }))
    }
}

/// Batch summary over every column, in dataset order.
#[derive(Debug, Clone)]
pub struct DescriptiveTable {
    pub entries: Vec<(String, ColumnSummary)>,
}

impl DescriptiveTable {
    /// Renders the table as report text.
    pub fn render(&self) -> String {
        let mut out = String::from("=== Descriptive Statistics ===\n");
        for (name, summary) in &self.entries {
            match summary {
                ColumnSummary::Numeric(s) => {
                    let _ = writeln!(
                        out,
                        "{name}: n={}, missing={}, mean={:.4}, std={:.4}, \
                         min={:.4}, q1={:.4}, median={:.4}, q3={:.4}, max={:.4}",
                        s.count, s.missing, s.mean, s.std_dev, s.min, s.q1, s.median, s.q3, s.max
                    );
                }
                ColumnSummary::Categorical(s) => {
                    let levels: Vec<String> = s
                        .frequencies
                        .iter()
                        .map(|f| format!("{}={} ({:.1}%)", f.level, f.count, f.share * 100.0))
                        .collect();
                    let _ = writeln!(
                        out,
                        "{name}: n={}, missing={}, distinct={}, levels: {}",
                        s.count,
                        s.missing,
                        s.distinct,
                        levels.join(", ")
                    );
                }
            }
        }
        out
    }
}

/// Describes every column of the dataset.
pub fn describe_all(dataset: &Dataset) -> Result<DescriptiveTable, AnalysisError> {
    let mut entries = Vec::new();
    for (name, col) in dataset.frame().iter() {
        entries.push((name.to_string(), summarize(dataset, name, col)?));
    }
    Ok(DescriptiveTable { entries })
}

/// One row of the missing-value report.
#[derive(Debug, Clone, PartialEq)]
pub struct MissingEntry {
    pub column: String,
    pub missing: usize,
    /// Percentage of rows missing, in [0, 100].
    pub percent: f64,
}

/// Missing-value analysis over the whole dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct MissingReport {
    /// Per-column entries in dataset order.
    pub per_column: Vec<MissingEntry>,
    pub total_cells: usize,
    pub total_missing: usize,
}

impl MissingReport {
    /// Renders the report as text.
    pub fn render(&self) -> String {
        let mut out = String::from("=== Missing Value Analysis ===\n");
        for e in &self.per_column {
            let _ = writeln!(out, "{}: {} missing ({:.2}%)", e.column, e.missing, e.percent);
        }
        let overall = if self.total_cells > 0 {
            self.total_missing as f64 / self.total_cells as f64 * 100.0
        } else {
            0.0
        };
        let _ = writeln!(
            out,
            "total: {} of {} cells missing ({overall:.2}%)",
            self.total_missing, self.total_cells
        );
        out
    }
}

/// Counts missing values per column and overall.
pub fn missing_value_analysis(dataset: &Dataset) -> MissingReport {
    let frame = dataset.frame();
    let rows = frame.row_count();
    let per_column = frame
        .iter()
        .map(|(name, col)| MissingEntry {
            column: name.to_string(),
            missing: col.null_count(),
            percent: if rows > 0 {
                col.null_count() as f64 / rows as f64 * 100.0
            } else {
                0.0
            },
        })
        .collect();
    MissingReport {
        per_column,
        total_cells: rows * frame.column_count(),
        total_missing: frame.total_null_count(),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::AnalysisSession;

    fn session() -> AnalysisSession {
        let csv = "score,group\npoints,arm\n\
            1,a\n2,a\n3,b\n4,b\n5,a\n6,b\n7,a\n8,b\n9,a\n10,b\nnan,a\n11,a\n";
        let mut s = AnalysisSession::new();
        s.load_str(csv).unwrap();
        s
    }

    #[test]
    fn numeric_describe() {
        let s = session();
        let ds = s.dataset().unwrap();
        let ColumnSummary::Numeric(sum) = describe(ds, "score").unwrap() else {
            panic!("expected numeric summary");
        };
        assert_eq!(sum.count, 11);
        assert_eq!(sum.missing, 1);
        assert!((sum.mean - 6.0).abs() < 1e-12);
        assert_eq!(sum.min, 1.0);
        assert_eq!(sum.max, 11.0);
        assert_eq!(sum.median, 6.0);
    }

    #[test]
    fn categorical_describe() {
        let s = session();
        let ds = s.dataset().unwrap();
        let ColumnSummary::Categorical(sum) = describe(ds, "group").unwrap() else {
            panic!("expected categorical summary");
        };
        assert_eq!(sum.count, 12);
        assert_eq!(sum.distinct, 2);
        assert_eq!(sum.frequencies[0].level, "a");
        assert_eq!(sum.frequencies[0].count, 7);
        assert!((sum.frequencies[0].share - 7.0 / 12.0).abs() < 1e-12);
    }

    #[test]
    fn describe_unknown_column() {
        let s = session();
        let err = describe(s.dataset().unwrap(), "nope").unwrap_err();
        assert!(matches!(err, AnalysisError::ColumnNotFound { .. }));
    }

    #[test]
    fn describe_all_covers_every_column() {
        let s = session();
        let table = describe_all(s.dataset().unwrap()).unwrap();
        assert_eq!(table.entries.len(), 2);
        assert_eq!(table.entries[0].0, "score");
        let text = table.render();
        assert!(text.contains("score"));
        assert!(text.contains("group"));
    }

    #[test]
    fn missing_report_counts() {
        let s = session();
        let report = missing_value_analysis(s.dataset().unwrap());
        assert_eq!(report.total_cells, 24);
        assert_eq!(report.total_missing, 1);
        let score = &report.per_column[0];
        assert_eq!(score.column, "score");
        assert_eq!(score.missing, 1);
        assert!((score.percent - 100.0 / 12.0).abs() < 1e-9);
    }
}
