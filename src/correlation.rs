//! Correlation analysis and simple linear regression.
//!
//! The correlation report covers every continuous column: a Pearson
//! matrix over complete cases plus the strong-pairs table, all pairs
//! with |r| above the 0.5 reporting threshold sorted by |r| descending
//! and labeled through the fixed interpretation policy.

use std::fmt::Write as _;

use crate::classify::ColumnRole;
use crate::error::AnalysisError;
use crate::interpret::{CorrelationStrength, Significance};
use crate::session::Dataset;

/// Reporting threshold for the strong-pairs table.
pub const PAIR_THRESHOLD: f64 = 0.5;

/// One entry of the strong-pairs table.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationPair {
    pub a: String,
    pub b: String,
    pub r: f64,
    pub p_value: f64,
    pub strength: CorrelationStrength,
}

/// Pearson correlation matrix with the strong-pairs table.
#[derive(Debug, Clone)]
pub struct CorrelationReport {
    /// Continuous columns, matrix order.
    pub columns: Vec<String>,
    /// Symmetric correlation matrix, row-major per column.
    pub values: Vec<Vec<f64>>,
    /// Complete cases the matrix was computed over.
    pub observations: usize,
    /// Pairs with |r| > 0.5, sorted by |r| descending.
    pub strong_pairs: Vec<CorrelationPair>,
}

impl CorrelationReport {
    /// Looks up r for a pair of columns.
    pub fn r_between(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == a)?;
        let j = self.columns.iter().position(|c| c == b)?;
        Some(self.values[i][j])
    }

    /// Renders the report as text.
    pub fn render(&self) -> String {
        let mut out = String::from("=== Correlation Analysis ===\n");
        let _ = writeln!(
            out,
            "variables: {} (n={})",
            self.columns.join(", "),
            self.observations
        );
        if self.strong_pairs.is_empty() {
            out.push_str("no pairs with |r| > 0.5\n");
        } else {
            out.push_str("pairs with |r| > 0.5:\n");
            for p in &self.strong_pairs {
                let _ = writeln!(
                    out,
                    "  {} ~ {}: r={:.4} ({}), p={:.4}",
                    p.a, p.b, p.r, p.strength, p.p_value
                );
            }
        }
        out
    }
}

/// Computes the correlation report over all continuous columns.
pub fn correlation_report(dataset: &Dataset) -> Result<CorrelationReport, AnalysisError> {
    let columns: Vec<String> = dataset.continuous_columns().to_vec();
    if columns.len() < 2 {
        return Err(AnalysisError::InsufficientVariables {
            min_required: 2,
            actual: columns.len(),
        });
    }
    let names: Vec<&str> = columns.iter().map(|c| c.as_str()).collect();
    let (rows, data) = dataset.frame().complete_rows(&names)?;
    if rows.len() < 3 {
        return Err(AnalysisError::InsufficientData {
            min_required: 3,
            actual: rows.len(),
        });
    }

    let refs: Vec<&[f64]> = data.iter().map(|c| c.as_slice()).collect();
    let matrix = u_analytics::correlation::correlation_matrix(&refs).ok_or_else(|| {
        AnalysisError::computation("correlation matrix", &names, "constant column")
    })?;

    let n = columns.len();
    let values: Vec<Vec<f64>> = (0..n)
        .map(|i| (0..n).map(|j| matrix.get(i, j)).collect())
        .collect();

    let mut strong_pairs = Vec::new();
    for i in 0..n {
        for j in (i + 1)..n {
            let r = values[i][j];
            let Some(strength) = CorrelationStrength::from_r(r) else {
                continue;
            };
            let p_value = u_analytics::correlation::pearson(refs[i], refs[j])
                .map_or(f64::NAN, |pr| pr.p_value);
            strong_pairs.push(CorrelationPair {
                a: columns[i].clone(),
                b: columns[j].clone(),
                r,
                p_value,
                strength,
            });
        }
    }
    strong_pairs.sort_by(|x, y| {
        y.r.abs()
            .partial_cmp(&x.r.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    Ok(CorrelationReport {
        columns,
        values,
        observations: rows.len(),
        strong_pairs,
    })
}

/// Simple linear regression of `y` on `x` over paired valid rows.
#[derive(Debug, Clone, PartialEq)]
pub struct RegressionReport {
    pub x: String,
    pub y: String,
    pub n: usize,
    pub slope: f64,
    pub intercept: f64,
    /// Standard error of the slope.
    pub std_err: f64,
    /// Pearson r, signed like the slope.
    pub r: f64,
    pub r_squared: f64,
    pub p_value: f64,
    pub significance: Significance,
}

impl RegressionReport {
    /// Renders the report as text.
    pub fn render(&self) -> String {
        let mut out = String::from("=== Linear Regression ===\n");
        let _ = writeln!(out, "{} = {:.4} * {} + {:.4}", self.y, self.slope, self.x, self.intercept);
        let _ = writeln!(
            out,
            "n={}, r={:.4}, R²={:.4}, SE(slope)={:.4}, p={:.4}",
            self.n, self.r, self.r_squared, self.std_err, self.p_value
        );
        let _ = writeln!(out, "result: {}", self.significance);
        out
    }
}

/// Fits `y ~ x` over the rows valid in both columns.
pub fn linear_regression(
    dataset: &Dataset,
    x: &str,
    y: &str,
) -> Result<RegressionReport, AnalysisError> {
    dataset.require_role(x, ColumnRole::Continuous)?;
    dataset.require_role(y, ColumnRole::Continuous)?;

    let (xs, ys) = dataset.frame().paired_numeric(x, y)?;
    if xs.len() < 3 {
        return Err(AnalysisError::InsufficientData {
            min_required: 3,
            actual: xs.len(),
        });
    }

    let fit = u_analytics::regression::simple_linear_regression(&xs, &ys).ok_or_else(|| {
        AnalysisError::computation("linear regression", &[x, y], "predictor has no spread")
    })?;

    let r = fit.r_squared.max(0.0).sqrt() * fit.slope.signum();
    let std_err = slope_std_err(&xs, &ys, fit.slope, fit.intercept);
    Ok(RegressionReport {
        x: x.to_string(),
        y: y.to_string(),
        n: xs.len(),
        slope: fit.slope,
        intercept: fit.intercept,
        std_err,
        r,
        r_squared: fit.r_squared,
        p_value: fit.slope_p,
        significance: Significance::from_p(fit.slope_p),
    })
}

/// Standard error of the fitted slope from the residual variance.
fn slope_std_err(xs: &[f64], ys: &[f64], slope: f64, intercept: f64) -> f64 {
    let n = xs.len() as f64;
    if n <= 2.0 {
        return f64::NAN;
    }
    let x_mean = xs.iter().sum::<f64>() / n;
    let sxx: f64 = xs.iter().map(|x| (x - x_mean).powi(2)).sum();
    if sxx <= 0.0 {
        return f64::NAN;
    }
    let sse: f64 = xs
        .iter()
        .zip(ys)
        .map(|(x, y)| {
            let resid = y - (slope * x + intercept);
            resid * resid
        })
        .sum();
    (sse / (n - 2.0) / sxx).sqrt()
}

// ── Tests ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::AnalysisSession;

    /// a counts up, b tracks a linearly, c alternates independently.
    fn session() -> AnalysisSession {
        let mut csv = String::from("a,b,c\nu,u,u\n");
        for i in 0..16 {
            let a = i as f64;
            let b = 2.0 * a + 1.0 + if i % 2 == 0 { 0.3 } else { -0.3 };
            let c = if i % 2 == 0 { 5.0 + i as f64 * 0.01 } else { -5.0 - i as f64 * 0.01 };
            csv.push_str(&format!("{a},{b:.2},{c:.2}\n"));
        }
        let mut s = AnalysisSession::new();
        s.load_str(&csv).unwrap();
        s
    }

    #[test]
    fn report_finds_strong_pair() {
        let s = session();
        let report = correlation_report(s.dataset().unwrap()).unwrap();
        assert_eq!(report.columns, vec!["a", "b", "c"]);
        assert_eq!(report.observations, 16);
        // diagonal is 1
        assert!((report.values[0][0] - 1.0).abs() < 1e-9);
        // a ~ b is nearly perfect
        let r_ab = report.r_between("a", "b").unwrap();
        assert!(r_ab > 0.99);
        assert_eq!(report.strong_pairs[0].a, "a");
        assert_eq!(report.strong_pairs[0].b, "b");
        assert_eq!(report.strong_pairs[0].strength, CorrelationStrength::Strong);
        // a ~ c alternates around zero and stays out of the table
        assert!(!report
            .strong_pairs
            .iter()
            .any(|p| (p.a == "a" && p.b == "c") || (p.a == "c" && p.b == "a")));
    }

    #[test]
    fn strong_pairs_sorted_by_abs_r() {
        let s = session();
        let report = correlation_report(s.dataset().unwrap()).unwrap();
        for w in report.strong_pairs.windows(2) {
            assert!(w[0].r.abs() >= w[1].r.abs());
        }
    }

    #[test]
    fn report_needs_two_continuous_columns() {
        let mut s = AnalysisSession::new();
        s.load_str("x\nu\n1\n2\n3\n4\n5\n6\n7\n8\n9\n10\n11\n").unwrap();
        let err = correlation_report(s.dataset().unwrap()).unwrap_err();
        assert_eq!(
            err,
            AnalysisError::InsufficientVariables {
                min_required: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn regression_recovers_line() {
        let s = session();
        let report = linear_regression(s.dataset().unwrap(), "a", "b").unwrap();
        assert_eq!(report.n, 16);
        assert!((report.slope - 2.0).abs() < 0.05);
        assert!((report.intercept - 1.0).abs() < 0.4);
        assert!(report.r > 0.99);
        assert!(report.p_value < 0.001);
        assert!(report.std_err > 0.0);
        assert!(report.render().contains("Linear Regression"));
    }

    #[test]
    fn regression_requires_continuous_roles() {
        let mut csv = String::from("g,v\nu,u\n");
        for i in 0..12 {
            csv.push_str(&format!("{},{}\n", if i % 2 == 0 { "a" } else { "b" }, i));
        }
        let mut s = AnalysisSession::new();
        s.load_str(&csv).unwrap();
        let err = linear_regression(s.dataset().unwrap(), "g", "v").unwrap_err();
        assert!(matches!(err, AnalysisError::WrongRole { .. }));
    }
}
