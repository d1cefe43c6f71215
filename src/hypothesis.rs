//! Hypothesis-test façade.
//!
//! Each operation validates the requested columns against the active
//! dataset's role partition, drops missing values, runs the test, and
//! returns a [`TestReport`] with the fixed interpretation policy
//! applied. Group comparisons take the grouping levels from the label
//! column itself, so a level whose measurements are all missing still
//! counts toward the level requirement.

use std::fmt::Write as _;

use crate::classify::ColumnRole;
use crate::engine;
use crate::error::AnalysisError;
use crate::interpret::Significance;
use crate::session::{first_two, Dataset};

/// Sample size above which normality switches from Shapiro-Wilk to
/// the Kolmogorov-Smirnov test.
pub const NORMALITY_LARGE_SAMPLE: usize = 5000;

/// Outcome of a hypothesis test, ready for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct TestReport {
    /// Human-readable test name.
    pub test: String,
    /// Columns involved, in the order given.
    pub columns: Vec<String>,
    /// Symbol of the statistic ("t", "F", "chi2", "U", "H", "W", "D").
    pub statistic_label: &'static str,
    pub statistic: f64,
    /// Degrees of freedom, where the test has them.
    pub df: Option<f64>,
    pub p_value: f64,
    pub significance: Significance,
    /// Per-group or per-table context lines.
    pub details: Vec<String>,
}

impl TestReport {
    /// Renders the report as text.
    pub fn render(&self) -> String {
        let mut out = format!("=== {} ===\n", self.test);
        let _ = writeln!(out, "columns: {}", self.columns.join(", "));
        for d in &self.details {
            let _ = writeln!(out, "  {d}");
        }
        match self.df {
            Some(df) => {
                let _ = writeln!(
                    out,
                    "{} = {:.4}, df = {df:.4}, p = {:.4}",
                    self.statistic_label, self.statistic, self.p_value
                );
            }
            None => {
                let _ = writeln!(
                    out,
                    "{} = {:.4}, p = {:.4}",
                    self.statistic_label, self.statistic, self.p_value
                );
            }
        }
        let _ = writeln!(out, "result: {}", self.significance);
        out
    }
}

fn group_line(level: &str, values: &[f64]) -> String {
    let mean = u_numflow::stats::mean(values).unwrap_or(f64::NAN);
    let std = u_numflow::stats::std_dev(values).unwrap_or(f64::NAN);
    format!("{level}: n={}, mean={mean:.4}, std={std:.4}", values.len())
}

/// Counts the grouping levels of a label column, independent of the
/// measurement column.
fn level_count(dataset: &Dataset, cat: &str) -> Result<usize, AnalysisError> {
    Ok(dataset.frame().level_frequencies(cat)?.len())
}

// ── Two-group comparisons ─────────────────────────────────────────────

/// Independent samples t-test (pooled variances) of `cont` grouped by
/// the two levels of `cat`.
pub fn t_test(dataset: &Dataset, cat: &str, cont: &str) -> Result<TestReport, AnalysisError> {
    dataset.require_role(cat, ColumnRole::Categorical)?;
    dataset.require_role(cont, ColumnRole::Continuous)?;

    let levels = level_count(dataset, cat)?;
    if levels != 2 {
        return Err(AnalysisError::InvalidGroupCount {
            column: cat.to_string(),
            actual: levels,
        });
    }

    let groups = dataset.frame().groups_by(cat, cont)?;
    if groups.len() != 2 {
        return Err(AnalysisError::InsufficientGroups {
            actual: groups.len(),
        });
    }
    let result = engine::student_t(&groups[0].1, &groups[1].1).ok_or_else(|| {
        AnalysisError::computation("t-test", &[cat, cont], "groups too small or without spread")
    })?;

    Ok(TestReport {
        test: "Independent Samples t-test".to_string(),
        columns: vec![cat.to_string(), cont.to_string()],
        statistic_label: "t",
        statistic: result.statistic,
        df: Some(result.df),
        p_value: result.p_value,
        significance: Significance::from_p(result.p_value),
        details: groups.iter().map(|(l, v)| group_line(l, v)).collect(),
    })
}

/// Mann-Whitney U test of `cont` grouped by the two levels of `cat`.
pub fn mann_whitney(
    dataset: &Dataset,
    cat: &str,
    cont: &str,
) -> Result<TestReport, AnalysisError> {
    dataset.require_role(cat, ColumnRole::Categorical)?;
    dataset.require_role(cont, ColumnRole::Continuous)?;

    let levels = level_count(dataset, cat)?;
    if levels != 2 {
        return Err(AnalysisError::InvalidGroupCount {
            column: cat.to_string(),
            actual: levels,
        });
    }

    let groups = dataset.frame().groups_by(cat, cont)?;
    if groups.len() != 2 {
        return Err(AnalysisError::InsufficientGroups {
            actual: groups.len(),
        });
    }
    let result = engine::mann_whitney(&groups[0].1, &groups[1].1).ok_or_else(|| {
        AnalysisError::computation("Mann-Whitney U", &[cat, cont], "empty group")
    })?;

    let details = groups
        .iter()
        .map(|(level, values)| {
            let median = u_numflow::stats::median(values).unwrap_or(f64::NAN);
            format!("{level}: n={}, median={median:.4}", values.len())
        })
        .collect();

    Ok(TestReport {
        test: "Mann-Whitney U Test".to_string(),
        columns: vec![cat.to_string(), cont.to_string()],
        statistic_label: "U",
        statistic: result.statistic,
        df: None,
        p_value: result.p_value,
        significance: Significance::from_p(result.p_value),
        details,
    })
}

// ── Paired comparison ─────────────────────────────────────────────────

/// Paired t-test over the first two continuous columns of `selection`
/// (extra entries are ignored). Pairs are rows valid in both columns.
pub fn paired_t_test(dataset: &Dataset, selection: &[&str]) -> Result<TestReport, AnalysisError> {
    let (a, b) = first_two(selection, "continuous")?;
    dataset.require_role(a, ColumnRole::Continuous)?;
    dataset.require_role(b, ColumnRole::Continuous)?;

    let (va, vb) = dataset.frame().paired_numeric(a, b)?;
    if va.len() < 2 {
        return Err(AnalysisError::InsufficientData {
            min_required: 2,
            actual: va.len(),
        });
    }
    let result = engine::paired_t(&va, &vb).ok_or_else(|| {
        AnalysisError::computation("paired t-test", &[a, b], "differences have no spread")
    })?;

    let diffs: Vec<f64> = va.iter().zip(&vb).map(|(x, y)| x - y).collect();
    let mean_diff = diffs.iter().sum::<f64>() / diffs.len() as f64;

    Ok(TestReport {
        test: "Paired Samples t-test".to_string(),
        columns: vec![a.to_string(), b.to_string()],
        statistic_label: "t",
        statistic: result.statistic,
        df: Some(result.df),
        p_value: result.p_value,
        significance: Significance::from_p(result.p_value),
        details: vec![format!(
            "aligned pairs: n={}, mean difference={mean_diff:.4}",
            va.len()
        )],
    })
}

// ── Multi-group comparisons ───────────────────────────────────────────

/// One-way ANOVA of `cont` grouped by the levels of `cat`.
pub fn anova(dataset: &Dataset, cat: &str, cont: &str) -> Result<TestReport, AnalysisError> {
    dataset.require_role(cat, ColumnRole::Categorical)?;
    dataset.require_role(cont, ColumnRole::Continuous)?;

    let groups = dataset.frame().groups_by(cat, cont)?;
    if groups.len() < 2 {
        return Err(AnalysisError::InsufficientGroups {
            actual: groups.len(),
        });
    }
    let refs: Vec<&[f64]> = groups.iter().map(|(_, v)| v.as_slice()).collect();
    let result = u_analytics::testing::one_way_anova(&refs).ok_or_else(|| {
        AnalysisError::computation("one-way ANOVA", &[cat, cont], "groups too small")
    })?;

    let k = groups.len();
    let n: usize = groups.iter().map(|(_, v)| v.len()).sum();
    Ok(TestReport {
        test: "One-Way ANOVA".to_string(),
        columns: vec![cat.to_string(), cont.to_string()],
        statistic_label: "F",
        statistic: result.f_statistic,
        df: Some((k - 1) as f64),
        p_value: result.p_value,
        significance: Significance::from_p(result.p_value),
        details: {
            let mut lines: Vec<String> =
                groups.iter().map(|(l, v)| group_line(l, v)).collect();
            lines.push(format!("between df={}, within df={}", k - 1, n - k));
            lines
        },
    })
}

/// Kruskal-Wallis H test of `cont` grouped by the levels of `cat`.
pub fn kruskal_wallis(
    dataset: &Dataset,
    cat: &str,
    cont: &str,
) -> Result<TestReport, AnalysisError> {
    dataset.require_role(cat, ColumnRole::Categorical)?;
    dataset.require_role(cont, ColumnRole::Continuous)?;

    let groups = dataset.frame().groups_by(cat, cont)?;
    if groups.len() < 2 {
        return Err(AnalysisError::InsufficientGroups {
            actual: groups.len(),
        });
    }
    let refs: Vec<&[f64]> = groups.iter().map(|(_, v)| v.as_slice()).collect();
    let result = engine::kruskal_wallis(&refs).ok_or_else(|| {
        AnalysisError::computation("Kruskal-Wallis", &[cat, cont], "groups too small")
    })?;

    let details = groups
        .iter()
        .map(|(level, values)| {
            let median = u_numflow::stats::median(values).unwrap_or(f64::NAN);
            format!("{level}: n={}, median={median:.4}", values.len())
        })
        .collect();

    Ok(TestReport {
        test: "Kruskal-Wallis H Test".to_string(),
        columns: vec![cat.to_string(), cont.to_string()],
        statistic_label: "H",
        statistic: result.statistic,
        df: Some(result.df),
        p_value: result.p_value,
        significance: Significance::from_p(result.p_value),
        details,
    })
}

// ── Independence ──────────────────────────────────────────────────────

/// Chi-square test of independence over the first two categorical
/// columns of `selection` (extra entries are ignored).
pub fn chi_square(dataset: &Dataset, selection: &[&str]) -> Result<TestReport, AnalysisError> {
    let (a, b) = first_two(selection, "categorical")?;
    dataset.require_role(a, ColumnRole::Categorical)?;
    dataset.require_role(b, ColumnRole::Categorical)?;

    let (row_levels, col_levels, table) = dataset.frame().crosstab(a, b)?;
    if row_levels.len() < 2 {
        return Err(AnalysisError::InvalidGroupCount {
            column: a.to_string(),
            actual: row_levels.len(),
        });
    }
    if col_levels.len() < 2 {
        return Err(AnalysisError::InvalidGroupCount {
            column: b.to_string(),
            actual: col_levels.len(),
        });
    }

    let result =
        u_analytics::testing::chi_squared_independence(&table, row_levels.len(), col_levels.len())
            .ok_or_else(|| {
                AnalysisError::computation("chi-square", &[a, b], "degenerate contingency table")
            })?;

    let df = ((row_levels.len() - 1) * (col_levels.len() - 1)) as f64;
    let mut details = vec![format!("levels: {} x {}", col_levels.join("/"), row_levels.join("/"))];
    for (r, row_level) in row_levels.iter().enumerate() {
        let counts: Vec<String> = (0..col_levels.len())
            .map(|c| format!("{}", table[r * col_levels.len() + c] as u64))
            .collect();
        details.push(format!("{row_level}: {}", counts.join(" ")));
    }

    Ok(TestReport {
        test: "Chi-Square Test of Independence".to_string(),
        columns: vec![a.to_string(), b.to_string()],
        statistic_label: "chi2",
        statistic: result.statistic,
        df: Some(df),
        p_value: result.p_value,
        significance: Significance::from_p(result.p_value),
        details,
    })
}

// ── Normality ─────────────────────────────────────────────────────────

/// Normality test of a continuous column. Samples above
/// [`NORMALITY_LARGE_SAMPLE`] use the Kolmogorov-Smirnov test against
/// a fitted normal; smaller samples use Shapiro-Wilk.
pub fn normality(dataset: &Dataset, cont: &str) -> Result<TestReport, AnalysisError> {
    dataset.require_role(cont, ColumnRole::Continuous)?;
    let values = dataset.frame().numeric_values(cont)?;
    if values.len() < 3 {
        return Err(AnalysisError::InsufficientData {
            min_required: 3,
            actual: values.len(),
        });
    }

    let (test, label, statistic, p_value, reason) = if values.len() > NORMALITY_LARGE_SAMPLE {
        let (d, p) = u_analytics::distribution::ks_test_normal(&values).ok_or_else(|| {
            AnalysisError::computation("normality test", &[cont], "no spread in sample")
        })?;
        (
            "Kolmogorov-Smirnov Normality Test",
            "D",
            d,
            p,
            format!("n={} > {NORMALITY_LARGE_SAMPLE}, using Kolmogorov-Smirnov", values.len()),
        )
    } else {
        let r = u_analytics::testing::shapiro_wilk_test(&values).ok_or_else(|| {
            AnalysisError::computation("normality test", &[cont], "no spread in sample")
        })?;
        (
            "Shapiro-Wilk Normality Test",
            "W",
            r.w,
            r.p_value,
            format!("n={} <= {NORMALITY_LARGE_SAMPLE}, using Shapiro-Wilk", values.len()),
        )
    };

    let significance = Significance::from_p(p_value);
    let verdict = if significance.is_significant() {
        "normality rejected"
    } else {
        "no evidence against normality"
    };
    Ok(TestReport {
        test: test.to_string(),
        columns: vec![cont.to_string()],
        statistic_label: label,
        statistic,
        df: None,
        p_value,
        significance,
        details: vec![reason, verdict.to_string()],
    })
}

// ── Tests ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataframe::{Column, DataFrame, ValidityBitmap};
    use crate::session::AnalysisSession;

    /// 24 rows, two balanced groups with separated score distributions
    /// and a three-level arm column.
    fn session() -> AnalysisSession {
        let mut csv = String::from("score,pre,group,arm\npoints,points,code,code\n");
        for i in 0..12 {
            // group a scores low, group b scores high
            let a_score = 60.0 + i as f64 + 0.1 * i as f64;
            let b_score = 80.0 + i as f64 + 0.2 * i as f64;
            let arm = ["x", "y", "z"][i % 3];
            csv.push_str(&format!("{a_score},{:.1},a,{arm}\n", a_score - 2.0));
            csv.push_str(&format!("{b_score},{:.1},b,{arm}\n", b_score - 3.0));
        }
        let mut s = AnalysisSession::new();
        s.load_str(&csv).unwrap();
        s
    }

    #[test]
    fn t_test_separated_groups_is_significant() {
        let s = session();
        let report = t_test(s.dataset().unwrap(), "group", "score").unwrap();
        assert_eq!(report.statistic_label, "t");
        assert_eq!(report.df, Some(22.0));
        assert!(report.statistic < 0.0); // group a mean below group b
        assert!(report.significance.is_significant());
        assert_eq!(report.details.len(), 2);
        assert!(report.render().contains("Independent Samples t-test"));
    }

    #[test]
    fn t_test_rejects_three_levels() {
        let s = session();
        let err = t_test(s.dataset().unwrap(), "arm", "score").unwrap_err();
        assert_eq!(
            err,
            AnalysisError::InvalidGroupCount {
                column: "arm".to_string(),
                actual: 3
            }
        );
    }

    #[test]
    fn t_test_role_validation() {
        let s = session();
        let ds = s.dataset().unwrap();
        assert!(matches!(
            t_test(ds, "score", "pre"),
            Err(AnalysisError::WrongRole { .. })
        ));
        assert!(matches!(
            t_test(ds, "missing", "score"),
            Err(AnalysisError::ColumnNotFound { .. })
        ));
    }

    #[test]
    fn paired_t_uses_first_two_of_selection() {
        let s = session();
        let report =
            paired_t_test(s.dataset().unwrap(), &["score", "pre", "ignored"]).unwrap();
        // scores are a constant 2 or 3 above pre within each group
        assert!(report.statistic > 0.0);
        assert!(report.significance.is_significant());
        assert_eq!(report.columns, vec!["score", "pre"]);
    }

    #[test]
    fn paired_t_needs_two_columns() {
        let s = session();
        let err = paired_t_test(s.dataset().unwrap(), &["score"]).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidParameter { .. }));
    }

    #[test]
    fn mann_whitney_separated_groups() {
        let s = session();
        let report = mann_whitney(s.dataset().unwrap(), "group", "score").unwrap();
        assert_eq!(report.statistic_label, "U");
        assert!(report.p_value < 0.01);
    }

    #[test]
    fn anova_three_arms_runs() {
        let s = session();
        let report = anova(s.dataset().unwrap(), "arm", "score").unwrap();
        assert_eq!(report.statistic_label, "F");
        assert_eq!(report.df, Some(2.0));
        assert!(report.p_value >= 0.0 && report.p_value <= 1.0);
    }

    #[test]
    fn kruskal_wallis_three_arms() {
        let s = session();
        let report = kruskal_wallis(s.dataset().unwrap(), "arm", "score").unwrap();
        assert_eq!(report.df, Some(2.0));
        // arms interleave both groups, so no arm effect is expected
        assert!(!report.significance.is_significant());
    }

    #[test]
    fn chi_square_group_by_arm() {
        let s = session();
        let report = chi_square(s.dataset().unwrap(), &["group", "arm"]).unwrap();
        assert_eq!(report.df, Some(2.0));
        // groups are balanced across arms by construction
        assert!(!report.significance.is_significant());
    }

    #[test]
    fn chi_square_rejects_single_level() {
        let mut csv = String::from("g,one\ncode,code\n");
        for i in 0..8 {
            csv.push_str(if i % 2 == 0 { "a,same\n" } else { "b,same\n" });
        }
        let mut s = AnalysisSession::new();
        s.load_str(&csv).unwrap();
        let err = chi_square(s.dataset().unwrap(), &["g", "one"]).unwrap_err();
        assert_eq!(
            err,
            AnalysisError::InvalidGroupCount {
                column: "one".to_string(),
                actual: 1
            }
        );
    }

    #[test]
    fn normality_small_sample_uses_shapiro() {
        let s = session();
        let report = normality(s.dataset().unwrap(), "score").unwrap();
        assert_eq!(report.statistic_label, "W");
        assert!(report.details[0].contains("Shapiro-Wilk"));
    }

    #[test]
    fn normality_large_sample_uses_ks() {
        // 6000 distinct values, installed directly as a frame
        let n = 6000;
        let values: Vec<f64> = (0..n).map(|i| (i as f64) * 0.01).collect();
        let mut df = DataFrame::new();
        df.add_column("v".into(), Column::numeric(values, ValidityBitmap::all_valid(n)))
            .unwrap();
        let ds = crate::session::Dataset::from_frame(df);
        let report = normality(&ds, "v").unwrap();
        assert_eq!(report.statistic_label, "D");
        assert!(report.details[0].contains("Kolmogorov-Smirnov"));
    }

    #[test]
    fn normality_requires_continuous_column() {
        let s = session();
        let err = normality(s.dataset().unwrap(), "group").unwrap_err();
        assert!(matches!(err, AnalysisError::WrongRole { .. }));
    }
}
