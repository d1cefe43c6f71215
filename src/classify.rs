//! Column role classification.
//!
//! Every loaded column is assigned one of two analysis roles. A column
//! is [`Continuous`](ColumnRole::Continuous) when it is numeric and has
//! more than [`CONTINUOUS_DISTINCT_MIN`] distinct non-missing values;
//! everything else, including numeric columns with few distinct values
//! (Likert scales, coded groups), is
//! [`Categorical`](ColumnRole::Categorical).

use crate::dataframe::DataFrame;

/// Distinct-value count a numeric column must exceed to be continuous.
pub const CONTINUOUS_DISTINCT_MIN: usize = 10;

/// Analysis role of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRole {
    /// Numeric with many distinct values; usable for means, correlation,
    /// regression, PCA, clustering.
    Continuous,
    /// Grouping variable; usable for group comparisons and frequency
    /// tables.
    Categorical,
}

impl std::fmt::Display for ColumnRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Continuous => write!(f, "continuous"),
            Self::Categorical => write!(f, "categorical"),
        }
    }
}

/// Role assignment for every column of a dataset, in dataset column
/// order within each role.
#[derive(Debug, Clone, PartialEq)]
pub struct RolePartition {
    /// Names of continuous columns.
    pub continuous: Vec<String>,
    /// Names of categorical columns.
    pub categorical: Vec<String>,
}

impl RolePartition {
    /// Returns the role of `name`, or `None` if the column is unknown.
    pub fn role_of(&self, name: &str) -> Option<ColumnRole> {
        if self.continuous.iter().any(|c| c == name) {
            Some(ColumnRole::Continuous)
        } else if self.categorical.iter().any(|c| c == name) {
            Some(ColumnRole::Categorical)
        } else {
            None
        }
    }

    /// Returns `true` when `name` is a continuous column.
    pub fn is_continuous(&self, name: &str) -> bool {
        self.role_of(name) == Some(ColumnRole::Continuous)
    }
}

/// Classifies every column of `df` into its analysis role.
pub fn classify(df: &DataFrame) -> RolePartition {
    let mut continuous = Vec::new();
    let mut categorical = Vec::new();
    for (name, col) in df.iter() {
        if col.is_numeric() && col.distinct_count() > CONTINUOUS_DISTINCT_MIN {
            continuous.push(name.to_string());
        } else {
            categorical.push(name.to_string());
        }
    }
    RolePartition {
        continuous,
        categorical,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataframe::{Column, ValidityBitmap};

    fn frame_with(name: &str, col: Column) -> DataFrame {
        let mut df = DataFrame::new();
        df.add_column(name.to_string(), col).unwrap();
        df
    }

    #[test]
    fn numeric_with_many_distinct_values_is_continuous() {
        let values: Vec<f64> = (0..12).map(|i| i as f64).collect();
        let n = values.len();
        let df = frame_with("x", Column::numeric(values, ValidityBitmap::all_valid(n)));
        let roles = classify(&df);
        assert_eq!(roles.continuous, vec!["x"]);
        assert!(roles.categorical.is_empty());
    }

    #[test]
    fn numeric_likert_scale_is_categorical() {
        // 5 distinct codes repeated over many rows
        let values: Vec<f64> = (0..40).map(|i| (i % 5) as f64).collect();
        let n = values.len();
        let df = frame_with("item", Column::numeric(values, ValidityBitmap::all_valid(n)));
        let roles = classify(&df);
        assert_eq!(roles.categorical, vec!["item"]);
    }

    #[test]
    fn exactly_ten_distinct_is_categorical() {
        let values: Vec<f64> = (0..20).map(|i| (i % 10) as f64).collect();
        let df = frame_with(
            "x",
            Column::numeric(values, ValidityBitmap::all_valid(20)),
        );
        assert!(classify(&df).categorical.contains(&"x".to_string()));

        let values: Vec<f64> = (0..22).map(|i| (i % 11) as f64).collect();
        let df = frame_with(
            "y",
            Column::numeric(values, ValidityBitmap::all_valid(22)),
        );
        assert!(classify(&df).continuous.contains(&"y".to_string()));
    }

    #[test]
    fn string_column_is_categorical() {
        let df = frame_with(
            "g",
            Column::text(
                vec!["a".into(), "b".into(), "c".into()],
                ValidityBitmap::all_valid(3),
            ),
        );
        let roles = classify(&df);
        assert_eq!(roles.categorical, vec!["g"]);
        assert_eq!(roles.role_of("g"), Some(ColumnRole::Categorical));
        assert_eq!(roles.role_of("unknown"), None);
    }

    #[test]
    fn missing_values_do_not_count_as_distinct() {
        let mut validity = ValidityBitmap::all_valid(15);
        for i in 11..15 {
            validity.set_invalid(i);
        }
        // 11 valid distinct values, 4 missing
        let values: Vec<f64> = (0..15).map(|i| i as f64).collect();
        let df = frame_with("x", Column::numeric(values, validity));
        assert!(classify(&df).is_continuous("x"));
    }
}
