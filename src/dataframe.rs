//! Column-major DataFrame for delimited tabular data.
//!
//! The [`DataFrame`] stores data in column-major order with typed columns
//! and a compact validity bitmap for tracking missing values.
//!
//! # Column Types
//!
//! | Type | Storage | Use case |
//! |------|---------|----------|
//! | [`Numeric`](Column::Numeric) | `Vec<f64>` + bitmap | Continuous/integer values |
//! | [`Categorical`](Column::Categorical) | Dictionary + `Vec<u32>` | Low-cardinality strings |
//! | [`Text`](Column::Text) | `Vec<String>` + bitmap | High-cardinality strings |
//!
//! # Example
//!
//! ```
//! use statlab::dataframe::{DataFrame, Column, ValidityBitmap};
//!
//! let mut df = DataFrame::new();
//! df.add_column(
//!     "score".to_string(),
//!     Column::numeric(vec![71.5, 80.3, 66.8], ValidityBitmap::all_valid(3)),
//! ).unwrap();
//! assert_eq!(df.row_count(), 3);
//! assert_eq!(df.column_count(), 1);
//! ```

use std::collections::HashSet;

use crate::error::AnalysisError;

// ── ValidityBitmap ────────────────────────────────────────────────────

/// Bit-packed validity bitmap using `Vec<u64>`.
///
/// Each bit indicates whether the corresponding row is valid (1) or
/// missing (0). One bit per row instead of one byte.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidityBitmap {
    bits: Vec<u64>,
    len: usize,
}

impl ValidityBitmap {
    /// Creates a bitmap where all `len` positions are valid.
    pub fn all_valid(len: usize) -> Self {
        let n_words = len.div_ceil(64);
        let mut bits = vec![u64::MAX; n_words];
        let trailing = len % 64;
        if trailing != 0 && n_words > 0 {
            bits[n_words - 1] = (1u64 << trailing) - 1;
        }
        Self { bits, len }
    }

    /// Creates an empty bitmap with no rows.
    pub fn empty() -> Self {
        Self {
            bits: Vec::new(),
            len: 0,
        }
    }

    /// Returns `true` if the value at `idx` is valid (not missing).
    #[inline]
    pub fn is_valid(&self, idx: usize) -> bool {
        debug_assert!(idx < self.len, "index {idx} out of bounds (len={})", self.len);
        let (word, bit) = (idx / 64, idx % 64);
        (self.bits[word] >> bit) & 1 == 1
    }

    /// Marks position `idx` as missing.
    #[inline]
    pub fn set_invalid(&mut self, idx: usize) {
        debug_assert!(idx < self.len, "index {idx} out of bounds (len={})", self.len);
        let (word, bit) = (idx / 64, idx % 64);
        self.bits[word] &= !(1u64 << bit);
    }

    /// Appends a new position (valid or missing).
    pub fn push(&mut self, valid: bool) {
        let idx = self.len;
        self.len += 1;
        let word = idx / 64;
        let bit = idx % 64;
        if word >= self.bits.len() {
            self.bits.push(0);
        }
        if valid {
            self.bits[word] |= 1u64 << bit;
        }
    }

    /// Returns the total number of tracked positions.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the bitmap tracks zero positions.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Counts the number of missing positions.
    pub fn null_count(&self) -> usize {
        let valid: usize = self.bits.iter().map(|w| w.count_ones() as usize).sum();
        self.len - valid
    }

    /// Counts the number of valid positions.
    pub fn valid_count(&self) -> usize {
        self.len - self.null_count()
    }

    /// Returns an iterator over indices of valid positions.
    pub fn valid_indices(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len).filter(|&i| self.is_valid(i))
    }
}

// ── DataType ──────────────────────────────────────────────────────────

/// Storage type inferred for a column at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    /// Continuous or integer numeric values (stored as `f64`).
    Numeric,
    /// Low-cardinality strings (dictionary-encoded).
    Categorical,
    /// High-cardinality or free-form text.
    Text,
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Numeric => write!(f, "Numeric"),
            Self::Categorical => write!(f, "Categorical"),
            Self::Text => write!(f, "Text"),
        }
    }
}

// ── Column ────────────────────────────────────────────────────────────

/// A typed column with a validity bitmap for missing values.
///
/// Missing positions hold a placeholder value (0.0, index 0, or empty
/// string) that must be ignored via the validity bit.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    /// Dense `f64` values. Missing positions hold `0.0`.
    Numeric {
        values: Vec<f64>,
        validity: ValidityBitmap,
    },
    /// Dictionary-encoded categorical column.
    ///
    /// `dictionary` holds the unique levels in first-seen order;
    /// `indices` maps each row to a dictionary entry.
    Categorical {
        dictionary: Vec<String>,
        indices: Vec<u32>,
        validity: ValidityBitmap,
    },
    /// Free-form text column. Missing positions hold an empty string.
    Text {
        values: Vec<String>,
        validity: ValidityBitmap,
    },
}

impl Column {
    /// Creates a numeric column.
    pub fn numeric(values: Vec<f64>, validity: ValidityBitmap) -> Self {
        Self::Numeric { values, validity }
    }

    /// Creates a categorical column from a dictionary and indices.
    pub fn categorical(
        dictionary: Vec<String>,
        indices: Vec<u32>,
        validity: ValidityBitmap,
    ) -> Self {
        Self::Categorical {
            dictionary,
            indices,
            validity,
        }
    }

    /// Creates a text column.
    pub fn text(values: Vec<String>, validity: ValidityBitmap) -> Self {
        Self::Text { values, validity }
    }

    /// Returns the storage type of this column.
    pub fn data_type(&self) -> DataType {
        match self {
            Self::Numeric { .. } => DataType::Numeric,
            Self::Categorical { .. } => DataType::Categorical,
            Self::Text { .. } => DataType::Text,
        }
    }

    /// Returns the number of rows in this column.
    pub fn len(&self) -> usize {
        self.validity().len()
    }

    /// Returns `true` if the column has no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a reference to the validity bitmap.
    pub fn validity(&self) -> &ValidityBitmap {
        match self {
            Self::Numeric { validity, .. }
            | Self::Categorical { validity, .. }
            | Self::Text { validity, .. } => validity,
        }
    }

    /// Returns the number of missing values.
    pub fn null_count(&self) -> usize {
        self.validity().null_count()
    }

    /// Returns the number of valid values.
    pub fn valid_count(&self) -> usize {
        self.validity().valid_count()
    }

    /// Returns `true` if the value at `idx` is valid.
    pub fn is_valid(&self, idx: usize) -> bool {
        self.validity().is_valid(idx)
    }

    /// Returns `true` for numeric columns.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Numeric { .. })
    }

    /// Returns the numeric value at `idx`, or `None` if missing or
    /// not a numeric column.
    pub fn numeric_at(&self, idx: usize) -> Option<f64> {
        match self {
            Self::Numeric { values, validity } if validity.is_valid(idx) => Some(values[idx]),
            _ => None,
        }
    }

    /// Returns valid numeric values (missing excluded), or `None` if
    /// not a numeric column.
    pub fn valid_numeric_values(&self) -> Option<Vec<f64>> {
        match self {
            Self::Numeric { values, validity } => {
                Some(validity.valid_indices().map(|i| values[i]).collect())
            }
            _ => None,
        }
    }

    /// Returns the string label at `idx` for categorical and text
    /// columns, or `None` if missing or numeric.
    pub fn label_at(&self, idx: usize) -> Option<&str> {
        match self {
            Self::Categorical {
                dictionary,
                indices,
                validity,
            } if validity.is_valid(idx) => {
                dictionary.get(indices[idx] as usize).map(|s| s.as_str())
            }
            Self::Text { values, validity } if validity.is_valid(idx) => {
                Some(values[idx].as_str())
            }
            _ => None,
        }
    }

    /// Renders the value at `idx` as display text; missing values
    /// render as `None`.
    pub fn display_at(&self, idx: usize) -> Option<String> {
        match self {
            Self::Numeric { .. } => self.numeric_at(idx).map(|v| {
                if v == v.trunc() && v.abs() < 1e15 {
                    format!("{}", v as i64)
                } else {
                    format!("{v}")
                }
            }),
            _ => self.label_at(idx).map(|s| s.to_string()),
        }
    }

    /// Counts distinct valid values.
    ///
    /// Numeric values are distinguished by bit pattern, so `-0.0` and
    /// `0.0` count separately and `NaN`s collapse per payload.
    pub fn distinct_count(&self) -> usize {
        match self {
            Self::Numeric { values, validity } => {
                let mut seen: HashSet<u64> = HashSet::new();
                for i in validity.valid_indices() {
                    seen.insert(values[i].to_bits());
                }
                seen.len()
            }
            Self::Categorical {
                indices, validity, ..
            } => {
                let mut seen: HashSet<u32> = HashSet::new();
                for i in validity.valid_indices() {
                    seen.insert(indices[i]);
                }
                seen.len()
            }
            Self::Text { values, validity } => {
                let mut seen: HashSet<&str> = HashSet::new();
                for i in validity.valid_indices() {
                    seen.insert(values[i].as_str());
                }
                seen.len()
            }
        }
    }

    /// Returns a copy of this column keeping only the rows where
    /// `keep` is `true`.
    pub(crate) fn filter_rows(&self, keep: &[bool]) -> Column {
        match self {
            Self::Numeric { values, validity } => {
                let mut out = Vec::new();
                let mut bm = ValidityBitmap::empty();
                for (i, &k) in keep.iter().enumerate() {
                    if k {
                        out.push(values[i]);
                        bm.push(validity.is_valid(i));
                    }
                }
                Self::Numeric {
                    values: out,
                    validity: bm,
                }
            }
            Self::Categorical {
                dictionary,
                indices,
                validity,
            } => {
                let mut out = Vec::new();
                let mut bm = ValidityBitmap::empty();
                for (i, &k) in keep.iter().enumerate() {
                    if k {
                        out.push(indices[i]);
                        bm.push(validity.is_valid(i));
                    }
                }
                Self::Categorical {
                    dictionary: dictionary.clone(),
                    indices: out,
                    validity: bm,
                }
            }
            Self::Text { values, validity } => {
                let mut out = Vec::new();
                let mut bm = ValidityBitmap::empty();
                for (i, &k) in keep.iter().enumerate() {
                    if k {
                        out.push(values[i].clone());
                        bm.push(validity.is_valid(i));
                    }
                }
                Self::Text {
                    values: out,
                    validity: bm,
                }
            }
        }
    }
}

// ── DataFrame ─────────────────────────────────────────────────────────

/// Column-major tabular data structure.
///
/// Stores named columns of typed data; all columns share the same row
/// count. Beyond plain storage it provides the row-alignment helpers
/// the analysis layers are built on: complete-case pairing, grouping a
/// numeric column by a label column, and cross tabulation.
#[derive(Debug, Clone)]
pub struct DataFrame {
    names: Vec<String>,
    columns: Vec<Column>,
    row_count: usize,
}

impl DataFrame {
    /// Creates an empty DataFrame with no columns or rows.
    pub fn new() -> Self {
        Self {
            names: Vec::new(),
            columns: Vec::new(),
            row_count: 0,
        }
    }

    /// Adds a named column.
    ///
    /// Returns an error if the column length doesn't match the existing
    /// row count (unless this is the first column).
    pub fn add_column(&mut self, name: String, column: Column) -> Result<(), AnalysisError> {
        let col_len = column.len();
        if self.columns.is_empty() {
            self.row_count = col_len;
        } else if col_len != self.row_count {
            return Err(AnalysisError::DimensionMismatch {
                expected: self.row_count,
                actual: col_len,
            });
        }
        self.names.push(name);
        self.columns.push(column);
        Ok(())
    }

    /// Returns the number of rows.
    #[inline]
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Returns the number of columns.
    #[inline]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Returns `true` if the DataFrame has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Returns column names in dataset order.
    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    /// Returns a reference to the column at `index`.
    pub fn column(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    /// Returns a reference to the column with the given `name`.
    pub fn column_by_name(&self, name: &str) -> Option<&Column> {
        self.column_index(name).map(|i| &self.columns[i])
    }

    /// Returns the index of the column with the given `name`.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Returns an iterator over (name, column) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.names.iter().map(|s| s.as_str()).zip(self.columns.iter())
    }

    /// Returns the total number of missing values across all columns.
    pub fn total_null_count(&self) -> usize {
        self.columns.iter().map(|c| c.null_count()).sum()
    }

    /// Looks up a column by name or fails with `ColumnNotFound`.
    pub fn require_column(&self, name: &str) -> Result<&Column, AnalysisError> {
        self.column_by_name(name)
            .ok_or_else(|| AnalysisError::ColumnNotFound {
                name: name.to_string(),
            })
    }

    /// Returns the valid values of a numeric column by name.
    pub fn numeric_values(&self, name: &str) -> Result<Vec<f64>, AnalysisError> {
        let col = self.require_column(name)?;
        col.valid_numeric_values()
            .ok_or_else(|| AnalysisError::WrongRole {
                column: name.to_string(),
                expected: "numeric".to_string(),
            })
    }

    /// Returns values of two numeric columns restricted to rows valid
    /// in both, order preserved.
    pub fn paired_numeric(&self, a: &str, b: &str) -> Result<(Vec<f64>, Vec<f64>), AnalysisError> {
        let col_a = self.require_column(a)?;
        let col_b = self.require_column(b)?;
        if !col_a.is_numeric() {
            return Err(AnalysisError::WrongRole {
                column: a.to_string(),
                expected: "numeric".to_string(),
            });
        }
        if !col_b.is_numeric() {
            return Err(AnalysisError::WrongRole {
                column: b.to_string(),
                expected: "numeric".to_string(),
            });
        }
        let mut va = Vec::new();
        let mut vb = Vec::new();
        for i in 0..self.row_count {
            if let (Some(x), Some(y)) = (col_a.numeric_at(i), col_b.numeric_at(i)) {
                va.push(x);
                vb.push(y);
            }
        }
        Ok((va, vb))
    }

    /// Groups a numeric column's values by the levels of a label
    /// column. Only rows valid in both columns contribute. Levels are
    /// returned in first-seen row order; numeric label columns use the
    /// rendered value as the level name.
    pub fn groups_by(
        &self,
        label: &str,
        numeric: &str,
    ) -> Result<Vec<(String, Vec<f64>)>, AnalysisError> {
        let label_col = self.require_column(label)?;
        let num_col = self.require_column(numeric)?;
        if !num_col.is_numeric() {
            return Err(AnalysisError::WrongRole {
                column: numeric.to_string(),
                expected: "numeric".to_string(),
            });
        }
        let mut order: Vec<String> = Vec::new();
        let mut groups: Vec<Vec<f64>> = Vec::new();
        for i in 0..self.row_count {
            let (Some(level), Some(value)) = (label_col.display_at(i), num_col.numeric_at(i))
            else {
                continue;
            };
            match order.iter().position(|l| *l == level) {
                Some(g) => groups[g].push(value),
                None => {
                    order.push(level);
                    groups.push(vec![value]);
                }
            }
        }
        Ok(order.into_iter().zip(groups).collect())
    }

    /// Frequency table of a label column: (level, count) in
    /// descending count order, ties broken by first appearance.
    pub fn level_frequencies(&self, name: &str) -> Result<Vec<(String, usize)>, AnalysisError> {
        let col = self.require_column(name)?;
        let mut order: Vec<String> = Vec::new();
        let mut counts: Vec<usize> = Vec::new();
        for i in 0..self.row_count {
            let Some(level) = col.display_at(i) else {
                continue;
            };
            match order.iter().position(|l| *l == level) {
                Some(g) => counts[g] += 1,
                None => {
                    order.push(level);
                    counts.push(1);
                }
            }
        }
        let mut table: Vec<(String, usize)> = order.into_iter().zip(counts).collect();
        table.sort_by(|a, b| b.1.cmp(&a.1));
        Ok(table)
    }

    /// Builds a contingency table over rows valid in both label
    /// columns. Returns row levels, column levels, and the flat
    /// row-major table of observed counts.
    pub fn crosstab(
        &self,
        a: &str,
        b: &str,
    ) -> Result<(Vec<String>, Vec<String>, Vec<f64>), AnalysisError> {
        let col_a = self.require_column(a)?;
        let col_b = self.require_column(b)?;
        let mut row_levels: Vec<String> = Vec::new();
        let mut col_levels: Vec<String> = Vec::new();
        let mut cells: Vec<(usize, usize)> = Vec::new();
        for i in 0..self.row_count {
            let (Some(la), Some(lb)) = (col_a.display_at(i), col_b.display_at(i)) else {
                continue;
            };
            let ra = match row_levels.iter().position(|l| *l == la) {
                Some(r) => r,
                None => {
                    row_levels.push(la);
                    row_levels.len() - 1
                }
            };
            let cb = match col_levels.iter().position(|l| *l == lb) {
                Some(c) => c,
                None => {
                    col_levels.push(lb);
                    col_levels.len() - 1
                }
            };
            cells.push((ra, cb));
        }
        let n_cols = col_levels.len();
        let mut table = vec![0.0; row_levels.len() * n_cols];
        for (r, c) in cells {
            table[r * n_cols + c] += 1.0;
        }
        Ok((row_levels, col_levels, table))
    }

    /// Restricts a set of numeric columns to their complete cases:
    /// rows valid in every named column. Returns the kept row indices
    /// and the column-major values aligned to them.
    pub fn complete_rows(
        &self,
        names: &[&str],
    ) -> Result<(Vec<usize>, Vec<Vec<f64>>), AnalysisError> {
        let mut cols = Vec::with_capacity(names.len());
        for name in names {
            let col = self.require_column(name)?;
            if !col.is_numeric() {
                return Err(AnalysisError::WrongRole {
                    column: (*name).to_string(),
                    expected: "numeric".to_string(),
                });
            }
            cols.push(col);
        }
        let rows: Vec<usize> = (0..self.row_count)
            .filter(|&i| cols.iter().all(|c| c.is_valid(i)))
            .collect();
        let values = cols
            .iter()
            .map(|c| rows.iter().filter_map(|&i| c.numeric_at(i)).collect())
            .collect();
        Ok((rows, values))
    }

    /// Drops columns whose values are all missing, then rows whose
    /// remaining values are all missing. Mirrors the cleanup a loader
    /// applies before classification.
    pub fn prune_empty(&self) -> DataFrame {
        let mut pruned = DataFrame::new();
        for (name, col) in self.iter() {
            if col.valid_count() > 0 {
                // lengths are uniform, add_column cannot fail here
                let _ = pruned.add_column(name.to_string(), col.clone());
            }
        }
        if pruned.is_empty() {
            return pruned;
        }
        let keep: Vec<bool> = (0..pruned.row_count)
            .map(|i| pruned.columns.iter().any(|c| c.is_valid(i)))
            .collect();
        if keep.iter().all(|&k| k) {
            return pruned;
        }
        let mut out = DataFrame::new();
        for (name, col) in pruned.iter() {
            let _ = out.add_column(name.to_string(), col.filter_rows(&keep));
        }
        out
    }
}

impl Default for DataFrame {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────
