//! Delimited-text loader for locale-encoded survey exports.
//!
//! [`DatasetLoader`] parses a CSV-style file into a [`DataFrame`]:
//!
//! 1. decode raw bytes (GBK by default, retrying as UTF-8 on decode
//!    errors) and strip any BOM,
//! 2. parse records with a small RFC-4180 state machine (quoted
//!    fields, escaped quotes, CRLF),
//! 3. take the first record as the header and skip the annotation
//!    record that instrument exports place right below it,
//! 4. map NA markers to missing, infer a type per column, and drop
//!    all-missing columns and rows.
//!
//! # Example
//!
//! ```
//! use statlab::loader::DatasetLoader;
//!
//! let csv = "age,group\nyears,arm\n34,a\n41,b\n";
//! let df = DatasetLoader::new().load_str(csv).unwrap();
//! assert_eq!(df.row_count(), 2); // annotation row skipped
//! ```

use std::collections::HashMap;
use std::path::Path;

use encoding_rs::{Encoding, GBK, UTF_8};
use log::{info, warn};

use crate::dataframe::{Column, DataFrame, DataType, ValidityBitmap};
use crate::error::AnalysisError;

/// Values treated as missing, matching the survey-export convention.
pub const DEFAULT_NULL_MARKERS: &[&str] = &["", "nan", "NaN"];

/// Distinct-ratio bound below which a string column is dictionary-encoded.
const CATEGORICAL_THRESHOLD: f64 = 0.5;

/// Dictionary size bound for categorical encoding.
const MAX_CATEGORICAL_UNIQUE: usize = 1000;

/// Builder-style loader for delimited text files.
#[derive(Debug, Clone)]
pub struct DatasetLoader {
    delimiter: u8,
    annotation_rows: usize,
    encoding: &'static Encoding,
    null_markers: Vec<String>,
}

impl DatasetLoader {
    /// Creates a loader with default settings: comma delimiter, one
    /// annotation row below the header, GBK input encoding, standard
    /// NA markers.
    pub fn new() -> Self {
        Self {
            delimiter: b',',
            annotation_rows: 1,
            encoding: GBK,
            null_markers: DEFAULT_NULL_MARKERS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
        }
    }

    /// Sets the field delimiter (default: comma).
    pub fn delimiter(mut self, delim: u8) -> Self {
        self.delimiter = delim;
        self
    }

    /// Sets how many annotation records follow the header (default: 1).
    pub fn annotation_rows(mut self, rows: usize) -> Self {
        self.annotation_rows = rows;
        self
    }

    /// Sets the input encoding (default: GBK).
    pub fn encoding(mut self, encoding: &'static Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Sets custom NA markers (replaces defaults).
    pub fn null_markers(mut self, markers: Vec<String>) -> Self {
        self.null_markers = markers;
        self
    }

    /// Loads a delimited file from disk.
    pub fn load_path(&self, path: impl AsRef<Path>) -> Result<DataFrame, AnalysisError> {
        let bytes = std::fs::read(path.as_ref())?;
        info!(
            "loading {} ({} bytes, {})",
            path.as_ref().display(),
            bytes.len(),
            self.encoding.name()
        );
        self.load_bytes(&bytes)
    }

    /// Loads from raw bytes, applying encoding detection.
    pub fn load_bytes(&self, bytes: &[u8]) -> Result<DataFrame, AnalysisError> {
        let (decoded, _, had_errors) = self.encoding.decode(bytes);
        let text = if had_errors && self.encoding != UTF_8 {
            warn!(
                "{} decoding produced replacement characters, retrying as UTF-8",
                self.encoding.name()
            );
            let (utf8, _, utf8_errors) = UTF_8.decode(bytes);
            if utf8_errors {
                decoded
            } else {
                utf8
            }
        } else {
            decoded
        };
        self.load_str(&text)
    }

    /// Loads from already-decoded text.
    pub fn load_str(&self, input: &str) -> Result<DataFrame, AnalysisError> {
        let input = input.strip_prefix('\u{feff}').unwrap_or(input);

        let records = self.parse_records(input)?;
        if records.is_empty() {
            return Err(AnalysisError::CsvParse {
                line: 1,
                message: "empty input".to_string(),
            });
        }

        let header: Vec<String> = records[0].iter().map(|f| f.trim().to_string()).collect();
        let skip = 1 + self.annotation_rows.min(records.len() - 1);
        let data_records = &records[skip..];
        if data_records.is_empty() {
            return Err(AnalysisError::CsvParse {
                line: records.len(),
                message: "no data rows after header and annotation rows".to_string(),
            });
        }

        let n_cols = header.len();
        let mut raw_columns: Vec<Vec<String>> =
            vec![Vec::with_capacity(data_records.len()); n_cols];
        for (rec_idx, record) in data_records.iter().enumerate() {
            if record.len() > n_cols {
                return Err(AnalysisError::CsvParse {
                    line: skip + rec_idx + 1,
                    message: format!("expected {n_cols} fields, got {}", record.len()),
                });
            }
            for (col_idx, raw) in raw_columns.iter_mut().enumerate() {
                // short records are padded with missing
                raw.push(record.get(col_idx).cloned().unwrap_or_default());
            }
        }

        let mut df = DataFrame::new();
        for (name, raw_col) in header.into_iter().zip(raw_columns.iter()) {
            let col = self.build_column(raw_col);
            df.add_column(name, col)?;
        }

        let pruned = df.prune_empty();
        info!(
            "parsed {} rows x {} columns ({} dropped as all-missing)",
            pruned.row_count(),
            pruned.column_count(),
            df.column_count() - pruned.column_count()
        );
        Ok(pruned)
    }

    // ── Internal parsing ─────────────────────────────────────────

    /// Parses raw text into records of string fields.
    fn parse_records(&self, input: &str) -> Result<Vec<Vec<String>>, AnalysisError> {
        let delim = self.delimiter as char;
        let mut rows: Vec<Vec<String>> = Vec::new();
        let mut current_row: Vec<String> = Vec::new();
        let mut current_field = String::new();
        let mut in_quotes = false;
        let mut chars = input.chars().peekable();

        while let Some(c) = chars.next() {
            if in_quotes {
                if c == '"' {
                    if chars.peek() == Some(&'"') {
                        chars.next();
                        current_field.push('"');
                    } else {
                        in_quotes = false;
                    }
                } else {
                    current_field.push(c);
                }
            } else if c == '"' && current_field.is_empty() {
                in_quotes = true;
            } else if c == delim {
                current_row.push(std::mem::take(&mut current_field));
            } else if c == '\n' {
                if current_field.ends_with('\r') {
                    current_field.truncate(current_field.len() - 1);
                }
                current_row.push(std::mem::take(&mut current_field));
                rows.push(std::mem::take(&mut current_row));
            } else if c == '\r' {
                // standalone \r (old Mac line ending)
                if chars.peek() != Some(&'\n') {
                    current_row.push(std::mem::take(&mut current_field));
                    rows.push(std::mem::take(&mut current_row));
                }
            } else {
                current_field.push(c);
            }
        }

        if !current_field.is_empty() || !current_row.is_empty() {
            current_row.push(current_field);
            rows.push(current_row);
        }

        while rows.last().is_some_and(|r| r.iter().all(|f| f.is_empty())) {
            rows.pop();
        }

        Ok(rows)
    }

    /// Checks if a trimmed value is an NA marker.
    fn is_null(&self, value: &str) -> bool {
        let trimmed = value.trim();
        self.null_markers.iter().any(|m| m == trimmed)
    }

    /// Infers the column type and builds a typed Column.
    fn build_column(&self, raw_values: &[String]) -> Column {
        let trimmed: Vec<&str> = raw_values.iter().map(|s| s.trim()).collect();
        let null_flags: Vec<bool> = trimmed.iter().map(|s| self.is_null(s)).collect();

        if null_flags.iter().all(|&is_null| is_null) {
            // all missing; pruned later
            let mut validity = ValidityBitmap::empty();
            for _ in &trimmed {
                validity.push(false);
            }
            return Column::numeric(vec![0.0; trimmed.len()], validity);
        }

        match self.infer_type(&trimmed, &null_flags) {
            DataType::Numeric => build_numeric_column(&trimmed, &null_flags),
            DataType::Categorical => build_categorical_column(&trimmed, &null_flags),
            DataType::Text => build_text_column(&trimmed, &null_flags),
        }
    }

    /// Determines the most specific type that fits all non-missing values.
    fn infer_type(&self, values: &[&str], null_flags: &[bool]) -> DataType {
        let non_null: Vec<&str> = values
            .iter()
            .zip(null_flags.iter())
            .filter(|(_, &is_null)| !is_null)
            .map(|(&v, _)| v)
            .collect();

        if non_null.iter().all(|s| s.parse::<f64>().is_ok()) {
            return DataType::Numeric;
        }

        let mut unique = std::collections::HashSet::new();
        for &v in &non_null {
            unique.insert(v);
        }
        let ratio = unique.len() as f64 / non_null.len() as f64;
        if ratio < CATEGORICAL_THRESHOLD && unique.len() <= MAX_CATEGORICAL_UNIQUE {
            DataType::Categorical
        } else {
            DataType::Text
        }
    }
}

impl Default for DatasetLoader {
    fn default() -> Self {
        Self::new()
    }
}

// ── Column builders ───────────────────────────────────────────────────

fn build_numeric_column(values: &[&str], null_flags: &[bool]) -> Column {
    let mut nums = Vec::with_capacity(values.len());
    let mut validity = ValidityBitmap::empty();
    for (i, &val) in values.iter().enumerate() {
        if null_flags[i] {
            nums.push(0.0);
            validity.push(false);
        } else {
            nums.push(val.parse::<f64>().unwrap_or(0.0));
            validity.push(true);
        }
    }
    Column::numeric(nums, validity)
}

fn build_categorical_column(values: &[&str], null_flags: &[bool]) -> Column {
    let mut dict_map: HashMap<String, u32> = HashMap::new();
    let mut dictionary: Vec<String> = Vec::new();
    let mut indices = Vec::with_capacity(values.len());
    let mut validity = ValidityBitmap::empty();
    for (i, &val) in values.iter().enumerate() {
        if null_flags[i] {
            indices.push(0);
            validity.push(false);
        } else {
            let idx = if let Some(&existing) = dict_map.get(val) {
                existing
            } else {
                let idx = dictionary.len() as u32;
                dictionary.push(val.to_string());
                dict_map.insert(val.to_string(), idx);
                idx
            };
            indices.push(idx);
            validity.push(true);
        }
    }
    Column::categorical(dictionary, indices, validity)
}

fn build_text_column(values: &[&str], null_flags: &[bool]) -> Column {
    let mut texts = Vec::with_capacity(values.len());
    let mut validity = ValidityBitmap::empty();
    for (i, &val) in values.iter().enumerate() {
        if null_flags[i] {
            texts.push(String::new());
            validity.push(false);
        } else {
            texts.push(val.to_string());
            validity.push(true);
        }
    }
    Column::text(texts, validity)
}

// ── Tests ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn loader() -> DatasetLoader {
        DatasetLoader::new()
    }

    // ── Record parsing ───────────────────────────────────────────

    #[test]
    fn skips_annotation_row() {
        let csv = "age,score\nyears,points\n30,85.5\n42,91.0\n";
        let df = loader().load_str(csv).unwrap();
        assert_eq!(df.row_count(), 2);
        assert_eq!(df.numeric_values("age").unwrap(), vec![30.0, 42.0]);
    }

    #[test]
    fn annotation_rows_configurable() {
        let csv = "x\nunit\nnote\n1\n2\n";
        let df = loader().annotation_rows(2).load_str(csv).unwrap();
        assert_eq!(df.numeric_values("x").unwrap(), vec![1.0, 2.0]);
    }

    #[test]
    fn quoted_fields_and_crlf() {
        let csv = "name,note\nlabel,remark\r\n\"Smith, J\",\"said \"\"hi\"\"\"\r\nJones,ok\r\n";
        let df = loader().load_str(csv).unwrap();
        let col = df.column_by_name("name").unwrap();
        assert_eq!(col.label_at(0), Some("Smith, J"));
        let note = df.column_by_name("note").unwrap();
        assert_eq!(note.label_at(0), Some("said \"hi\""));
    }

    #[test]
    fn empty_input_is_parse_error() {
        let err = loader().load_str("").unwrap_err();
        assert!(matches!(err, AnalysisError::CsvParse { .. }));
    }

    #[test]
    fn header_only_is_parse_error() {
        let err = loader().load_str("a,b\nunit,unit\n").unwrap_err();
        assert!(matches!(err, AnalysisError::CsvParse { .. }));
    }

    #[test]
    fn long_record_is_parse_error() {
        let csv = "a,b\nu,u\n1,2,3\n";
        let err = loader().load_str(csv).unwrap_err();
        assert!(matches!(err, AnalysisError::CsvParse { line: 3, .. }));
    }

    #[test]
    fn short_record_padded_with_missing() {
        let csv = "a,b\nu,u\n1,2\n3\n";
        let df = loader().load_str(csv).unwrap();
        assert_eq!(df.row_count(), 2);
        let b = df.column_by_name("b").unwrap();
        assert_eq!(b.null_count(), 1);
    }

    // ── Missing values and type inference ────────────────────────

    #[test]
    fn na_markers_become_missing() {
        let csv = "x,g\nu,u\n1.5,a\nnan,b\n,a\nNaN,b\n2.5,a\n";
        let df = loader().load_str(csv).unwrap();
        let x = df.column_by_name("x").unwrap();
        assert_eq!(x.null_count(), 3);
        assert_eq!(x.valid_numeric_values().unwrap(), vec![1.5, 2.5]);
    }

    #[test]
    fn mixed_column_is_not_numeric() {
        let csv = "v\nu\n1\ntwo\n3\n";
        let df = loader().load_str(csv).unwrap();
        assert!(!df.column_by_name("v").unwrap().is_numeric());
    }

    #[test]
    fn low_cardinality_strings_are_categorical() {
        let mut csv = String::from("g\nu\n");
        for i in 0..20 {
            csv.push_str(if i % 2 == 0 { "a\n" } else { "b\n" });
        }
        let df = loader().load_str(&csv).unwrap();
        assert_eq!(
            df.column_by_name("g").unwrap().data_type(),
            DataType::Categorical
        );
    }

    #[test]
    fn high_cardinality_strings_are_text() {
        let mut csv = String::from("id\nu\n");
        for i in 0..20 {
            csv.push_str(&format!("subj_{i}\n"));
        }
        let df = loader().load_str(&csv).unwrap();
        assert_eq!(df.column_by_name("id").unwrap().data_type(), DataType::Text);
    }

    #[test]
    fn all_missing_column_is_dropped() {
        let csv = "x,empty\nu,u\n1,\n2,nan\n";
        let df = loader().load_str(csv).unwrap();
        assert_eq!(df.column_count(), 1);
        assert!(df.column_by_name("empty").is_none());
    }

    #[test]
    fn all_missing_row_is_dropped() {
        let csv = "x,y\nu,u\n1,2\n,\n3,4\n";
        let df = loader().load_str(csv).unwrap();
        assert_eq!(df.row_count(), 2);
    }

    // ── Encoding ─────────────────────────────────────────────────

    #[test]
    fn decodes_gbk_bytes() {
        // "组" (group) encoded as GBK is 0xD7 0xE9
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"x,\xD7\xE9\nu,u\n1,a\n2,b\n");
        let df = loader().load_bytes(&bytes).unwrap();
        assert!(df.column_by_name("组").is_some());
    }

    #[test]
    fn utf8_retry_when_gbk_fails() {
        // the euro sign's UTF-8 bytes are not a complete GBK sequence
        // when followed by a newline, which forces the UTF-8 retry
        let text = "x,cost\u{20ac}\nu,u\n1,a\n2,b\n";
        let df = loader().load_bytes(text.as_bytes()).unwrap();
        assert!(df.column_by_name("cost\u{20ac}").is_some());
    }

    #[test]
    fn bom_is_stripped() {
        let csv = "\u{feff}x\nu\n1\n2\n";
        let df = loader().load_str(csv).unwrap();
        assert!(df.column_by_name("x").is_some());
    }
}
