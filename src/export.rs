//! Workbook export of the loaded dataset and its analysis summaries.
//!
//! The primary output is a three-sheet Excel workbook: descriptive
//! statistics, the correlation matrix, and the raw data. When the
//! workbook cannot be written the export degrades to a set of
//! UTF-8-with-BOM CSV files next to the requested path, one per sheet,
//! so spreadsheet software opens them with the right encoding.

use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};
use rust_xlsxwriter::{Format, Workbook, XlsxError};

use crate::correlation::{self, CorrelationReport};
use crate::descriptive::{self, ColumnSummary, DescriptiveTable};
use crate::error::AnalysisError;
use crate::session::Dataset;

/// Byte-order mark prefix for the CSV fallback files.
const UTF8_BOM: &str = "\u{feff}";

/// Where the export actually landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    /// The workbook was written at the requested path.
    Workbook { path: PathBuf },
    /// Workbook writing failed; these CSV files were written instead.
    CsvFallback { paths: Vec<PathBuf> },
}

/// Exports the dataset to an Excel workbook at `path`, falling back to
/// per-sheet CSV files when the workbook cannot be produced.
///
/// The correlation sheet is omitted when the dataset has fewer than
/// two continuous columns.
pub fn export(dataset: &Dataset, path: impl AsRef<Path>) -> Result<ExportOutcome, AnalysisError> {
    let path = path.as_ref();
    let stats = descriptive::describe_all(dataset)?;
    let corr = correlation::correlation_report(dataset).ok();

    match write_workbook(dataset, &stats, corr.as_ref(), path) {
        Ok(()) => {
            info!("exported workbook to {}", path.display());
            Ok(ExportOutcome::Workbook {
                path: path.to_path_buf(),
            })
        }
        Err(e) => {
            warn!(
                "workbook export to {} failed ({e}), writing CSV fallback",
                path.display()
            );
            let paths = write_csv_fallback(dataset, &stats, corr.as_ref(), path)?;
            Ok(ExportOutcome::CsvFallback { paths })
        }
    }
}

// ── Workbook ──────────────────────────────────────────────────────────

const STATS_HEADER: [&str; 12] = [
    "Column", "Type", "Count", "Missing", "Mean", "Std Dev", "Min", "Q1", "Median", "Q3", "Max",
    "Distinct",
];

fn write_workbook(
    dataset: &Dataset,
    stats: &DescriptiveTable,
    corr: Option<&CorrelationReport>,
    path: &Path,
) -> Result<(), XlsxError> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();

    // ── Descriptive statistics ──────────────────────────────────
    let sheet = workbook.add_worksheet();
    sheet.set_name("Descriptive Statistics")?;
    for (col, title) in STATS_HEADER.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *title, &header)?;
    }
    for (row, (name, summary)) in stats.entries.iter().enumerate() {
        let row = row as u32 + 1;
        sheet.write_string(row, 0, name)?;
        match summary {
            ColumnSummary::Numeric(s) => {
                sheet.write_string(row, 1, "continuous/numeric")?;
                sheet.write_number(row, 2, s.count as f64)?;
                sheet.write_number(row, 3, s.missing as f64)?;
                for (col, value) in [s.mean, s.std_dev, s.min, s.q1, s.median, s.q3, s.max]
                    .into_iter()
                    .enumerate()
                {
                    sheet.write_number(row, col as u16 + 4, value)?;
                }
            }
            ColumnSummary::Categorical(s) => {
                sheet.write_string(row, 1, "categorical")?;
                sheet.write_number(row, 2, s.count as f64)?;
                sheet.write_number(row, 3, s.missing as f64)?;
                sheet.write_number(row, 11, s.distinct as f64)?;
            }
        }
    }

    // ── Correlation matrix ──────────────────────────────────────
    if let Some(report) = corr {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Correlation Matrix")?;
        for (i, name) in report.columns.iter().enumerate() {
            sheet.write_string_with_format(0, i as u16 + 1, name, &header)?;
            sheet.write_string_with_format(i as u32 + 1, 0, name, &header)?;
        }
        for (i, row) in report.values.iter().enumerate() {
            for (j, &r) in row.iter().enumerate() {
                sheet.write_number(i as u32 + 1, j as u16 + 1, r)?;
            }
        }
    }

    // ── Raw data ────────────────────────────────────────────────
    let sheet = workbook.add_worksheet();
    sheet.set_name("Data")?;
    let frame = dataset.frame();
    for (col, name) in frame.column_names().iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, name, &header)?;
    }
    for row in 0..frame.row_count() {
        for (col_idx, (_, column)) in frame.iter().enumerate() {
            let cell_row = row as u32 + 1;
            let cell_col = col_idx as u16;
            if !column.is_valid(row) {
                continue;
            }
            if let Some(v) = column.numeric_at(row) {
                sheet.write_number(cell_row, cell_col, v)?;
            } else if let Some(s) = column.display_at(row) {
                sheet.write_string(cell_row, cell_col, &s)?;
            }
        }
    }

    workbook.save(path)?;
    Ok(())
}

// ── CSV fallback ──────────────────────────────────────────────────────

fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn fallback_path(path: &Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "export".to_string());
    let file = format!("{stem}_{suffix}.csv");
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.join(file),
        _ => PathBuf::from(file),
    }
}

fn write_csv_fallback(
    dataset: &Dataset,
    stats: &DescriptiveTable,
    corr: Option<&CorrelationReport>,
    path: &Path,
) -> Result<Vec<PathBuf>, AnalysisError> {
    let mut paths = Vec::with_capacity(3);

    // ── Statistics ──────────────────────────────────────────────
    let mut out = String::from(UTF8_BOM);
    out.push_str(&STATS_HEADER.join(","));
    out.push('\n');
    for (name, summary) in &stats.entries {
        let line = match summary {
            ColumnSummary::Numeric(s) => format!(
                "{},continuous/numeric,{},{},{},{},{},{},{},{},{},",
                csv_field(name),
                s.count,
                s.missing,
                s.mean,
                s.std_dev,
                s.min,
                s.q1,
                s.median,
                s.q3,
                s.max
            ),
            ColumnSummary::Categorical(s) => format!(
                "{},categorical,{},{},,,,,,,,{}",
                csv_field(name),
                s.count,
                s.missing,
                s.distinct
            ),
        };
        out.push_str(&line);
        out.push('\n');
    }
    let stats_path = fallback_path(path, "stats");
    fs::write(&stats_path, out)?;
    paths.push(stats_path);

    // ── Correlation matrix ──────────────────────────────────────
    if let Some(report) = corr {
        let mut out = String::from(UTF8_BOM);
        out.push(',');
        let names: Vec<String> = report.columns.iter().map(|c| csv_field(c)).collect();
        out.push_str(&names.join(","));
        out.push('\n');
        for (name, row) in report.columns.iter().zip(&report.values) {
            out.push_str(&csv_field(name));
            for r in row {
                out.push(',');
                out.push_str(&r.to_string());
            }
            out.push('\n');
        }
        let corr_path = fallback_path(path, "corr");
        fs::write(&corr_path, out)?;
        paths.push(corr_path);
    }

    // ── Raw data ────────────────────────────────────────────────
    let frame = dataset.frame();
    let mut out = String::from(UTF8_BOM);
    let names: Vec<String> = frame
        .column_names()
        .iter()
        .map(|c| csv_field(c))
        .collect();
    out.push_str(&names.join(","));
    out.push('\n');
    for row in 0..frame.row_count() {
        let cells: Vec<String> = frame
            .iter()
            .map(|(_, column)| {
                column
                    .display_at(row)
                    .map(|s| csv_field(&s))
                    .unwrap_or_default()
            })
            .collect();
        out.push_str(&cells.join(","));
        out.push('\n');
    }
    let data_path = fallback_path(path, "data");
    fs::write(&data_path, out)?;
    paths.push(data_path);

    Ok(paths)
}

// ── Tests ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::AnalysisSession;

    fn fixture() -> Dataset {
        let csv = "\
score,load,kind
unit,,
1.5,10.0,x
2.5,11.0,y
3.5,12.0,x
4.5,13.0,y
5.5,14.0,x
6.5,15.0,y
7.5,16.0,x
8.5,17.0,y
9.5,18.0,x
10.5,19.0,y
11.5,20.0,x";
        let mut session = AnalysisSession::new();
        session.load_str(csv).unwrap();
        session.dataset().unwrap().clone()
    }

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("statlab-export-{}-{name}", std::process::id()))
    }

    #[test]
    fn workbook_export_writes_file() {
        let ds = fixture();
        let path = temp_path("full.xlsx");
        let outcome = export(&ds, &path).unwrap();
        assert_eq!(outcome, ExportOutcome::Workbook { path: path.clone() });
        let meta = fs::metadata(&path).unwrap();
        assert!(meta.len() > 0);
        fs::remove_file(&path).ok();
    }

    #[test]
    fn workbook_sheets_carry_expected_layout() {
        use calamine::{open_workbook, Reader, Xlsx};

        let ds = fixture();
        let path = temp_path("layout.xlsx");
        export(&ds, &path).unwrap();

        let mut workbook: Xlsx<_> = open_workbook(&path).unwrap();
        assert_eq!(
            workbook.sheet_names().to_vec(),
            vec!["Descriptive Statistics", "Correlation Matrix", "Data"]
        );

        let stats = workbook.worksheet_range("Descriptive Statistics").unwrap();
        let header: Vec<String> = stats
            .rows()
            .next()
            .unwrap()
            .iter()
            .map(|c| c.to_string())
            .collect();
        assert_eq!(header, STATS_HEADER);
        let score: Vec<String> = stats
            .rows()
            .nth(1)
            .unwrap()
            .iter()
            .map(|c| c.to_string())
            .collect();
        assert_eq!(&score[..4], ["score", "continuous/numeric", "11", "0"]);
        // mean of 1.5..=11.5
        assert_eq!(score[4], "6.5");

        let corr = workbook.worksheet_range("Correlation Matrix").unwrap();
        assert_eq!(corr.get_value((0, 1)).unwrap().to_string(), "score");
        assert_eq!(corr.get_value((2, 0)).unwrap().to_string(), "load");
        let diag: f64 = corr.get_value((1, 1)).unwrap().to_string().parse().unwrap();
        assert!((diag - 1.0).abs() < 1e-9);

        let data = workbook.worksheet_range("Data").unwrap();
        // 1 header + 11 rows
        assert_eq!(data.height(), 12);
        let first: Vec<String> = data
            .rows()
            .next()
            .unwrap()
            .iter()
            .map(|c| c.to_string())
            .collect();
        assert_eq!(first, ["score", "load", "kind"]);
        assert_eq!(data.get_value((1, 0)).unwrap().to_string(), "1.5");
        assert_eq!(data.get_value((1, 2)).unwrap().to_string(), "x");

        fs::remove_file(&path).ok();
    }

    #[test]
    fn csv_fallback_files() {
        let ds = fixture();
        let base = temp_path("fb");
        fs::create_dir_all(&base).unwrap();
        let target = base.join("report.xlsx");
        let stats = descriptive::describe_all(&ds).unwrap();
        let corr = correlation::correlation_report(&ds).ok();
        let paths = write_csv_fallback(&ds, &stats, corr.as_ref(), &target).unwrap();
        assert_eq!(paths.len(), 3);
        assert_eq!(paths[0].file_name().unwrap(), "report_stats.csv");
        assert_eq!(paths[1].file_name().unwrap(), "report_corr.csv");
        assert_eq!(paths[2].file_name().unwrap(), "report_data.csv");

        let stats_text = fs::read_to_string(&paths[0]).unwrap();
        assert!(stats_text.starts_with(UTF8_BOM));
        assert!(stats_text
            .lines()
            .next()
            .unwrap()
            .ends_with(&STATS_HEADER.join(",")));
        assert!(stats_text.contains("score,continuous/numeric,11,0,"));
        assert!(stats_text.contains("kind,categorical,11,0,"));

        let corr_text = fs::read_to_string(&paths[1]).unwrap();
        assert!(corr_text.starts_with(UTF8_BOM));
        assert!(corr_text.lines().next().unwrap().ends_with(",score,load"));

        let data_text = fs::read_to_string(&paths[2]).unwrap();
        // 1 header + 11 data rows
        assert_eq!(data_text.lines().count(), 12);
        assert!(data_text.contains("1.5,10,x"));

        fs::remove_dir_all(&base).ok();
    }

    #[test]
    fn fallback_quotes_embedded_commas() {
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(csv_field("plain"), "plain");
    }

    #[test]
    fn fallback_paths_derive_from_stem() {
        let p = fallback_path(Path::new("/tmp/out/report.xlsx"), "stats");
        assert_eq!(p, PathBuf::from("/tmp/out/report_stats.csv"));
        let p = fallback_path(Path::new("report.xlsx"), "data");
        assert_eq!(p, PathBuf::from("report_data.csv"));
    }
}
