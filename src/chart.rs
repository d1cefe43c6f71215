//! Chart specifications as plain data.
//!
//! Nothing here draws. Each builder validates the request against the
//! loaded dataset, runs whatever numeric preparation the chart needs
//! (binning, quartiles, projections), and returns a [`ChartSpec`] for
//! an external renderer to turn into pixels. Render parameters travel
//! with each specification as [`RenderHints`].

use u_analytics::distribution as dist;
use u_numflow::stats;

use crate::classify::ColumnRole;
use crate::correlation::{self, RegressionReport};
use crate::descriptive::LevelCount;
use crate::error::AnalysisError;
use crate::reduction::{self, DendrogramSummary, ElbowCurve, KMeansConfig, Linkage};
use crate::session::Dataset;

/// Export resolution applied to every chart.
pub const DEFAULT_DPI: u32 = 300;

/// Columns shown in a pair grid at most.
pub const PAIR_GRID_MAX_COLUMNS: usize = 5;

/// Grid resolution per axis for the interpolated 3D surface.
pub const SURFACE_GRID_SIZE: usize = 25;

/// Raw observations overlaid on the surface at most; larger datasets
/// are sampled.
pub const SURFACE_POINT_CAP: usize = 50;

// ── Render hints ──────────────────────────────────────────────────────

/// Renderer parameters: figure size in inches, output resolution, and
/// whether to trim surrounding whitespace.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderHints {
    pub width: f64,
    pub height: f64,
    pub dpi: u32,
    pub tight: bool,
}

impl Default for RenderHints {
    fn default() -> Self {
        Self {
            width: 8.0,
            height: 6.0,
            dpi: DEFAULT_DPI,
            tight: true,
        }
    }
}

impl RenderHints {
    fn sized(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }
}

// ── Spec payloads ─────────────────────────────────────────────────────

/// Histogram bin strategy. Mirrors
/// `u_analytics::distribution::BinMethod` so callers never depend on
/// that crate directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BinStrategy {
    Sturges,
    Scott,
    #[default]
    FreedmanDiaconis,
}

impl BinStrategy {
    fn to_analytics(self) -> dist::BinMethod {
        match self {
            Self::Sturges => dist::BinMethod::Sturges,
            Self::Scott => dist::BinMethod::Scott,
            Self::FreedmanDiaconis => dist::BinMethod::FreedmanDiaconis,
        }
    }
}

/// One category level with its numeric sample and quartiles, for box
/// and violin plots.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupSample {
    pub level: String,
    pub values: Vec<f64>,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
}

/// Per-level histogram for overlaid distribution comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelHistogram {
    pub level: String,
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
}

/// Fitted regression line drawn over a scatter plot.
#[derive(Debug, Clone, PartialEq)]
pub struct FitLine {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
}

/// The chart payload proper; one variant per chart in the catalog.
#[derive(Debug, Clone)]
pub enum ChartData {
    Histogram {
        column: String,
        edges: Vec<f64>,
        counts: Vec<usize>,
        bin_width: f64,
    },
    QqPlot {
        column: String,
        theoretical: Vec<f64>,
        sample: Vec<f64>,
    },
    Ecdf {
        column: String,
        values: Vec<f64>,
        probabilities: Vec<f64>,
    },
    Bar {
        column: String,
        levels: Vec<LevelCount>,
    },
    Pie {
        column: String,
        levels: Vec<LevelCount>,
    },
    BoxPlot {
        value_column: String,
        label_column: String,
        groups: Vec<GroupSample>,
    },
    Violin {
        value_column: String,
        label_column: String,
        groups: Vec<GroupSample>,
    },
    LinePlot {
        x_column: String,
        y_column: String,
        x: Vec<f64>,
        y: Vec<f64>,
    },
    Scatter {
        x_column: String,
        y_column: String,
        x: Vec<f64>,
        y: Vec<f64>,
        fit: Option<FitLine>,
    },
    Scatter3d {
        columns: [String; 3],
        points: Vec<[f64; 3]>,
    },
    Surface3d {
        columns: [String; 3],
        /// Grid coordinates along the first and second columns.
        grid_x: Vec<f64>,
        grid_y: Vec<f64>,
        /// Interpolated heights, one row per `grid_y` entry. Cells with
        /// no observation nearby hold NaN so the renderer leaves a hole
        /// there.
        heights: Vec<Vec<f64>>,
        /// Overlay sample of the raw observations.
        points: Vec<[f64; 3]>,
    },
    Heatmap {
        columns: Vec<String>,
        values: Vec<Vec<f64>>,
    },
    PairGrid {
        columns: Vec<String>,
        /// Row-major complete cases across the shown columns.
        rows: Vec<Vec<f64>>,
    },
    Radar {
        label_column: String,
        columns: Vec<String>,
        levels: Vec<String>,
        /// Standardized per-level means, one row per level.
        values: Vec<Vec<f64>>,
    },
    DistributionComparison {
        value_column: String,
        label_column: String,
        histograms: Vec<LevelHistogram>,
    },
    PcaScatter {
        axis_labels: Vec<String>,
        /// Score rows, two or three columns wide.
        points: Vec<Vec<f64>>,
    },
    ClusterScatter {
        axis_labels: [String; 2],
        points: Vec<[f64; 2]>,
        assignments: Vec<usize>,
        centers: Vec<[f64; 2]>,
    },
    ElbowCurve {
        ks: Vec<usize>,
        inertias: Vec<f64>,
    },
    Dendrogram(DendrogramSummary),
}

/// A complete chart request for the renderer.
#[derive(Debug, Clone)]
pub struct ChartSpec {
    pub title: String,
    pub hints: RenderHints,
    pub data: ChartData,
}

// ── Univariate ────────────────────────────────────────────────────────

/// Histogram of a continuous column.
pub fn histogram(
    dataset: &Dataset,
    column: &str,
    strategy: BinStrategy,
) -> Result<ChartSpec, AnalysisError> {
    dataset.require_role(column, ColumnRole::Continuous)?;
    let values = dataset.frame().numeric_values(column)?;
    let bins = dist::histogram_bins(&values, strategy.to_analytics()).ok_or_else(|| {
        AnalysisError::computation("histogram", &[column], "binning failed".to_string())
    })?;
    Ok(ChartSpec {
        title: format!("Histogram of {column}"),
        hints: RenderHints::default(),
        data: ChartData::Histogram {
            column: column.to_string(),
            edges: bins.edges,
            counts: bins.counts,
            bin_width: bins.bin_width,
        },
    })
}

/// Normal Q-Q plot of a continuous column.
pub fn qq_plot(dataset: &Dataset, column: &str) -> Result<ChartSpec, AnalysisError> {
    dataset.require_role(column, ColumnRole::Continuous)?;
    let values = dataset.frame().numeric_values(column)?;
    let (theoretical, sample) = dist::qq_plot_normal(&values).ok_or_else(|| {
        AnalysisError::computation("Q-Q plot", &[column], "too few values".to_string())
    })?;
    Ok(ChartSpec {
        title: format!("Q-Q Plot of {column}"),
        hints: RenderHints::default(),
        data: ChartData::QqPlot {
            column: column.to_string(),
            theoretical,
            sample,
        },
    })
}

/// Empirical CDF of a continuous column.
pub fn ecdf(dataset: &Dataset, column: &str) -> Result<ChartSpec, AnalysisError> {
    dataset.require_role(column, ColumnRole::Continuous)?;
    let values = dataset.frame().numeric_values(column)?;
    let (values, probabilities) = dist::ecdf(&values).ok_or_else(|| {
        AnalysisError::computation("ECDF", &[column], "no valid values".to_string())
    })?;
    Ok(ChartSpec {
        title: format!("ECDF of {column}"),
        hints: RenderHints::default(),
        data: ChartData::Ecdf {
            column: column.to_string(),
            values,
            probabilities,
        },
    })
}

// ── Categorical ───────────────────────────────────────────────────────

fn level_counts(dataset: &Dataset, column: &str) -> Result<Vec<LevelCount>, AnalysisError> {
    dataset.require_role(column, ColumnRole::Categorical)?;
    let freqs = dataset.frame().level_frequencies(column)?;
    let total: usize = freqs.iter().map(|(_, c)| c).sum();
    Ok(freqs
        .into_iter()
        .map(|(level, count)| LevelCount {
            level,
            count,
            share: count as f64 / total.max(1) as f64,
        })
        .collect())
}

/// Bar chart of level counts for a categorical column.
pub fn bar(dataset: &Dataset, column: &str) -> Result<ChartSpec, AnalysisError> {
    Ok(ChartSpec {
        title: format!("Counts of {column}"),
        hints: RenderHints::default(),
        data: ChartData::Bar {
            column: column.to_string(),
            levels: level_counts(dataset, column)?,
        },
    })
}

/// Pie chart of level shares for a categorical column.
pub fn pie(dataset: &Dataset, column: &str) -> Result<ChartSpec, AnalysisError> {
    Ok(ChartSpec {
        title: format!("Share of {column}"),
        hints: RenderHints::default(),
        data: ChartData::Pie {
            column: column.to_string(),
            levels: level_counts(dataset, column)?,
        },
    })
}

// ── Grouped ───────────────────────────────────────────────────────────

fn group_samples(
    dataset: &Dataset,
    label_column: &str,
    value_column: &str,
) -> Result<Vec<GroupSample>, AnalysisError> {
    dataset.require_role(label_column, ColumnRole::Categorical)?;
    dataset.require_role(value_column, ColumnRole::Continuous)?;
    let groups = dataset.frame().groups_by(label_column, value_column)?;
    let mut out = Vec::with_capacity(groups.len());
    for (level, values) in groups {
        if values.is_empty() {
            continue;
        }
        let q1 = stats::quantile(&values, 0.25).unwrap_or(f64::NAN);
        let median = stats::median(&values).unwrap_or(f64::NAN);
        let q3 = stats::quantile(&values, 0.75).unwrap_or(f64::NAN);
        out.push(GroupSample {
            level,
            values,
            q1,
            median,
            q3,
        });
    }
    if out.is_empty() {
        return Err(AnalysisError::InsufficientGroups { actual: 0 });
    }
    Ok(out)
}

/// Box plot of a continuous column split by a categorical column.
pub fn box_plot(
    dataset: &Dataset,
    label_column: &str,
    value_column: &str,
) -> Result<ChartSpec, AnalysisError> {
    Ok(ChartSpec {
        title: format!("{value_column} by {label_column}"),
        hints: RenderHints::default(),
        data: ChartData::BoxPlot {
            value_column: value_column.to_string(),
            label_column: label_column.to_string(),
            groups: group_samples(dataset, label_column, value_column)?,
        },
    })
}

/// Violin plot of a continuous column split by a categorical column.
pub fn violin(
    dataset: &Dataset,
    label_column: &str,
    value_column: &str,
) -> Result<ChartSpec, AnalysisError> {
    Ok(ChartSpec {
        title: format!("{value_column} by {label_column}"),
        hints: RenderHints::default(),
        data: ChartData::Violin {
            value_column: value_column.to_string(),
            label_column: label_column.to_string(),
            groups: group_samples(dataset, label_column, value_column)?,
        },
    })
}

// ── Bivariate ─────────────────────────────────────────────────────────

fn paired_continuous(
    dataset: &Dataset,
    x_column: &str,
    y_column: &str,
) -> Result<(Vec<f64>, Vec<f64>), AnalysisError> {
    dataset.require_role(x_column, ColumnRole::Continuous)?;
    dataset.require_role(y_column, ColumnRole::Continuous)?;
    let (x, y) = dataset.frame().paired_numeric(x_column, y_column)?;
    if x.is_empty() {
        return Err(AnalysisError::InsufficientData {
            min_required: 1,
            actual: 0,
        });
    }
    Ok((x, y))
}

/// Line plot of two continuous columns in row order.
pub fn line_plot(
    dataset: &Dataset,
    x_column: &str,
    y_column: &str,
) -> Result<ChartSpec, AnalysisError> {
    let (x, y) = paired_continuous(dataset, x_column, y_column)?;
    Ok(ChartSpec {
        title: format!("{y_column} over {x_column}"),
        hints: RenderHints::default(),
        data: ChartData::LinePlot {
            x_column: x_column.to_string(),
            y_column: y_column.to_string(),
            x,
            y,
        },
    })
}

/// Scatter plot of two continuous columns, optionally with a fitted
/// regression line.
pub fn scatter(
    dataset: &Dataset,
    x_column: &str,
    y_column: &str,
    with_fit: bool,
) -> Result<ChartSpec, AnalysisError> {
    let (x, y) = paired_continuous(dataset, x_column, y_column)?;
    let fit = if with_fit {
        let report: RegressionReport = correlation::linear_regression(dataset, x_column, y_column)?;
        Some(FitLine {
            slope: report.slope,
            intercept: report.intercept,
            r_squared: report.r_squared,
        })
    } else {
        None
    };
    Ok(ChartSpec {
        title: format!("{y_column} vs {x_column}"),
        hints: RenderHints::default(),
        data: ChartData::Scatter {
            x_column: x_column.to_string(),
            y_column: y_column.to_string(),
            x,
            y,
            fit,
        },
    })
}

/// 3D scatter of three continuous columns over their complete cases.
pub fn scatter3d(
    dataset: &Dataset,
    x_column: &str,
    y_column: &str,
    z_column: &str,
) -> Result<ChartSpec, AnalysisError> {
    for c in [x_column, y_column, z_column] {
        dataset.require_role(c, ColumnRole::Continuous)?;
    }
    let (_, by_column) = dataset
        .frame()
        .complete_rows(&[x_column, y_column, z_column])?;
    let n = by_column[0].len();
    if n == 0 {
        return Err(AnalysisError::InsufficientData {
            min_required: 1,
            actual: 0,
        });
    }
    let points: Vec<[f64; 3]> = (0..n)
        .map(|i| [by_column[0][i], by_column[1][i], by_column[2][i]])
        .collect();
    Ok(ChartSpec {
        title: format!("{x_column} / {y_column} / {z_column}"),
        hints: RenderHints::sized(9.0, 7.0),
        data: ChartData::Scatter3d {
            columns: [
                x_column.to_string(),
                y_column.to_string(),
                z_column.to_string(),
            ],
            points,
        },
    })
}

/// Interpolated surface of a response column over two predictors,
/// evaluated on a regular [`SURFACE_GRID_SIZE`]-per-axis grid. Heights
/// come from inverse-distance weighting in normalized coordinates;
/// grid cells with no observation within the support radius stay NaN.
pub fn surface3d(
    dataset: &Dataset,
    x_column: &str,
    y_column: &str,
    z_column: &str,
) -> Result<ChartSpec, AnalysisError> {
    for c in [x_column, y_column, z_column] {
        dataset.require_role(c, ColumnRole::Continuous)?;
    }
    let (_, by_column) = dataset
        .frame()
        .complete_rows(&[x_column, y_column, z_column])?;
    let n = by_column[0].len();
    if n < 3 {
        return Err(AnalysisError::InsufficientData {
            min_required: 3,
            actual: n,
        });
    }
    let (x, y, z) = (&by_column[0], &by_column[1], &by_column[2]);
    let (x_min, x_max) = min_max(x);
    let (y_min, y_max) = min_max(y);
    let grid_x = linspace(x_min, x_max, SURFACE_GRID_SIZE);
    let grid_y = linspace(y_min, y_max, SURFACE_GRID_SIZE);

    // interpolate on the unit square so axis scales do not skew the
    // distance weighting
    let x_span = (x_max - x_min).max(1e-15);
    let y_span = (y_max - y_min).max(1e-15);
    let u: Vec<f64> = x.iter().map(|v| (v - x_min) / x_span).collect();
    let v: Vec<f64> = y.iter().map(|w| (w - y_min) / y_span).collect();
    let cell = 1.0 / (SURFACE_GRID_SIZE - 1) as f64;
    let support = 2.0 * cell;

    let mut heights = Vec::with_capacity(SURFACE_GRID_SIZE);
    for gy in 0..SURFACE_GRID_SIZE {
        let gv = gy as f64 * cell;
        let row: Vec<f64> = (0..SURFACE_GRID_SIZE)
            .map(|gx| idw_height(&u, &v, z, gx as f64 * cell, gv, support))
            .collect();
        heights.push(row);
    }

    let points: Vec<[f64; 3]> = if n > SURFACE_POINT_CAP {
        let mut rng = reduction::Lcg::new(reduction::DEFAULT_SEED);
        reduction::sample_indices(n, SURFACE_POINT_CAP, &mut rng)
            .into_iter()
            .map(|i| [x[i], y[i], z[i]])
            .collect()
    } else {
        (0..n).map(|i| [x[i], y[i], z[i]]).collect()
    };

    Ok(ChartSpec {
        title: format!("{z_column} = f({x_column}, {y_column})"),
        hints: RenderHints::default(),
        data: ChartData::Surface3d {
            columns: [
                x_column.to_string(),
                y_column.to_string(),
                z_column.to_string(),
            ],
            grid_x,
            grid_y,
            heights,
            points,
        },
    })
}

fn min_max(values: &[f64]) -> (f64, f64) {
    values.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
        (lo.min(v), hi.max(v))
    })
}

fn linspace(lo: f64, hi: f64, count: usize) -> Vec<f64> {
    let step = (hi - lo) / (count - 1) as f64;
    (0..count).map(|i| lo + step * i as f64).collect()
}

/// Inverse-distance-squared estimate at grid point (gu, gv); NaN when
/// the nearest observation is farther than `support`.
fn idw_height(u: &[f64], v: &[f64], z: &[f64], gu: f64, gv: f64, support: f64) -> f64 {
    let mut weight_sum = 0.0;
    let mut value_sum = 0.0;
    let mut nearest = f64::INFINITY;
    for i in 0..u.len() {
        let du = u[i] - gu;
        let dv = v[i] - gv;
        let d_sq = du * du + dv * dv;
        // a coincident observation pins the cell exactly
        if d_sq < 1e-18 {
            return z[i];
        }
        nearest = nearest.min(d_sq);
        let w = 1.0 / d_sq;
        weight_sum += w;
        value_sum += w * z[i];
    }
    if nearest.sqrt() > support {
        f64::NAN
    } else {
        value_sum / weight_sum
    }
}

// ── Multivariate ──────────────────────────────────────────────────────

/// Correlation heatmap over all continuous columns.
pub fn heatmap(dataset: &Dataset) -> Result<ChartSpec, AnalysisError> {
    let report = correlation::correlation_report(dataset)?;
    Ok(ChartSpec {
        title: "Correlation Matrix".to_string(),
        hints: RenderHints::sized(8.0, 7.0),
        data: ChartData::Heatmap {
            columns: report.columns,
            values: report.values,
        },
    })
}

/// Scatter matrix over the first five continuous columns (or fewer).
pub fn pair_grid(dataset: &Dataset) -> Result<ChartSpec, AnalysisError> {
    let continuous = dataset.continuous_columns();
    if continuous.len() < 2 {
        return Err(AnalysisError::InsufficientVariables {
            min_required: 2,
            actual: continuous.len(),
        });
    }
    let shown: Vec<String> = continuous
        .iter()
        .take(PAIR_GRID_MAX_COLUMNS)
        .cloned()
        .collect();
    let names: Vec<&str> = shown.iter().map(|c| c.as_str()).collect();
    let (_, by_column) = dataset.frame().complete_rows(&names)?;
    let n = by_column[0].len();
    let rows: Vec<Vec<f64>> = (0..n)
        .map(|i| by_column.iter().map(|col| col[i]).collect())
        .collect();
    Ok(ChartSpec {
        title: "Pair Grid".to_string(),
        hints: RenderHints::sized(10.0, 10.0),
        data: ChartData::PairGrid {
            columns: shown,
            rows,
        },
    })
}

/// Radar chart of standardized per-level means: each category level
/// becomes one polygon over the selected continuous columns.
pub fn radar(
    dataset: &Dataset,
    label_column: &str,
    selection: &[&str],
) -> Result<ChartSpec, AnalysisError> {
    dataset.require_role(label_column, ColumnRole::Categorical)?;
    let std = reduction::standardize(dataset, selection)?;
    let label = dataset.frame().require_column(label_column)?;

    let mut levels: Vec<String> = Vec::new();
    let mut sums: Vec<Vec<f64>> = Vec::new();
    let mut counts: Vec<usize> = Vec::new();
    for (pos, &row) in std.row_indices.iter().enumerate() {
        let Some(level) = label.display_at(row) else {
            continue;
        };
        let slot = match levels.iter().position(|l| *l == level) {
            Some(s) => s,
            None => {
                levels.push(level);
                sums.push(vec![0.0; std.columns.len()]);
                counts.push(0);
                levels.len() - 1
            }
        };
        counts[slot] += 1;
        for (j, v) in std.data[pos].iter().enumerate() {
            sums[slot][j] += v;
        }
    }
    if levels.is_empty() {
        return Err(AnalysisError::InsufficientGroups { actual: 0 });
    }
    let values: Vec<Vec<f64>> = sums
        .into_iter()
        .zip(&counts)
        .map(|(sum, &c)| sum.into_iter().map(|v| v / c as f64).collect())
        .collect();

    Ok(ChartSpec {
        title: format!("Profile by {label_column}"),
        hints: RenderHints::sized(8.0, 8.0),
        data: ChartData::Radar {
            label_column: label_column.to_string(),
            columns: std.columns,
            levels,
            values,
        },
    })
}

/// Overlaid histograms of a continuous column, one per category level.
pub fn distribution_comparison(
    dataset: &Dataset,
    label_column: &str,
    value_column: &str,
) -> Result<ChartSpec, AnalysisError> {
    dataset.require_role(label_column, ColumnRole::Categorical)?;
    dataset.require_role(value_column, ColumnRole::Continuous)?;
    let groups = dataset.frame().groups_by(label_column, value_column)?;
    let mut histograms = Vec::new();
    for (level, values) in groups {
        let Some(bins) = dist::histogram_bins(&values, dist::BinMethod::Sturges) else {
            continue;
        };
        histograms.push(LevelHistogram {
            level,
            edges: bins.edges,
            counts: bins.counts,
        });
    }
    if histograms.is_empty() {
        return Err(AnalysisError::InsufficientGroups { actual: 0 });
    }
    Ok(ChartSpec {
        title: format!("{value_column} by {label_column}"),
        hints: RenderHints::default(),
        data: ChartData::DistributionComparison {
            value_column: value_column.to_string(),
            label_column: label_column.to_string(),
            histograms,
        },
    })
}

// ── Reduction and clustering ──────────────────────────────────────────

/// PCA score plot in two or three dimensions, axis labels carrying the
/// explained-variance share.
pub fn pca_scatter(
    dataset: &Dataset,
    selection: &[&str],
    dimensions: usize,
) -> Result<ChartSpec, AnalysisError> {
    if !(dimensions == 2 || dimensions == 3) {
        return Err(AnalysisError::InvalidParameter {
            name: "dimensions".to_string(),
            message: format!("must be 2 or 3, got {dimensions}"),
        });
    }
    let available = if selection.is_empty() {
        dataset.continuous_columns().len()
    } else {
        selection.len()
    };
    if available < dimensions {
        return Err(AnalysisError::InsufficientVariables {
            min_required: dimensions,
            actual: available,
        });
    }
    let summary = reduction::pca(dataset, selection, Some(dimensions))?;
    let axis_labels: Vec<String> = summary
        .explained_variance_ratio
        .iter()
        .enumerate()
        .map(|(i, ratio)| format!("PC{} ({:.1}%)", i + 1, ratio * 100.0))
        .collect();
    let hints = if dimensions == 3 {
        RenderHints::sized(9.0, 7.0)
    } else {
        RenderHints::default()
    };
    Ok(ChartSpec {
        title: "PCA Scores".to_string(),
        hints,
        data: ChartData::PcaScatter {
            axis_labels,
            points: summary.scores,
        },
    })
}

/// K-Means result over the first two standardized dimensions.
pub fn cluster_scatter(
    dataset: &Dataset,
    selection: &[&str],
    k: usize,
) -> Result<ChartSpec, AnalysisError> {
    let summary = reduction::kmeans(dataset, selection, &KMeansConfig::new(k))?;
    if summary.columns.len() < 2 {
        return Err(AnalysisError::InsufficientVariables {
            min_required: 2,
            actual: summary.columns.len(),
        });
    }
    let std = reduction::standardize(dataset, selection)?;
    let points: Vec<[f64; 2]> = std.data.iter().map(|row| [row[0], row[1]]).collect();
    let centers: Vec<[f64; 2]> = summary
        .centers_standardized
        .iter()
        .map(|c| [c[0], c[1]])
        .collect();
    Ok(ChartSpec {
        title: format!("K-Means (k={k})"),
        hints: RenderHints::default(),
        data: ChartData::ClusterScatter {
            axis_labels: [summary.columns[0].clone(), summary.columns[1].clone()],
            points,
            assignments: summary.assignments,
            centers,
        },
    })
}

/// Elbow curve of K-Means inertia against k.
pub fn elbow(dataset: &Dataset, selection: &[&str]) -> Result<ChartSpec, AnalysisError> {
    let ElbowCurve { ks, inertias } = reduction::elbow_curve(dataset, selection)?;
    Ok(ChartSpec {
        title: "Elbow Curve".to_string(),
        hints: RenderHints::default(),
        data: ChartData::ElbowCurve { ks, inertias },
    })
}

/// Dendrogram of hierarchical clustering.
pub fn dendrogram(
    dataset: &Dataset,
    selection: &[&str],
    linkage: Linkage,
) -> Result<ChartSpec, AnalysisError> {
    let summary = reduction::hierarchical(dataset, selection, linkage)?;
    Ok(ChartSpec {
        title: format!("Dendrogram ({} linkage)", summary.linkage),
        hints: RenderHints::sized(10.0, 6.0),
        data: ChartData::Dendrogram(summary),
    })
}

// ── Tests ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::AnalysisSession;

    fn fixture() -> Dataset {
        let csv = "\
id,height,weight,depth,group
note,,,,
1,150.2,50.1,10.0,a
2,152.4,52.3,11.0,a
3,155.1,54.0,12.0,a
4,158.9,56.2,13.0,b
5,161.0,58.8,14.0,b
6,163.3,61.0,15.0,b
7,165.8,63.1,16.0,a
8,168.2,65.5,17.0,a
9,171.4,67.9,18.0,b
10,174.0,70.2,19.0,b
11,176.5,72.8,20.0,a
12,179.1,75.0,21.0,b";
        let mut session = AnalysisSession::new();
        session.load_str(csv).unwrap();
        session.dataset().unwrap().clone()
    }

    // ── Univariate ───────────────────────────────────────────────

    #[test]
    fn histogram_counts_cover_all_values() {
        let ds = fixture();
        let spec = histogram(&ds, "height", BinStrategy::Sturges).unwrap();
        assert_eq!(spec.hints.dpi, DEFAULT_DPI);
        match spec.data {
            ChartData::Histogram { counts, edges, .. } => {
                assert_eq!(counts.iter().sum::<usize>(), 12);
                assert_eq!(edges.len(), counts.len() + 1);
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn histogram_rejects_categorical() {
        let ds = fixture();
        let err = histogram(&ds, "group", BinStrategy::Sturges).unwrap_err();
        assert!(matches!(err, AnalysisError::WrongRole { .. }));
    }

    #[test]
    fn qq_plot_pairs_match_sample_size() {
        let ds = fixture();
        let spec = qq_plot(&ds, "weight").unwrap();
        match spec.data {
            ChartData::QqPlot {
                theoretical,
                sample,
                ..
            } => {
                assert_eq!(theoretical.len(), 12);
                assert_eq!(sample.len(), 12);
                // sample quantiles come out sorted
                assert!(sample.windows(2).all(|w| w[0] <= w[1]));
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn ecdf_reaches_one() {
        let ds = fixture();
        let spec = ecdf(&ds, "depth").unwrap();
        match spec.data {
            ChartData::Ecdf { probabilities, .. } => {
                let last = *probabilities.last().unwrap();
                assert!((last - 1.0).abs() < 1e-12);
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    // ── Categorical ──────────────────────────────────────────────

    #[test]
    fn bar_levels_ordered_by_count() {
        let ds = fixture();
        let spec = bar(&ds, "group").unwrap();
        match spec.data {
            ChartData::Bar { levels, .. } => {
                assert_eq!(levels.len(), 2);
                assert!(levels[0].count >= levels[1].count);
                let total_share: f64 = levels.iter().map(|l| l.share).sum();
                assert!((total_share - 1.0).abs() < 1e-12);
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    // ── Grouped ──────────────────────────────────────────────────

    #[test]
    fn box_plot_groups_with_quartiles() {
        let ds = fixture();
        let spec = box_plot(&ds, "group", "height").unwrap();
        match spec.data {
            ChartData::BoxPlot { groups, .. } => {
                assert_eq!(groups.len(), 2);
                for g in &groups {
                    assert!(g.q1 <= g.median && g.median <= g.q3);
                }
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    // ── Bivariate ────────────────────────────────────────────────

    #[test]
    fn scatter_with_fit_line() {
        let ds = fixture();
        let spec = scatter(&ds, "height", "weight", true).unwrap();
        match spec.data {
            ChartData::Scatter { x, y, fit, .. } => {
                assert_eq!(x.len(), 12);
                assert_eq!(y.len(), 12);
                let fit = fit.unwrap();
                assert!(fit.slope > 0.0);
                assert!(fit.r_squared > 0.95);
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn scatter3d_collects_points() {
        let ds = fixture();
        let spec = scatter3d(&ds, "height", "weight", "depth").unwrap();
        match spec.data {
            ChartData::Scatter3d { points, .. } => assert_eq!(points.len(), 12),
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn surface3d_interpolates_on_grid() {
        let ds = fixture();
        let spec = surface3d(&ds, "height", "weight", "depth").unwrap();
        match spec.data {
            ChartData::Surface3d {
                grid_x,
                grid_y,
                heights,
                points,
                ..
            } => {
                assert_eq!(grid_x.len(), SURFACE_GRID_SIZE);
                assert_eq!(grid_y.len(), SURFACE_GRID_SIZE);
                assert_eq!(heights.len(), SURFACE_GRID_SIZE);
                assert!(heights.iter().all(|r| r.len() == SURFACE_GRID_SIZE));
                assert_eq!(points.len(), 12);
                // corner cells land exactly on the extreme
                // observations of this monotone fixture
                assert!((heights[0][0] - 10.0).abs() < 1e-12);
                assert!((heights[24][24] - 21.0).abs() < 1e-12);
                // the data hugs the diagonal, so the off-diagonal
                // corner has no support and stays a hole
                assert!(heights[0][24].is_nan());
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn surface3d_caps_overlay_points() {
        let mut csv = String::from("x,y,z\n");
        for i in 0..60 {
            csv.push_str(&format!("{},{},{}\n", i, 2 * i, 3 * i));
        }
        let mut session = AnalysisSession::new();
        session.load_str(&csv).unwrap();
        let ds = session.dataset().unwrap().clone();
        let spec = surface3d(&ds, "x", "y", "z").unwrap();
        match spec.data {
            ChartData::Surface3d { points, .. } => {
                assert_eq!(points.len(), SURFACE_POINT_CAP)
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    // ── Multivariate ─────────────────────────────────────────────

    #[test]
    fn heatmap_square_matrix() {
        let ds = fixture();
        let spec = heatmap(&ds).unwrap();
        match spec.data {
            ChartData::Heatmap { columns, values } => {
                assert_eq!(values.len(), columns.len());
                assert!(values.iter().all(|row| row.len() == columns.len()));
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn pair_grid_caps_columns() {
        let ds = fixture();
        let spec = pair_grid(&ds).unwrap();
        match spec.data {
            ChartData::PairGrid { columns, rows } => {
                assert!(columns.len() <= PAIR_GRID_MAX_COLUMNS);
                assert!(rows.iter().all(|r| r.len() == columns.len()));
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn radar_one_polygon_per_level() {
        let ds = fixture();
        let spec = radar(&ds, "group", &["height", "weight"]).unwrap();
        match spec.data {
            ChartData::Radar {
                levels, values, ..
            } => {
                assert_eq!(levels.len(), 2);
                assert_eq!(values.len(), 2);
                assert!(values.iter().all(|v| v.len() == 2));
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn distribution_comparison_per_level() {
        let ds = fixture();
        let spec = distribution_comparison(&ds, "group", "height").unwrap();
        match spec.data {
            ChartData::DistributionComparison { histograms, .. } => {
                assert_eq!(histograms.len(), 2);
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    // ── Reduction ────────────────────────────────────────────────

    #[test]
    fn pca_scatter_axis_labels_show_variance() {
        let ds = fixture();
        let spec = pca_scatter(&ds, &[], 2).unwrap();
        match spec.data {
            ChartData::PcaScatter {
                axis_labels,
                points,
            } => {
                assert_eq!(axis_labels.len(), 2);
                assert!(axis_labels[0].starts_with("PC1 ("));
                assert!(points.iter().all(|p| p.len() == 2));
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn pca_scatter_rejects_bad_dimensions() {
        let ds = fixture();
        let err = pca_scatter(&ds, &[], 4).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidParameter { .. }));
    }

    #[test]
    fn pca_scatter_needs_enough_variables() {
        let ds = fixture();
        let err = pca_scatter(&ds, &["height", "weight"], 3).unwrap_err();
        assert!(matches!(err, AnalysisError::InsufficientVariables { .. }));
    }

    #[test]
    fn cluster_scatter_has_k_centers() {
        let ds = fixture();
        let spec = cluster_scatter(&ds, &["height", "weight"], 2).unwrap();
        match spec.data {
            ChartData::ClusterScatter {
                centers,
                assignments,
                ..
            } => {
                assert_eq!(centers.len(), 2);
                assert_eq!(assignments.len(), 12);
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn dendrogram_spec_wraps_summary() {
        let ds = fixture();
        let spec = dendrogram(&ds, &[], Linkage::Ward).unwrap();
        match spec.data {
            ChartData::Dendrogram(summary) => {
                assert_eq!(summary.merges.len(), 11);
                assert!(summary.labels.is_some());
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }
}
