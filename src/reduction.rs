//! Multivariate analysis: standardization, PCA, K-Means, and
//! hierarchical clustering.
//!
//! All operations here run on the complete cases of a set of
//! continuous columns, z-scored per column so no variable dominates
//! through its unit. Randomized steps (k-means++ seeding, dendrogram
//! sampling) draw from a fixed-seed LCG so repeated runs over the same
//! dataset agree.

use std::fmt::Write as _;

use log::info;
use u_numflow::matrix::Matrix;

use crate::classify::ColumnRole;
use crate::error::AnalysisError;
use crate::session::Dataset;

/// Cumulative explained-variance level the PCA report suggests
/// components for.
pub const VARIANCE_TARGET: f64 = 0.8;

/// Row cap for hierarchical clustering; larger datasets are sampled.
pub const DENDROGRAM_SAMPLE_CAP: usize = 50;

/// Largest k the elbow curve evaluates.
pub const ELBOW_MAX_K: usize = 9;

/// Seed for all deterministic sampling in the crate.
pub(crate) const DEFAULT_SEED: u64 = 42;

// ── Deterministic RNG ─────────────────────────────────────────────────

/// Linear congruential generator (Knuth's MMIX constants), enough for
/// reproducible seeding and sampling.
pub(crate) struct Lcg {
    state: u64,
}

impl Lcg {
    pub(crate) fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_f64(&mut self) -> f64 {
        self.state = self
            .state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.state >> 33) as f64 / (1u64 << 31) as f64
    }

    fn next_index(&mut self, n: usize) -> usize {
        (self.next_f64() * n as f64) as usize % n
    }
}

/// Draws `count` distinct indices from `0..n` by partial Fisher-Yates,
/// returned in ascending order.
pub(crate) fn sample_indices(n: usize, count: usize, rng: &mut Lcg) -> Vec<usize> {
    let mut pool: Vec<usize> = (0..n).collect();
    for i in 0..count.min(n) {
        let j = i + rng.next_index(n - i);
        pool.swap(i, j);
    }
    let mut picked: Vec<usize> = pool[..count.min(n)].to_vec();
    picked.sort_unstable();
    picked
}

// ── Standardization ───────────────────────────────────────────────────

/// Z-scored complete cases of a set of continuous columns.
#[derive(Debug, Clone)]
pub struct Standardized {
    /// Columns, in selection order.
    pub columns: Vec<String>,
    /// Original frame row index of each kept row.
    pub row_indices: Vec<usize>,
    /// Per-column means over the kept rows.
    pub means: Vec<f64>,
    /// Per-column population standard deviations (zero-spread columns
    /// scale by 1.0).
    pub std_devs: Vec<f64>,
    /// Row-major standardized values.
    pub data: Vec<Vec<f64>>,
}

impl Standardized {
    /// Maps a standardized point back to original units.
    pub fn to_original(&self, point: &[f64]) -> Vec<f64> {
        point
            .iter()
            .zip(self.std_devs.iter().zip(&self.means))
            .map(|(v, (s, m))| v * s + m)
            .collect()
    }
}

/// Resolves a column selection: empty means all continuous columns.
fn resolve_selection(dataset: &Dataset, selection: &[&str]) -> Vec<String> {
    if selection.is_empty() {
        dataset.continuous_columns().to_vec()
    } else {
        selection.iter().map(|s| (*s).to_string()).collect()
    }
}

/// Clustering runs over at least two variables; one dimension has no
/// meaningful cluster geometry here.
fn require_two_columns(std: &Standardized) -> Result<(), AnalysisError> {
    if std.columns.len() < 2 {
        return Err(AnalysisError::InsufficientVariables {
            min_required: 2,
            actual: std.columns.len(),
        });
    }
    Ok(())
}

/// Standardizes the complete cases of the selected continuous columns
/// (all continuous columns when `selection` is empty).
pub fn standardize(dataset: &Dataset, selection: &[&str]) -> Result<Standardized, AnalysisError> {
    let columns = resolve_selection(dataset, selection);
    if columns.is_empty() {
        return Err(AnalysisError::InsufficientVariables {
            min_required: 1,
            actual: 0,
        });
    }
    for c in &columns {
        dataset.require_role(c, ColumnRole::Continuous)?;
    }
    let names: Vec<&str> = columns.iter().map(|c| c.as_str()).collect();
    let (row_indices, by_column) = dataset.frame().complete_rows(&names)?;
    let n = row_indices.len();
    if n < 2 {
        return Err(AnalysisError::InsufficientData {
            min_required: 2,
            actual: n,
        });
    }

    let mut means = Vec::with_capacity(columns.len());
    let mut std_devs = Vec::with_capacity(columns.len());
    for col in &by_column {
        let mean = col.iter().sum::<f64>() / n as f64;
        let var = col.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;
        let std = var.sqrt();
        means.push(mean);
        // constant columns pass through unscaled
        std_devs.push(if std < 1e-15 { 1.0 } else { std });
    }

    let data: Vec<Vec<f64>> = (0..n)
        .map(|r| {
            by_column
                .iter()
                .enumerate()
                .map(|(c, col)| (col[r] - means[c]) / std_devs[c])
                .collect()
        })
        .collect();

    Ok(Standardized {
        columns,
        row_indices,
        means,
        std_devs,
        data,
    })
}

// ── PCA ───────────────────────────────────────────────────────────────

/// Principal component analysis over standardized columns.
#[derive(Debug, Clone)]
pub struct PcaSummary {
    /// Variables, loading order.
    pub columns: Vec<String>,
    /// Complete cases analyzed.
    pub observations: usize,
    pub n_components: usize,
    /// Retained eigenvalues, descending.
    pub eigenvalues: Vec<f64>,
    pub explained_variance_ratio: Vec<f64>,
    pub cumulative_variance_ratio: Vec<f64>,
    /// Loadings, component-major: `loadings[c][v]` is the weight of
    /// variable `v` in component `c`.
    pub loadings: Vec<Vec<f64>>,
    /// Projected rows, row-major.
    pub scores: Vec<Vec<f64>>,
    /// Smallest component count whose cumulative explained variance
    /// reaches the 80% target (all components if never reached).
    pub suggested_components: usize,
}

impl PcaSummary {
    /// Renders the report as text.
    pub fn render(&self) -> String {
        let mut out = String::from("=== Principal Component Analysis ===\n");
        let _ = writeln!(
            out,
            "variables: {} (n={})",
            self.columns.join(", "),
            self.observations
        );
        for (i, (ratio, cum)) in self
            .explained_variance_ratio
            .iter()
            .zip(&self.cumulative_variance_ratio)
            .enumerate()
        {
            let _ = writeln!(
                out,
                "PC{}: {:.2}% explained, {:.2}% cumulative",
                i + 1,
                ratio * 100.0,
                cum * 100.0
            );
        }
        let _ = writeln!(
            out,
            "suggestion: first {} component(s) reach {:.0}% of variance",
            self.suggested_components,
            VARIANCE_TARGET * 100.0
        );
        for (c, loading) in self.loadings.iter().enumerate() {
            let parts: Vec<String> = self
                .columns
                .iter()
                .zip(loading)
                .map(|(name, w)| format!("{name}={w:.3}"))
                .collect();
            let _ = writeln!(out, "PC{} loadings: {}", c + 1, parts.join(", "));
        }
        out
    }
}

/// Runs PCA over the selected continuous columns (all of them when
/// `selection` is empty), retaining `n_components` components or all
/// when `None`.
pub fn pca(
    dataset: &Dataset,
    selection: &[&str],
    n_components: Option<usize>,
) -> Result<PcaSummary, AnalysisError> {
    let std = standardize(dataset, selection)?;
    let d = std.columns.len();
    if d < 2 {
        return Err(AnalysisError::InsufficientVariables {
            min_required: 2,
            actual: d,
        });
    }
    let k = n_components.unwrap_or(d);
    if k == 0 || k > d {
        return Err(AnalysisError::InvalidParameter {
            name: "n_components".to_string(),
            message: format!("must be between 1 and {d}, got {k}"),
        });
    }
    let n = std.data.len();
    if n <= d {
        return Err(AnalysisError::InsufficientData {
            min_required: d + 1,
            actual: n,
        });
    }

    // covariance of the standardized data (d x d)
    let mut cov = vec![0.0; d * d];
    for row in &std.data {
        for i in 0..d {
            for j in i..d {
                let v = row[i] * row[j];
                cov[i * d + j] += v;
                if i != j {
                    cov[j * d + i] += v;
                }
            }
        }
    }
    let scale = 1.0 / (n - 1) as f64;
    for v in &mut cov {
        *v *= scale;
    }

    let names: Vec<&str> = std.columns.iter().map(|c| c.as_str()).collect();
    let cov_matrix = Matrix::new(d, d, cov)
        .map_err(|e| AnalysisError::computation("PCA", &names, e.to_string()))?;
    let (eigenvalues, eigenvectors) = cov_matrix
        .eigen_symmetric()
        .map_err(|e| AnalysisError::computation("PCA", &names, e.to_string()))?;

    let total: f64 = eigenvalues.iter().sum();
    let retained: Vec<f64> = eigenvalues[..k].to_vec();
    let explained_variance_ratio: Vec<f64> = if total > 1e-15 {
        retained.iter().map(|&ev| ev / total).collect()
    } else {
        vec![0.0; k]
    };
    let mut cumulative_variance_ratio = Vec::with_capacity(k);
    let mut cum = 0.0;
    for &r in &explained_variance_ratio {
        cum += r;
        cumulative_variance_ratio.push(cum);
    }
    let suggested_components = cumulative_variance_ratio
        .iter()
        .position(|&c| c >= VARIANCE_TARGET)
        .map_or(k, |i| i + 1);

    let mut loadings = Vec::with_capacity(k);
    for comp in 0..k {
        loadings.push((0..d).map(|feat| eigenvectors.get(feat, comp)).collect::<Vec<f64>>());
    }

    let scores: Vec<Vec<f64>> = std
        .data
        .iter()
        .map(|row| {
            loadings
                .iter()
                .map(|loading| row.iter().zip(loading).map(|(x, w)| x * w).sum())
                .collect()
        })
        .collect();

    Ok(PcaSummary {
        columns: std.columns,
        observations: n,
        n_components: k,
        eigenvalues: retained,
        explained_variance_ratio,
        cumulative_variance_ratio,
        loadings,
        scores,
        suggested_components,
    })
}

// ── K-Means ───────────────────────────────────────────────────────────

/// K-Means configuration with the restart and seeding defaults used
/// throughout the crate.
#[derive(Debug, Clone)]
pub struct KMeansConfig {
    pub k: usize,
    /// Maximum iterations per restart. Default: 300.
    pub max_iter: usize,
    /// Convergence tolerance on centroid shift. Default: 1e-4.
    pub tol: f64,
    /// Restarts, keeping the lowest-inertia run. Default: 10.
    pub n_init: usize,
    /// Seed for k-means++ initialization. Default: 42.
    pub seed: u64,
}

impl KMeansConfig {
    /// Creates a config for `k` clusters with default settings.
    pub fn new(k: usize) -> Self {
        Self {
            k,
            max_iter: 300,
            tol: 1e-4,
            n_init: 10,
            seed: DEFAULT_SEED,
        }
    }

    /// Sets the maximum iterations per restart.
    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Sets the seed for initialization.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// K-Means clustering result over standardized complete cases.
#[derive(Debug, Clone)]
pub struct ClusterSummary {
    pub columns: Vec<String>,
    pub k: usize,
    /// Complete cases analyzed.
    pub observations: usize,
    /// Original frame row index of each analyzed row.
    pub row_indices: Vec<usize>,
    /// Cluster label per analyzed row.
    pub assignments: Vec<usize>,
    pub sizes: Vec<usize>,
    /// Cluster centers in standardized units.
    pub centers_standardized: Vec<Vec<f64>>,
    /// Cluster centers mapped back to original units (the per-cluster
    /// means of the original values).
    pub centers_original: Vec<Vec<f64>>,
    /// Within-cluster sum of squares in standardized space.
    pub inertia: f64,
    pub iterations: usize,
}

impl ClusterSummary {
    /// Renders the report as text.
    pub fn render(&self) -> String {
        let mut out = String::from("=== K-Means Clustering ===\n");
        let _ = writeln!(
            out,
            "variables: {} (n={}, k={}, inertia={:.4})",
            self.columns.join(", "),
            self.observations,
            self.k,
            self.inertia
        );
        for (c, size) in self.sizes.iter().enumerate() {
            let center: Vec<String> = self
                .columns
                .iter()
                .zip(&self.centers_original[c])
                .map(|(name, v)| format!("{name}={v:.4}"))
                .collect();
            let _ = writeln!(out, "cluster {c}: n={size}, means: {}", center.join(", "));
        }
        out
    }
}

/// Runs K-Means on the selected continuous columns.
pub fn kmeans(
    dataset: &Dataset,
    selection: &[&str],
    config: &KMeansConfig,
) -> Result<ClusterSummary, AnalysisError> {
    let std = standardize(dataset, selection)?;
    require_two_columns(&std)?;
    let n = std.data.len();
    if config.k == 0 || config.k > n {
        return Err(AnalysisError::InvalidParameter {
            name: "k".to_string(),
            message: format!("must be between 1 and {n}, got {}", config.k),
        });
    }

    let run = kmeans_best_of(&std.data, config);
    let centers_original = run
        .centroids
        .iter()
        .map(|c| std.to_original(c))
        .collect();

    info!(
        "k-means: k={}, inertia={:.4} after {} iterations",
        config.k, run.wcss, run.iterations
    );
    Ok(ClusterSummary {
        columns: std.columns,
        k: config.k,
        observations: n,
        row_indices: std.row_indices,
        assignments: run.labels,
        sizes: run.sizes,
        centers_standardized: run.centroids,
        centers_original,
        inertia: run.wcss,
        iterations: run.iterations,
    })
}

/// Inertia per candidate k, for the caller to inspect; no k is chosen
/// automatically.
#[derive(Debug, Clone, PartialEq)]
pub struct ElbowCurve {
    pub ks: Vec<usize>,
    pub inertias: Vec<f64>,
}

/// Evaluates K-Means inertia for k in `1..=min(9, rows - 1)` over the
/// selected continuous columns. k stays below the number of complete
/// rows, so the curve never ends in the trivial one-point-per-cluster
/// partition.
pub fn elbow_curve(dataset: &Dataset, selection: &[&str]) -> Result<ElbowCurve, AnalysisError> {
    let std = standardize(dataset, selection)?;
    require_two_columns(&std)?;
    // standardize guarantees at least two rows, so k_max >= 1
    let k_max = ELBOW_MAX_K.min(std.data.len() - 1);
    let mut ks = Vec::with_capacity(k_max);
    let mut inertias = Vec::with_capacity(k_max);
    for k in 1..=k_max {
        let config = KMeansConfig::new(k);
        let run = kmeans_best_of(&std.data, &config);
        ks.push(k);
        inertias.push(run.wcss);
    }
    Ok(ElbowCurve { ks, inertias })
}

struct KMeansRun {
    centroids: Vec<Vec<f64>>,
    labels: Vec<usize>,
    sizes: Vec<usize>,
    wcss: f64,
    iterations: usize,
}

/// Runs `n_init` restarts and keeps the lowest-inertia run.
fn kmeans_best_of(data: &[Vec<f64>], config: &KMeansConfig) -> KMeansRun {
    let mut best = kmeans_single(data, config.k, config.max_iter, config.tol, config.seed);
    for restart in 1..config.n_init.max(1) {
        let seed = config.seed.wrapping_add(restart as u64);
        let run = kmeans_single(data, config.k, config.max_iter, config.tol, seed);
        if run.wcss < best.wcss {
            best = run;
        }
    }
    best
}

fn kmeans_single(data: &[Vec<f64>], k: usize, max_iter: usize, tol: f64, seed: u64) -> KMeansRun {
    let n = data.len();
    let d = data[0].len();
    let mut centroids = kmeans_plus_plus(data, k, seed);
    let mut labels = vec![0usize; n];
    let mut iterations = 0;

    for iter in 0..max_iter {
        iterations = iter + 1;

        for (i, point) in data.iter().enumerate() {
            let mut min_dist = f64::INFINITY;
            let mut best_c = 0;
            for (c, centroid) in centroids.iter().enumerate() {
                let dist = dist_sq(point, centroid);
                if dist < min_dist {
                    min_dist = dist;
                    best_c = c;
                }
            }
            labels[i] = best_c;
        }

        let mut next = vec![vec![0.0; d]; k];
        let mut counts = vec![0usize; k];
        for (i, point) in data.iter().enumerate() {
            counts[labels[i]] += 1;
            for (j, &v) in point.iter().enumerate() {
                next[labels[i]][j] += v;
            }
        }
        for c in 0..k {
            if counts[c] > 0 {
                for v in &mut next[c] {
                    *v /= counts[c] as f64;
                }
            } else {
                // empty cluster keeps its centroid
                next[c] = centroids[c].clone();
            }
        }

        let max_shift = centroids
            .iter()
            .zip(&next)
            .map(|(old, new)| dist_sq(old, new).sqrt())
            .fold(0.0f64, f64::max);
        centroids = next;
        if max_shift < tol {
            break;
        }
    }

    let mut wcss = 0.0;
    let mut sizes = vec![0usize; k];
    for (i, point) in data.iter().enumerate() {
        sizes[labels[i]] += 1;
        wcss += dist_sq(point, &centroids[labels[i]]);
    }

    KMeansRun {
        centroids,
        labels,
        sizes,
        wcss,
        iterations,
    }
}

/// K-means++ seeding (Arthur & Vassilvitskii 2007) with
/// distance-proportional sampling.
fn kmeans_plus_plus(data: &[Vec<f64>], k: usize, seed: u64) -> Vec<Vec<f64>> {
    let n = data.len();
    let mut rng = Lcg::new(seed);
    let mut centroids: Vec<Vec<f64>> = Vec::with_capacity(k);
    centroids.push(data[rng.next_index(n)].clone());

    let mut min_dists = vec![f64::INFINITY; n];
    for c in 1..k {
        let last = &centroids[c - 1];
        for (i, point) in data.iter().enumerate() {
            min_dists[i] = min_dists[i].min(dist_sq(point, last));
        }
        let total: f64 = min_dists.iter().sum();
        if total < 1e-15 {
            centroids.push(data[rng.next_index(n)].clone());
            continue;
        }
        let target = rng.next_f64() * total;
        let mut cumulative = 0.0;
        let mut chosen = 0;
        for (i, &dist) in min_dists.iter().enumerate() {
            cumulative += dist;
            if cumulative >= target {
                chosen = i;
                break;
            }
        }
        centroids.push(data[chosen].clone());
    }
    centroids
}

#[inline]
fn dist_sq(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let diff = x - y;
            diff * diff
        })
        .sum()
}

// ── Hierarchical clustering ───────────────────────────────────────────

/// Linkage criterion for agglomerative clustering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Linkage {
    /// Minimum pairwise distance across clusters.
    Single,
    /// Maximum pairwise distance across clusters.
    Complete,
    /// Size-weighted average of pairwise distances.
    Average,
    /// Minimizes within-cluster variance; works on squared distances.
    Ward,
}

impl std::fmt::Display for Linkage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Single => write!(f, "single"),
            Self::Complete => write!(f, "complete"),
            Self::Average => write!(f, "average"),
            Self::Ward => write!(f, "ward"),
        }
    }
}

/// One merge step of the dendrogram. Leaves are `0..n`; merged
/// clusters take ids `n, n+1, ...` in merge order.
#[derive(Debug, Clone, PartialEq)]
pub struct DendrogramMerge {
    pub cluster_a: usize,
    pub cluster_b: usize,
    /// Height of the merge.
    pub height: f64,
    /// Size of the newly formed cluster.
    pub size: usize,
}

/// Dendrogram data for the plotting layer.
#[derive(Debug, Clone)]
pub struct DendrogramSummary {
    pub columns: Vec<String>,
    pub linkage: Linkage,
    /// Merge history, one entry per agglomeration step.
    pub merges: Vec<DendrogramMerge>,
    /// Leaf labels (original frame row indices), present when the
    /// analyzed set has at most [`DENDROGRAM_SAMPLE_CAP`] rows.
    pub labels: Option<Vec<String>>,
    /// Whether a row sample was analyzed instead of the full dataset.
    pub sampled: bool,
    /// Rows actually analyzed.
    pub analyzed_rows: usize,
    /// Suggested cut height for coloring: 0.7 of the tallest merge.
    pub color_threshold: f64,
}

/// Hierarchical agglomerative clustering over the selected continuous
/// columns. Datasets above [`DENDROGRAM_SAMPLE_CAP`] rows are reduced
/// to a deterministic sample of that size first.
pub fn hierarchical(
    dataset: &Dataset,
    selection: &[&str],
    linkage: Linkage,
) -> Result<DendrogramSummary, AnalysisError> {
    let std = standardize(dataset, selection)?;
    require_two_columns(&std)?;
    let n_all = std.data.len();

    let (data, row_indices, sampled) = if n_all > DENDROGRAM_SAMPLE_CAP {
        let mut rng = Lcg::new(DEFAULT_SEED);
        let picked = sample_indices(n_all, DENDROGRAM_SAMPLE_CAP, &mut rng);
        let data: Vec<Vec<f64>> = picked.iter().map(|&i| std.data[i].clone()).collect();
        let rows: Vec<usize> = picked.iter().map(|&i| std.row_indices[i]).collect();
        info!("dendrogram: sampled {DENDROGRAM_SAMPLE_CAP} of {n_all} rows");
        (data, rows, true)
    } else {
        (std.data, std.row_indices, false)
    };

    let n = data.len();
    if n < 2 {
        return Err(AnalysisError::InsufficientData {
            min_required: 2,
            actual: n,
        });
    }

    let merges = agglomerate(&data, linkage);
    let max_height = merges.iter().map(|m| m.height).fold(0.0f64, f64::max);
    // analyzed rows never exceed the cap, so leaf labels always fit
    let labels = Some(row_indices.iter().map(|i| i.to_string()).collect());

    Ok(DendrogramSummary {
        columns: std.columns,
        linkage,
        merges,
        labels,
        sampled,
        analyzed_rows: n,
        color_threshold: 0.7 * max_height,
    })
}

/// Naive agglomeration over a condensed distance matrix with
/// Lance-Williams updates. Ward operates on squared distances and
/// reports square-rooted heights.
fn agglomerate(data: &[Vec<f64>], linkage: Linkage) -> Vec<DendrogramMerge> {
    let n = data.len();
    let use_sq = linkage == Linkage::Ward;

    let mut dist = vec![0.0f64; n * (n - 1) / 2];
    for i in 0..n {
        for j in (i + 1)..n {
            let d_sq = dist_sq(&data[i], &data[j]);
            dist[condensed_index(n, i, j)] = if use_sq { d_sq } else { d_sq.sqrt() };
        }
    }

    let mut active = vec![true; n];
    let mut sizes = vec![1usize; n];
    let mut merges: Vec<DendrogramMerge> = Vec::with_capacity(n - 1);
    let mut slot_raw: Vec<(usize, usize)> = Vec::with_capacity(n - 1);

    for _ in 0..(n - 1) {
        let alive: Vec<usize> = (0..n).filter(|&i| active[i]).collect();
        let mut best = (0usize, 0usize, f64::INFINITY);
        for (ai, &ci) in alive.iter().enumerate() {
            for &cj in &alive[(ai + 1)..] {
                let d_val = dist[condensed_index(n, ci, cj)];
                if d_val < best.2 {
                    best = (ci, cj, d_val);
                }
            }
        }
        let (bi, bj, d_ij) = best;

        merges.push(DendrogramMerge {
            cluster_a: bi,
            cluster_b: bj,
            height: if use_sq { d_ij.sqrt() } else { d_ij },
            size: sizes[bi] + sizes[bj],
        });
        slot_raw.push((bi, bj));

        for &ck in &alive {
            if ck == bi || ck == bj {
                continue;
            }
            let d_ik = dist[condensed_index(n, bi.min(ck), bi.max(ck))];
            let d_jk = dist[condensed_index(n, bj.min(ck), bj.max(ck))];
            let updated = lance_williams(linkage, d_ik, d_jk, d_ij, sizes[bi], sizes[bj], sizes[ck]);
            dist[condensed_index(n, bi.min(ck), bi.max(ck))] = updated;
        }

        active[bj] = false;
        sizes[bi] += sizes[bj];
    }

    // remap slots to sequential dendrogram ids: leaves 0..n, merges n..
    let mut id_map: Vec<usize> = (0..n).collect();
    for (step, (merge, &(a, b))) in merges.iter_mut().zip(&slot_raw).enumerate() {
        merge.cluster_a = id_map[a];
        merge.cluster_b = id_map[b];
        id_map[a] = n + step;
    }
    merges
}

/// Condensed distance matrix index for pair (i, j), i < j.
#[inline]
fn condensed_index(n: usize, i: usize, j: usize) -> usize {
    debug_assert!(i < j && j < n);
    i * n - i * (i + 1) / 2 + j - i - 1
}

/// Lance-Williams distance update after merging clusters i and j.
fn lance_williams(
    linkage: Linkage,
    d_ik: f64,
    d_jk: f64,
    d_ij: f64,
    si: usize,
    sj: usize,
    sk: usize,
) -> f64 {
    match linkage {
        Linkage::Single => d_ik.min(d_jk),
        Linkage::Complete => d_ik.max(d_jk),
        Linkage::Average => {
            let (ni, nj) = (si as f64, sj as f64);
            (ni * d_ik + nj * d_jk) / (ni + nj)
        }
        Linkage::Ward => {
            let (ni, nj, nk) = (si as f64, sj as f64, sk as f64);
            ((ni + nk) * d_ik + (nj + nk) * d_jk - nk * d_ij) / (ni + nj + nk)
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────
