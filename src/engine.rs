//! Test-statistic primitives.
//!
//! Implements the comparison tests the analysis façade needs beyond
//! what `u_analytics` provides: the pooled two-sample t-test, the
//! paired t-test, Mann-Whitney U, and Kruskal-Wallis H, together with
//! the distribution functions their p-values require (regularized
//! incomplete beta and gamma, evaluated with the series and
//! continued-fraction expansions of Numerical Recipes ch. 6).
//!
//! All functions are pure and `Option`-returning: `None` means the
//! input cannot support the statistic (too few values, zero spread).
//! Callers attach column context when converting to errors.

// ── Results ───────────────────────────────────────────────────────────

/// A t-distributed test statistic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TTest {
    /// Signed t statistic.
    pub statistic: f64,
    /// Degrees of freedom.
    pub df: f64,
    /// Two-sided p-value.
    pub p_value: f64,
}

/// Mann-Whitney U result (normal approximation, tie-corrected).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UTest {
    /// U statistic of the first sample.
    pub statistic: f64,
    /// Two-sided p-value.
    pub p_value: f64,
}

/// Kruskal-Wallis H result (chi-square approximation).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HTest {
    /// Tie-corrected H statistic.
    pub statistic: f64,
    /// Degrees of freedom (k - 1).
    pub df: f64,
    /// P-value from the chi-square approximation.
    pub p_value: f64,
}

// ── Tests ─────────────────────────────────────────────────────────────

/// Pooled two-sample Student t-test (equal variances assumed).
///
/// Returns `None` when either sample has fewer than 2 values or the
/// pooled variance is zero.
pub fn student_t(a: &[f64], b: &[f64]) -> Option<TTest> {
    let (n1, n2) = (a.len(), b.len());
    if n1 < 2 || n2 < 2 {
        return None;
    }
    let (m1, m2) = (mean(a), mean(b));
    let (v1, v2) = (sample_variance(a, m1), sample_variance(b, m2));
    let df = (n1 + n2 - 2) as f64;
    let pooled = ((n1 - 1) as f64 * v1 + (n2 - 1) as f64 * v2) / df;
    if pooled <= 0.0 {
        return None;
    }
    let se = (pooled * (1.0 / n1 as f64 + 1.0 / n2 as f64)).sqrt();
    let t = (m1 - m2) / se;
    Some(TTest {
        statistic: t,
        df,
        p_value: student_t_p_two_sided(t, df),
    })
}

/// Paired t-test over two equal-length, row-aligned samples.
///
/// The statistic is computed on the differences `a[i] - b[i]`.
/// Returns `None` for fewer than 2 pairs, mismatched lengths, or
/// zero-variance differences.
pub fn paired_t(a: &[f64], b: &[f64]) -> Option<TTest> {
    if a.len() != b.len() || a.len() < 2 {
        return None;
    }
    let diffs: Vec<f64> = a.iter().zip(b).map(|(x, y)| x - y).collect();
    let n = diffs.len() as f64;
    let m = mean(&diffs);
    let v = sample_variance(&diffs, m);
    if v <= 0.0 {
        return None;
    }
    let t = m / (v / n).sqrt();
    let df = n - 1.0;
    Some(TTest {
        statistic: t,
        df,
        p_value: student_t_p_two_sided(t, df),
    })
}

/// Mann-Whitney U test, two-sided, with tie correction and continuity
/// correction in the normal approximation.
///
/// The reported statistic is U of the first sample.
pub fn mann_whitney(a: &[f64], b: &[f64]) -> Option<UTest> {
    let (n1, n2) = (a.len() as f64, b.len() as f64);
    if a.is_empty() || b.is_empty() {
        return None;
    }
    let mut combined: Vec<f64> = Vec::with_capacity(a.len() + b.len());
    combined.extend_from_slice(a);
    combined.extend_from_slice(b);
    let (ranks, tie_sum) = midranks(&combined);
    let r1: f64 = ranks[..a.len()].iter().sum();
    let u1 = r1 - n1 * (n1 + 1.0) / 2.0;

    let n = n1 + n2;
    let mu = n1 * n2 / 2.0;
    let tie_term = if n > 1.0 { tie_sum / (n * (n - 1.0)) } else { 0.0 };
    let sigma_sq = n1 * n2 / 12.0 * ((n + 1.0) - tie_term);
    if sigma_sq <= 0.0 {
        // all values identical
        return Some(UTest {
            statistic: u1,
            p_value: 1.0,
        });
    }
    let z = ((u1 - mu).abs() - 0.5).max(0.0) / sigma_sq.sqrt();
    let p = (2.0 * (1.0 - normal_cdf(z))).min(1.0);
    Some(UTest {
        statistic: u1,
        p_value: p,
    })
}

/// Kruskal-Wallis H test over two or more groups, with tie correction
/// and the chi-square approximation on k - 1 degrees of freedom.
pub fn kruskal_wallis(groups: &[&[f64]]) -> Option<HTest> {
    let k = groups.len();
    if k < 2 || groups.iter().any(|g| g.is_empty()) {
        return None;
    }
    let combined: Vec<f64> = groups.iter().flat_map(|g| g.iter().copied()).collect();
    let n = combined.len() as f64;
    if n < 3.0 {
        return None;
    }
    let (ranks, tie_sum) = midranks(&combined);

    let mut h = 0.0;
    let mut offset = 0;
    for g in groups {
        let r: f64 = ranks[offset..offset + g.len()].iter().sum();
        h += r * r / g.len() as f64;
        offset += g.len();
    }
    h = 12.0 / (n * (n + 1.0)) * h - 3.0 * (n + 1.0);

    let correction = 1.0 - tie_sum / (n * n * n - n);
    if correction <= 0.0 {
        // every value tied
        return Some(HTest {
            statistic: 0.0,
            df: (k - 1) as f64,
            p_value: 1.0,
        });
    }
    h /= correction;

    let df = (k - 1) as f64;
    Some(HTest {
        statistic: h,
        df,
        p_value: chi_squared_sf(h, df),
    })
}

// ── Ranking ───────────────────────────────────────────────────────────

/// Assigns midranks (1-based, ties averaged) and returns them in input
/// order together with the tie-correction sum `Σ (t³ - t)` over tie
/// groups.
pub(crate) fn midranks(values: &[f64]) -> (Vec<f64>, f64) {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&i, &j| values[i].partial_cmp(&values[j]).unwrap_or(std::cmp::Ordering::Equal));

    let mut ranks = vec![0.0; values.len()];
    let mut tie_sum = 0.0;
    let mut i = 0;
    while i < order.len() {
        let mut j = i + 1;
        while j < order.len() && values[order[j]] == values[order[i]] {
            j += 1;
        }
        let t = (j - i) as f64;
        let rank = (i + j + 1) as f64 / 2.0; // average of 1-based ranks i+1..=j
        for &idx in &order[i..j] {
            ranks[idx] = rank;
        }
        if t > 1.0 {
            tie_sum += t * t * t - t;
        }
        i = j;
    }
    (ranks, tie_sum)
}

// ── Distribution functions ────────────────────────────────────────────

/// Two-sided p-value of a t statistic via the regularized incomplete
/// beta function: `p = I_{ df/(df+t²) }(df/2, 1/2)`.
pub(crate) fn student_t_p_two_sided(t: f64, df: f64) -> f64 {
    if !t.is_finite() || df <= 0.0 {
        return f64::NAN;
    }
    regularized_beta(df / 2.0, 0.5, df / (df + t * t)).clamp(0.0, 1.0)
}

/// Chi-square survival function `Q(x; df) = 1 - P(df/2, x/2)`.
pub(crate) fn chi_squared_sf(x: f64, df: f64) -> f64 {
    if x <= 0.0 {
        return 1.0;
    }
    (1.0 - regularized_gamma_p(df / 2.0, x / 2.0)).clamp(0.0, 1.0)
}

/// Standard normal CDF via the regularized incomplete gamma relation
/// `Φ(z) = (1 + sgn(z) · P(1/2, z²/2)) / 2`.
pub(crate) fn normal_cdf(z: f64) -> f64 {
    let p = regularized_gamma_p(0.5, z * z / 2.0);
    if z >= 0.0 {
        0.5 * (1.0 + p)
    } else {
        0.5 * (1.0 - p)
    }
}

/// Natural log of the gamma function, Lanczos approximation (g = 7).
fn ln_gamma(x: f64) -> f64 {
    const COEFFS: [f64; 8] = [
        676.520_368_121_885_1,
        -1_259.139_216_722_402_8,
        771.323_428_777_653_13,
        -176.615_029_162_140_59,
        12.507_343_278_686_905,
        -0.138_571_095_265_720_12,
        9.984_369_578_019_571_6e-6,
        1.505_632_735_149_311_6e-7,
    ];
    use std::f64::consts::PI;
    if x < 0.5 {
        // reflection formula
        PI.ln() - (PI * x).sin().abs().ln() - ln_gamma(1.0 - x)
    } else {
        let x = x - 1.0;
        let mut acc = 0.999_999_999_999_809_93;
        for (i, &c) in COEFFS.iter().enumerate() {
            acc += c / (x + (i + 1) as f64);
        }
        let t = x + 7.5;
        0.5 * (2.0 * PI).ln() + (x + 0.5) * t.ln() - t + acc.ln()
    }
}

/// Regularized lower incomplete gamma `P(a, x)`; series expansion for
/// `x < a + 1`, continued fraction otherwise.
fn regularized_gamma_p(a: f64, x: f64) -> f64 {
    const MAX_ITER: usize = 300;
    const EPS: f64 = 1e-14;
    if x <= 0.0 || a <= 0.0 {
        return 0.0;
    }
    let ln_prefactor = a * x.ln() - x - ln_gamma(a);
    if x < a + 1.0 {
        let mut ap = a;
        let mut term = 1.0 / a;
        let mut sum = term;
        for _ in 0..MAX_ITER {
            ap += 1.0;
            term *= x / ap;
            sum += term;
            if term.abs() < sum.abs() * EPS {
                break;
            }
        }
        (sum * ln_prefactor.exp()).clamp(0.0, 1.0)
    } else {
        const TINY: f64 = 1e-300;
        let mut b = x + 1.0 - a;
        let mut c = 1.0 / TINY;
        let mut d = 1.0 / b;
        let mut h = d;
        for i in 1..MAX_ITER {
            let an = -(i as f64) * (i as f64 - a);
            b += 2.0;
            d = an * d + b;
            if d.abs() < TINY {
                d = TINY;
            }
            c = b + an / c;
            if c.abs() < TINY {
                c = TINY;
            }
            d = 1.0 / d;
            let delta = d * c;
            h *= delta;
            if (delta - 1.0).abs() < EPS {
                break;
            }
        }
        (1.0 - ln_prefactor.exp() * h).clamp(0.0, 1.0)
    }
}

/// Regularized incomplete beta `I_x(a, b)` via the Lentz continued
/// fraction, using the symmetry relation for fast convergence.
fn regularized_beta(a: f64, b: f64, x: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }
    let ln_front =
        ln_gamma(a + b) - ln_gamma(a) - ln_gamma(b) + a * x.ln() + b * (1.0 - x).ln();
    let front = ln_front.exp();
    if x < (a + 1.0) / (a + b + 2.0) {
        front * beta_cf(a, b, x) / a
    } else {
        1.0 - front * beta_cf(b, a, 1.0 - x) / b
    }
}

/// Continued fraction for the incomplete beta function (modified Lentz).
fn beta_cf(a: f64, b: f64, x: f64) -> f64 {
    const MAX_ITER: usize = 300;
    const EPS: f64 = 1e-14;
    const TINY: f64 = 1e-300;

    let qab = a + b;
    let qap = a + 1.0;
    let qam = a - 1.0;
    let mut c = 1.0;
    let mut d = 1.0 - qab * x / qap;
    if d.abs() < TINY {
        d = TINY;
    }
    d = 1.0 / d;
    let mut h = d;
    for m in 1..=MAX_ITER {
        let m = m as f64;
        let m2 = 2.0 * m;
        let aa = m * (b - m) * x / ((qam + m2) * (a + m2));
        d = 1.0 + aa * d;
        if d.abs() < TINY {
            d = TINY;
        }
        c = 1.0 + aa / c;
        if c.abs() < TINY {
            c = TINY;
        }
        d = 1.0 / d;
        h *= d * c;
        let aa = -(a + m) * (qab + m) * x / ((a + m2) * (qap + m2));
        d = 1.0 + aa * d;
        if d.abs() < TINY {
            d = TINY;
        }
        c = 1.0 + aa / c;
        if c.abs() < TINY {
            c = TINY;
        }
        d = 1.0 / d;
        let delta = d * c;
        h *= delta;
        if (delta - 1.0).abs() < EPS {
            break;
        }
    }
    h
}

// ── Moments ───────────────────────────────────────────────────────────

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn sample_variance(values: &[f64], mean: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64
}

// ── Tests ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() < tol
    }

    // ── Distribution functions ────────────────────────────────────

    #[test]
    fn ln_gamma_matches_factorials() {
        assert!(close(ln_gamma(5.0), 24f64.ln(), 1e-10));
        assert!(close(ln_gamma(1.0), 0.0, 1e-10));
        assert!(close(ln_gamma(0.5), std::f64::consts::PI.sqrt().ln(), 1e-10));
    }

    #[test]
    fn normal_cdf_reference_points() {
        assert!(close(normal_cdf(0.0), 0.5, 1e-12));
        assert!(close(normal_cdf(1.959964), 0.975, 1e-5));
        assert!(close(normal_cdf(-1.959964), 0.025, 1e-5));
        assert!(close(normal_cdf(1.281552), 0.9, 1e-5));
    }

    #[test]
    fn t_p_value_at_critical_points() {
        // two-sided critical values at alpha = 0.05
        assert!(close(student_t_p_two_sided(2.228139, 10.0), 0.05, 5e-5));
        assert!(close(student_t_p_two_sided(2.085963, 20.0), 0.05, 5e-5));
        // large df approaches the normal distribution
        assert!(close(student_t_p_two_sided(1.959964, 1e6), 0.05, 1e-4));
        assert!(close(student_t_p_two_sided(0.0, 7.0), 1.0, 1e-12));
    }

    #[test]
    fn chi_squared_sf_at_critical_points() {
        assert!(close(chi_squared_sf(3.841459, 1.0), 0.05, 5e-5));
        assert!(close(chi_squared_sf(5.991465, 2.0), 0.05, 5e-5));
        assert!(close(chi_squared_sf(7.814728, 3.0), 0.05, 5e-5));
        // df = 2 has the closed form exp(-x/2)
        assert!(close(chi_squared_sf(4.6, 2.0), (-2.3f64).exp(), 1e-8));
        assert!(close(chi_squared_sf(0.0, 4.0), 1.0, 1e-12));
    }

    // ── Ranking ──────────────────────────────────────────────────

    #[test]
    fn midranks_average_ties() {
        let (ranks, tie_sum) = midranks(&[3.0, 1.0, 2.0, 2.0]);
        assert_eq!(ranks, vec![4.0, 1.0, 2.5, 2.5]);
        assert_eq!(tie_sum, 6.0); // one tie group of 2: 2³ - 2
    }

    #[test]
    fn midranks_no_ties() {
        let (ranks, tie_sum) = midranks(&[10.0, 30.0, 20.0]);
        assert_eq!(ranks, vec![1.0, 3.0, 2.0]);
        assert_eq!(tie_sum, 0.0);
    }

    // ── t-tests ──────────────────────────────────────────────────

    #[test]
    fn pooled_t_hand_computed() {
        // means 3 and 4, both variances 2.5, pooled se = 1
        let a = [1.0, 2.0, 3.0, 4.0, 5.0];
        let b = [2.0, 3.0, 4.0, 5.0, 6.0];
        let r = student_t(&a, &b).unwrap();
        assert!(close(r.statistic, -1.0, 1e-12));
        assert_eq!(r.df, 8.0);
        assert!(close(r.p_value, 0.3466, 5e-3));
    }

    #[test]
    fn pooled_t_identical_groups() {
        let a = [1.0, 2.0, 3.0];
        let r = student_t(&a, &a).unwrap();
        assert!(close(r.statistic, 0.0, 1e-12));
        assert!(close(r.p_value, 1.0, 1e-12));
    }

    #[test]
    fn pooled_t_rejects_degenerate_input() {
        assert!(student_t(&[1.0], &[2.0, 3.0]).is_none());
        assert!(student_t(&[2.0, 2.0], &[2.0, 2.0]).is_none());
    }

    #[test]
    fn paired_t_hand_computed() {
        // differences: 0, -1, 1, -1, -1 → mean -0.4, se 0.4
        let a = [1.0, 2.0, 3.0, 4.0, 5.0];
        let b = [1.0, 3.0, 2.0, 5.0, 6.0];
        let r = paired_t(&a, &b).unwrap();
        assert!(close(r.statistic, -1.0, 1e-12));
        assert_eq!(r.df, 4.0);
        assert!(close(r.p_value, 0.374, 5e-3));
    }

    #[test]
    fn paired_t_constant_differences() {
        let a = [1.0, 2.0, 3.0];
        let b = [2.0, 3.0, 4.0];
        assert!(paired_t(&a, &b).is_none());
    }

    #[test]
    fn paired_t_length_mismatch() {
        assert!(paired_t(&[1.0, 2.0], &[1.0]).is_none());
    }

    // ── Rank tests ───────────────────────────────────────────────

    #[test]
    fn mann_whitney_hand_computed() {
        // ranks of a in the combined sample: 1, 2 → U1 = 0
        let a = [1.0, 2.0];
        let b = [3.0, 4.0];
        let r = mann_whitney(&a, &b).unwrap();
        assert!(close(r.statistic, 0.0, 1e-12));
        // z = (2 - 0.5) / sqrt(5/3)
        assert!(close(r.p_value, 0.2453, 2e-3));
    }

    #[test]
    fn mann_whitney_with_ties() {
        let a = [3.0, 4.0, 2.0, 6.0, 2.0, 5.0];
        let b = [9.0, 7.0, 5.0, 10.0, 8.0, 6.0];
        let r = mann_whitney(&a, &b).unwrap();
        assert!(close(r.statistic, 2.0, 1e-12));
        assert!(r.p_value < 0.05);
    }

    #[test]
    fn mann_whitney_all_identical() {
        let a = [5.0, 5.0];
        let b = [5.0, 5.0, 5.0];
        let r = mann_whitney(&a, &b).unwrap();
        assert!(close(r.p_value, 1.0, 1e-12));
    }

    #[test]
    fn kruskal_wallis_hand_computed() {
        // no ties: H = 32/7, p = exp(-16/7) on 2 df
        let g1 = [1.0, 2.0];
        let g2 = [3.0, 4.0];
        let g3 = [5.0, 6.0];
        let r = kruskal_wallis(&[&g1, &g2, &g3]).unwrap();
        assert!(close(r.statistic, 32.0 / 7.0, 1e-10));
        assert_eq!(r.df, 2.0);
        assert!(close(r.p_value, (-16.0f64 / 7.0).exp(), 1e-8));
    }

    #[test]
    fn kruskal_wallis_needs_two_nonempty_groups() {
        let g = [1.0, 2.0];
        assert!(kruskal_wallis(&[&g]).is_none());
        assert!(kruskal_wallis(&[&g, &[]]).is_none());
    }

    #[test]
    fn kruskal_wallis_all_tied() {
        let g1 = [2.0, 2.0];
        let g2 = [2.0, 2.0];
        let r = kruskal_wallis(&[&g1, &g2]).unwrap();
        assert!(close(r.p_value, 1.0, 1e-12));
    }
}
