//! Statistical functions for column profiling.
//!
//! All functions take the non-missing values of a column. Statistics that are
//! undefined for the input (too few values, zero variance) return `None`
//! instead of NaN.

use std::collections::HashSet;

/// Arithmetic mean. `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Whether all values are equal (zero variance).
fn is_constant(values: &[f64]) -> bool {
    values.windows(2).all(|w| w[0] == w[1])
}

/// Sum of `(v - mean)^power` over all values.
fn central_sum(values: &[f64], mean: f64, power: i32) -> f64 {
    values.iter().map(|v| (v - mean).powi(power)).sum()
}

/// Sample standard deviation (ddof = 1). `None` for fewer than two values.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let variance = central_sum(values, m, 2) / (values.len() as f64 - 1.0);
    Some(variance.sqrt())
}

/// Population standard deviation (ddof = 0), as used for z-scores.
pub fn population_std(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    Some((central_sum(values, m, 2) / values.len() as f64).sqrt())
}

/// Quantile of already sorted values, with linear interpolation between the
/// closest ranks.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let position = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

/// Values sorted ascending. NaN must already be filtered out.
pub fn sorted(values: &[f64]) -> Vec<f64> {
    let mut out = values.to_vec();
    out.sort_by(|a, b| a.total_cmp(b));
    out
}

/// Bias-corrected sample skewness (adjusted Fisher-Pearson G1).
///
/// Undefined for fewer than three values or zero variance.
pub fn skewness(values: &[f64]) -> Option<f64> {
    let n = values.len() as f64;
    if values.len() < 3 {
        return None;
    }
    if is_constant(values) {
        return None;
    }
    let m = mean(values)?;
    let m2 = central_sum(values, m, 2) / n;
    let m3 = central_sum(values, m, 3) / n;
    let g1 = m3 / m2.powf(1.5);
    Some(g1 * (n * (n - 1.0)).sqrt() / (n - 2.0))
}

/// Bias-corrected sample excess kurtosis (G2). A normal distribution scores 0.
///
/// Undefined for fewer than four values or zero variance.
pub fn kurtosis(values: &[f64]) -> Option<f64> {
    let n = values.len() as f64;
    if values.len() < 4 {
        return None;
    }
    if is_constant(values) {
        return None;
    }
    let m = mean(values)?;
    let s2 = central_sum(values, m, 2);
    let s4 = central_sum(values, m, 4);
    let adj = (n + 1.0) * n * (n - 1.0) / ((n - 2.0) * (n - 3.0));
    let correction = 3.0 * (n - 1.0).powi(2) / ((n - 2.0) * (n - 3.0));
    Some(adj * s4 / (s2 * s2) - correction)
}

/// Standard deviation as a percentage of the mean; `0` for a zero mean.
pub fn coefficient_of_variation(std: Option<f64>, mean: f64) -> Option<f64> {
    if mean == 0.0 {
        return Some(0.0);
    }
    std.map(|s| s / mean * 100.0)
}

/// Number of distinct values, comparing by bit pattern.
pub fn distinct_count(values: &[f64]) -> usize {
    values
        .iter()
        .map(|v| if *v == 0.0 { 0.0f64.to_bits() } else { v.to_bits() })
        .collect::<HashSet<_>>()
        .len()
}

/// Whether every value is a whole number.
pub fn all_integral(values: &[f64]) -> bool {
    values.iter().all(|v| v.is_finite() && v.fract() == 0.0)
}

/// Equal-width histogram over the observed range.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    /// Values per bucket.
    pub counts: Vec<usize>,
    /// Bucket edges, one more than the number of buckets.
    pub edges: Vec<f64>,
}

impl Histogram {
    /// Bin `values` into `bins` equal-width buckets spanning `[min, max]`.
    ///
    /// Every bucket is closed on the left and open on the right, except the
    /// last, which also includes `max`. A constant column is binned over
    /// `[v - 0.5, v + 0.5]`.
    pub fn compute(values: &[f64], bins: usize) -> Option<Self> {
        if values.is_empty() || bins == 0 {
            return None;
        }

        let (mut lo, mut hi) = values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(*v), hi.max(*v))
            });
        if !lo.is_finite() || !hi.is_finite() {
            return None;
        }
        if lo == hi {
            lo -= 0.5;
            hi += 0.5;
        }

        let width = (hi - lo) / bins as f64;
        let edges: Vec<f64> = (0..=bins)
            .map(|i| if i == bins { hi } else { lo + width * i as f64 })
            .collect();

        let mut counts = vec![0usize; bins];
        for &v in values {
            let mut idx = (((v - lo) / (hi - lo)) * bins as f64).floor() as usize;
            idx = idx.min(bins - 1);
            // Rounding in the division can land one bucket off the edges.
            while idx > 0 && v < edges[idx] {
                idx -= 1;
            }
            while idx < bins - 1 && v >= edges[idx + 1] {
                idx += 1;
            }
            counts[idx] += 1;
        }

        Some(Self { counts, edges })
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }
}

/// Shannon entropy, in nats, of a distribution given by its counts.
///
/// `None` when the counts sum to zero.
pub fn shannon_entropy(counts: &[usize]) -> Option<f64> {
    let total: usize = counts.iter().sum();
    if total == 0 {
        return None;
    }
    let total = total as f64;
    let entropy = counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / total;
            -p * p.ln()
        })
        .sum::<f64>();
    Some(entropy.max(0.0))
}

/// Absolute z-score of each value against the population mean and std.
///
/// `None` for empty input or zero variance, where every score is undefined.
pub fn abs_zscores(values: &[f64]) -> Option<Vec<f64>> {
    if is_constant(values) {
        return None;
    }
    let m = mean(values)?;
    let std = population_std(values)?;
    Some(values.iter().map(|v| ((v - m) / std).abs()).collect())
}

/// Pearson correlation of paired observations. `None` for fewer than two
/// pairs or when either side has zero variance.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let mx = mean(xs)?;
    let my = mean(ys)?;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mx;
        let dy = y - my;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx == 0.0 || syy == 0.0 {
        return None;
    }
    Some((sxy / (sxx.sqrt() * syy.sqrt())).clamp(-1.0, 1.0))
}
