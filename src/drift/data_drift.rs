//! Statistical tests for data drift
//!
//! Pure functions comparing a reference sample against a current sample:
//! two-sample Kolmogorov-Smirnov, Population Stability Index, chi-squared
//! goodness-of-fit for categories and Jensen-Shannon distance. None of them
//! hold state; all of them fail fast on empty input.

use crate::error::{DriftError, Result};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ChiSquared, ContinuousCDF};
use std::collections::HashMap;
use std::f64::consts::PI;
use std::hash::Hash;

/// Additive smoothing applied to each density bin before renormalising
const JS_SMOOTHING: f64 = 1e-10;

/// Statistic and right-tail p-value of a hypothesis test
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TestOutcome {
    /// Test statistic
    pub statistic: f64,
    /// Probability of a statistic at least this extreme under the null
    pub p_value: f64,
}

/// Two-sample Kolmogorov-Smirnov test.
///
/// The statistic is the supremum of the absolute difference between the two
/// empirical CDFs, in `[0, 1]`. The p-value comes from the asymptotic
/// Kolmogorov distribution evaluated at `D * sqrt(n*m / (n+m))`.
pub fn ks_test(reference: &[f64], current: &[f64]) -> Result<TestOutcome> {
    ensure_non_empty(reference, current, "KS test")?;

    let mut ref_sorted = reference.to_vec();
    let mut cur_sorted = current.to_vec();
    ref_sorted.sort_by(f64::total_cmp);
    cur_sorted.sort_by(f64::total_cmp);

    let statistic = ks_statistic(&ref_sorted, &cur_sorted);

    let n1 = ref_sorted.len() as f64;
    let n2 = cur_sorted.len() as f64;
    let en = (n1 * n2 / (n1 + n2)).sqrt();
    let p_value = kolmogorov_sf(statistic * en);

    Ok(TestOutcome { statistic, p_value })
}

/// Maximum ECDF gap between two sorted samples.
///
/// Walks both samples once, stepping past every copy of the smallest pending
/// value before comparing, so ties never open a spurious gap.
fn ks_statistic(ref_sorted: &[f64], cur_sorted: &[f64]) -> f64 {
    let n1 = ref_sorted.len();
    let n2 = cur_sorted.len();
    let (mut i, mut j) = (0usize, 0usize);
    let mut max_diff = 0.0_f64;

    while i < n1 && j < n2 {
        let x = ref_sorted[i].min(cur_sorted[j]);
        while i < n1 && ref_sorted[i] <= x {
            i += 1;
        }
        while j < n2 && cur_sorted[j] <= x {
            j += 1;
        }
        let diff = (i as f64 / n1 as f64 - j as f64 / n2 as f64).abs();
        max_diff = max_diff.max(diff);
    }

    max_diff.clamp(0.0, 1.0)
}

/// Survival function of the Kolmogorov distribution, `P(K > z)`.
fn kolmogorov_sf(z: f64) -> f64 {
    if !(z > 0.0) {
        return 1.0;
    }

    let p = if z < 1.18 {
        // CDF series converges fast for small z
        let t = (-PI * PI / (8.0 * z * z)).exp();
        let cdf = (2.0 * PI).sqrt() / z * (t + t.powi(9) + t.powi(25) + t.powi(49));
        1.0 - cdf
    } else {
        let t = (-2.0 * z * z).exp();
        2.0 * (t - t.powi(4) + t.powi(9) - t.powi(16))
    };

    p.clamp(0.0, 1.0)
}

/// Population Stability Index over `n_bins` equal-width bins spanning the
/// joint range of both samples.
///
/// Bin proportions use additive smoothing, `(count + 1) / (N + n_bins)`, so
/// no bin is ever zero and the result is always finite.
pub fn psi(reference: &[f64], current: &[f64], n_bins: usize) -> Result<f64> {
    ensure_non_empty(reference, current, "PSI")?;
    ensure_bins(n_bins)?;

    let (min_val, max_val) = joint_range(reference, current);
    let edges = equal_width_edges(min_val, max_val, n_bins);

    let ref_props = smoothed_proportions(&bin_counts(reference, &edges), reference.len());
    let cur_props = smoothed_proportions(&bin_counts(current, &edges), current.len());

    let psi: f64 = ref_props
        .iter()
        .zip(cur_props.iter())
        .map(|(&p_ref, &p_cur)| (p_cur - p_ref) * (p_cur / p_ref).ln())
        .sum();

    Ok(psi)
}

fn smoothed_proportions(counts: &[u64], n: usize) -> Vec<f64> {
    let denom = (n + counts.len()) as f64;
    counts.iter().map(|&c| (c as f64 + 1.0) / denom).collect()
}

/// Chi-squared goodness-of-fit test between two categorical samples.
///
/// Categories are the union of both samples, each count is smoothed by +1,
/// and the smoothed reference counts (rescaled to the current total) are the
/// expected frequencies. Degrees of freedom are `k - 1`; with a single
/// category there is nothing to test and the p-value is 1.
pub fn chi_squared<T: Eq + Hash>(reference: &[T], current: &[T]) -> Result<TestOutcome> {
    if reference.is_empty() || current.is_empty() {
        return Err(DriftError::EmptyInput(
            "Cannot perform chi-squared test on empty data".to_string(),
        ));
    }

    // [reference, current] counts per category, in first-seen order
    let mut index: HashMap<&T, usize> = HashMap::new();
    let mut counts: Vec<[f64; 2]> = Vec::new();
    for (side, sample) in [reference, current].into_iter().enumerate() {
        for value in sample {
            let slot = *index.entry(value).or_insert_with(|| {
                counts.push([0.0, 0.0]);
                counts.len() - 1
            });
            counts[slot][side] += 1.0;
        }
    }

    let expected_total: f64 = counts.iter().map(|c| c[0] + 1.0).sum();
    let observed_total: f64 = counts.iter().map(|c| c[1] + 1.0).sum();
    let scale = observed_total / expected_total;

    let statistic: f64 = counts
        .iter()
        .map(|c| {
            let expected = (c[0] + 1.0) * scale;
            let observed = c[1] + 1.0;
            (observed - expected).powi(2) / expected
        })
        .sum();

    let k = counts.len();
    if k < 2 {
        return Ok(TestOutcome { statistic, p_value: 1.0 });
    }

    let dist = ChiSquared::new((k - 1) as f64)
        .map_err(|e| DriftError::ComputationError(e.to_string()))?;
    let p_value = dist.sf(statistic).clamp(0.0, 1.0);

    Ok(TestOutcome { statistic, p_value })
}

/// Jensen-Shannon distance between binned density estimates.
///
/// Histograms are density-normalised, smoothed by `1e-10` per bin and
/// renormalised to probability mass. Divergence uses the natural log, so the
/// distance is bounded by `sqrt(ln 2)` rather than 1.
pub fn jensen_shannon_distance(reference: &[f64], current: &[f64], n_bins: usize) -> Result<f64> {
    ensure_non_empty(reference, current, "Jensen-Shannon distance")?;
    ensure_bins(n_bins)?;

    let (min_val, max_val) = joint_range(reference, current);
    let edges = equal_width_edges(min_val, max_val, n_bins);

    let p = density_mass(reference, &edges);
    let q = density_mass(current, &edges);
    let m: Vec<f64> = p.iter().zip(q.iter()).map(|(&pi, &qi)| 0.5 * (pi + qi)).collect();

    let js = 0.5 * (kl_divergence(&p, &m) + kl_divergence(&q, &m));
    Ok(js.max(0.0).sqrt())
}

fn density_mass(data: &[f64], edges: &[f64]) -> Vec<f64> {
    let n_bins = edges.len() - 1;
    let width = (edges[n_bins] - edges[0]) / n_bins as f64;
    // Zero-width bins carry no density; treat them as unit width
    let width = if width > 0.0 { width } else { 1.0 };
    let n = data.len() as f64;

    let density: Vec<f64> = bin_counts(data, edges)
        .into_iter()
        .map(|c| c as f64 / (n * width))
        .collect();
    let total: f64 = density.iter().sum::<f64>() + JS_SMOOTHING * n_bins as f64;

    density.into_iter().map(|d| (d + JS_SMOOTHING) / total).collect()
}

fn kl_divergence(p: &[f64], q: &[f64]) -> f64 {
    p.iter()
        .zip(q.iter())
        .map(|(&pi, &qi)| if pi > 0.0 { pi * (pi / qi).ln() } else { 0.0 })
        .sum()
}

/// `n_bins + 1` equally spaced edges from `min_val` to `max_val` inclusive
pub(crate) fn equal_width_edges(min_val: f64, max_val: f64, n_bins: usize) -> Vec<f64> {
    let span = max_val - min_val;
    (0..=n_bins)
        .map(|i| {
            if i == n_bins {
                max_val
            } else {
                min_val + span * i as f64 / n_bins as f64
            }
        })
        .collect()
}

/// Count values per bin. Bins are half-open `[e_i, e_{i+1})` except the
/// last, which is closed. A degenerate range sends everything to the last bin.
pub(crate) fn bin_counts(data: &[f64], edges: &[f64]) -> Vec<u64> {
    let n_bins = edges.len() - 1;
    let mut counts = vec![0u64; n_bins];
    for &value in data {
        counts[bin_index(value, edges)] += 1;
    }
    counts
}

fn bin_index(value: f64, edges: &[f64]) -> usize {
    let n_bins = edges.len() - 1;
    let first = edges[0];
    let last = edges[n_bins];
    if !(last > first) {
        return n_bins - 1;
    }

    let norm = n_bins as f64 / (last - first);
    let raw = ((value - first) * norm).floor();
    let mut idx = if raw <= 0.0 {
        0
    } else {
        (raw as usize).min(n_bins - 1)
    };

    // Correct for rounding in the scaled position
    if idx > 0 && value < edges[idx] {
        idx -= 1;
    } else if idx + 1 < n_bins && value >= edges[idx + 1] {
        idx += 1;
    }
    idx
}

fn joint_range(reference: &[f64], current: &[f64]) -> (f64, f64) {
    reference
        .iter()
        .chain(current.iter())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
}

fn ensure_non_empty(reference: &[f64], current: &[f64], test: &str) -> Result<()> {
    if reference.is_empty() || current.is_empty() {
        return Err(DriftError::EmptyInput(format!(
            "Cannot perform {} on empty data",
            test
        )));
    }
    Ok(())
}

fn ensure_bins(n_bins: usize) -> Result<()> {
    if n_bins == 0 {
        return Err(DriftError::InvalidParameter {
            name: "n_bins".to_string(),
            value: "0".to_string(),
            reason: "at least one bin is required".to_string(),
        });
    }
    Ok(())
}
