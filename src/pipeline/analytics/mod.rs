//! Shared statistics helpers for the aggregator stages.

pub mod basic;
pub mod employer_job;
pub mod sector;

/// Percentile by linear interpolation over a sorted sample: the estimate at
/// quantile `q` sits at rank `q * (n - 1)`, interpolated between the two
/// surrounding order statistics. Matches the conventional "linear" method,
/// so p50 of [1, 2, 3, 4] is 2.5.
pub fn percentile(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let rank = q.clamp(0.0, 1.0) * (n - 1) as f64;
            let lo = rank.floor() as usize;
            let hi = rank.ceil() as usize;
            if lo == hi {
                sorted[lo]
            } else {
                let weight = rank - lo as f64;
                sorted[lo] + (sorted[hi] - sorted[lo]) * weight
            }
        }
    }
}

pub fn median(sorted: &[f64]) -> f64 {
    percentile(sorted, 0.5)
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Sort a compensation sample for percentile estimation. NaN cannot occur
/// (ingest coerces every numeric field), so total ordering is safe.
pub fn sorted_sample(mut values: Vec<f64>) -> Vec<f64> {
    values.sort_by(|a, b| a.total_cmp(b));
    values
}
