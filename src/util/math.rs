use bio::stats::{LogProb, Prob};
use std::f64::consts::LN_10;

/// Returns the index of the largest value, keeping the first one on ties.
/// Returns None for an empty slice.
/// # Arguments
/// * `values` - the values to scan
pub fn max_element_index(values: &[f64]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some(b) if v <= values[b] => {},
            _ => best = Some(i)
        }
    }
    best
}

/// Converts a log10-scaled value into a natural log probability
pub fn log10_to_log_prob(log10_value: f64) -> LogProb {
    LogProb(log10_value * LN_10)
}

/// Converts a natural log probability back into log10 scale
pub fn log_prob_to_log10(log_prob: LogProb) -> f64 {
    *log_prob / LN_10
}

/// Computes log10(sum(10^v)) without leaving the log domain.
/// Returns negative infinity for an empty slice or when every value is negative infinity.
/// # Arguments
/// * `log10_values` - log10-scaled values
pub fn log10_sum_exp(log10_values: &[f64]) -> f64 {
    let log_probs: Vec<LogProb> = log10_values.iter()
        .map(|&v| log10_to_log_prob(v))
        .collect();
    log_prob_to_log10(LogProb::ln_sum_exp(&log_probs))
}

/// Converts log10-scaled values into a normalized probability distribution.
/// If nothing has support, the result is uniform.
/// # Arguments
/// * `log10_values` - log10-scaled values
pub fn normalize_from_log10<const N: usize>(log10_values: &[f64; N]) -> [f64; N] {
    let log_probs: [LogProb; N] = log10_values.map(log10_to_log_prob);
    let total = LogProb::ln_sum_exp(&log_probs);
    if total == LogProb::ln_zero() {
        return [1.0 / N as f64; N];
    }
    log_probs.map(|lp| *Prob::from(LogProb(*lp - *total)))
}
