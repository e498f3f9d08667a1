//! Common Utilities
//!
//! Provides numeric helpers used by the channel engine and the Monte-Carlo driver

use tracing::trace;

/// Arithmetic mean, `None` for an empty slice
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Wilson score interval for a binomial proportion at ~95% confidence
pub fn wilson_interval(errors: u64, total: u64) -> (f64, f64) {
    if total == 0 {
        return (0.0, 1.0);
    }

    const Z: f64 = 1.96;
    let n = total as f64;
    let p = errors as f64 / n;

    let z2 = Z * Z;
    let denominator = 1.0 + z2 / n;
    let center = (p + z2 / (2.0 * n)) / denominator;
    let half_width = Z * (p * (1.0 - p) / n + z2 / (4.0 * n * n)).sqrt() / denominator;

    ((center - half_width).max(0.0), (center + half_width).min(1.0))
}

/// Convert a power ratio in dB to linear scale
pub fn db_to_linear(db: f64) -> f64 {
    10f64.powf(db / 10.0)
}

/// Convert a linear power ratio to dB
pub fn linear_to_db(linear: f64) -> f64 {
    10.0 * linear.log10()
}

/// Noise variance giving the requested SNR for unit signal power
pub fn noise_variance_from_snr_db(snr_db: f64) -> f64 {
    let variance = 1.0 / db_to_linear(snr_db);
    trace!("SNR {} dB -> noise variance {:.6e}", snr_db, variance);
    variance
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[0.25]), Some(0.25));
        assert_eq!(mean(&[0.0, 0.5, 1.0]), Some(0.5));
    }

    #[test]
    fn test_wilson_interval() {
        let (lo, hi) = wilson_interval(0, 0);
        assert_eq!((lo, hi), (0.0, 1.0));

        let (lo, hi) = wilson_interval(50, 1000);
        assert!(lo < 0.05 && hi > 0.05);
        assert!(lo >= 0.0 && hi <= 1.0);

        // Zero observed errors still gives a non-degenerate upper bound
        let (lo, hi) = wilson_interval(0, 1000);
        assert_eq!(lo, 0.0);
        assert!(hi > 0.0 && hi < 0.01);
    }

    #[test]
    fn test_db_conversion() {
        assert!((db_to_linear(10.0) - 10.0).abs() < 1e-12);
        assert!((db_to_linear(0.0) - 1.0).abs() < 1e-12);
        assert!((linear_to_db(100.0) - 20.0).abs() < 1e-12);
        assert!((noise_variance_from_snr_db(10.0) - 0.1).abs() < 1e-12);
    }
}
