//! Noise Variance Sweep
//!
//! One simulation per noise variance over the same seeded channel, producing
//! the BER curve points a plotting front end consumes.

use crate::driver::{DriverConfig, MonteCarloDriver, SimulationReport};
use crate::SimulationError;
use channel::ModelConfig;
use common::linear_to_db;
use tracing::info;

/// Run `num_iterations` trials at every noise variance in turn
pub async fn run_noise_sweep(
    config: &ModelConfig,
    noise_variances: &[f64],
    num_iterations: usize,
    num_workers: usize,
    driver_config: DriverConfig,
) -> Result<Vec<(f64, SimulationReport)>, SimulationError> {
    if noise_variances.is_empty() {
        return Err(SimulationError::InvalidParameter("noise sweep needs at least one variance".to_string()));
    }

    info!(
        "Noise sweep over {} points ({} trials each)",
        noise_variances.len(),
        num_iterations
    );

    let mut points = Vec::with_capacity(noise_variances.len());
    for &noise_variance in noise_variances {
        let model = config.with_noise_variance(noise_variance).build()?;
        let report = MonteCarloDriver::new(model)
            .with_config(driver_config)
            .run(num_iterations, num_workers)
            .await?;
        info!(
            "  noise variance {:.4e} (SNR {:.1} dB): BER {:.6}",
            noise_variance,
            linear_to_db(1.0 / noise_variance),
            report.average_ber
        );
        points.push((noise_variance, report));
    }
    Ok(points)
}
