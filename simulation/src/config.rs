//! Simulation Configuration
//!
//! TOML description of a simulation run: the channel model, the run size and
//! an optional noise sweep given as explicit variances or SNR points.

use crate::driver::{DriverConfig, MonteCarloDriver, SimulationReport, TrialFailurePolicy, DEFAULT_RUN_SEED};
use crate::sweep::run_noise_sweep;
use crate::SimulationError;
use channel::ModelConfig;
use common::noise_variance_from_snr_db;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Complete simulation run description
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SimulationConfig {
    /// Channel model
    pub model: ModelConfig,
    /// Monte-Carlo trials per run
    #[serde(default = "default_num_iterations")]
    pub num_iterations: usize,
    /// Concurrent workers
    #[serde(default = "default_num_workers")]
    pub num_workers: usize,
    /// Seed of the per-trial generators
    #[serde(default = "default_run_seed")]
    pub run_seed: u64,
    /// Handling of failed trials
    #[serde(default)]
    pub failure_policy: TrialFailurePolicy,
    /// Optional noise sweep
    #[serde(default)]
    pub sweep: Option<SweepConfig>,
}

/// Noise sweep points
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct SweepConfig {
    /// Explicit noise variances
    #[serde(default)]
    pub noise_variances: Vec<f64>,
    /// SNR points in dB, converted for unit-power symbols
    #[serde(default)]
    pub snr_db: Vec<f64>,
}

fn default_num_iterations() -> usize {
    1000
}

fn default_num_workers() -> usize {
    4
}

fn default_run_seed() -> u64 {
    DEFAULT_RUN_SEED
}

impl SweepConfig {
    /// Explicit variances followed by the converted SNR points
    pub fn noise_variances(&self) -> Vec<f64> {
        self.noise_variances
            .iter()
            .copied()
            .chain(self.snr_db.iter().map(|&snr| noise_variance_from_snr_db(snr)))
            .collect()
    }
}

impl SimulationConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(contents: &str) -> Result<Self, SimulationError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, SimulationError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        info!("Loaded simulation config from {}", path.display());
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<(), SimulationError> {
        if self.num_iterations == 0 {
            return Err(SimulationError::Config("num_iterations must be positive".to_string()));
        }
        if self.num_workers == 0 {
            return Err(SimulationError::Config("num_workers must be positive".to_string()));
        }
        if let Some(sweep) = &self.sweep {
            if sweep.noise_variances.is_empty() && sweep.snr_db.is_empty() {
                return Err(SimulationError::Config("sweep has no points".to_string()));
            }
        }
        Ok(())
    }

    pub fn driver_config(&self) -> DriverConfig {
        DriverConfig {
            run_seed: self.run_seed,
            failure_policy: self.failure_policy,
        }
    }

    /// Run the configured model once
    pub async fn run(&self) -> Result<SimulationReport, SimulationError> {
        let model = self.model.build()?;
        MonteCarloDriver::new(model)
            .with_config(self.driver_config())
            .run(self.num_iterations, self.num_workers)
            .await
    }

    /// Run the configured sweep
    pub async fn run_sweep(&self) -> Result<Vec<(f64, SimulationReport)>, SimulationError> {
        let sweep = self
            .sweep
            .as_ref()
            .ok_or_else(|| SimulationError::Config("no sweep configured".to_string()))?;
        run_noise_sweep(
            &self.model,
            &sweep.noise_variances(),
            self.num_iterations,
            self.num_workers,
            self.driver_config(),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use channel::{SingularChannelPolicy, TopologyConfig};
    use common::{ChannelType, ModulationType};

    const RAS_CONFIG: &str = r#"
        num_iterations = 12
        num_workers = 3
        run_seed = 9
        failure_policy = "isolate"

        [model]
        channel_type = "rician"
        modulation_type = "qpsk"
        noise_variance = 0.2
        singular_policy = "pseudo_inverse"

        [model.topology]
        kind = "ras"
        num_subcarriers = 8
        num_symbols = 4
        num_antennas = 2

        [sweep]
        noise_variances = [0.0, 0.5]
        snr_db = [10.0]
    "#;

    #[test]
    fn test_parse_full_config() {
        let config = SimulationConfig::from_toml_str(RAS_CONFIG).unwrap();
        assert_eq!(config.num_iterations, 12);
        assert_eq!(config.num_workers, 3);
        assert_eq!(config.failure_policy, TrialFailurePolicy::Isolate);
        assert_eq!(config.model.channel_type, ChannelType::Rician);
        assert_eq!(config.model.singular_policy, SingularChannelPolicy::PseudoInverse);
        assert_eq!(
            config.model.topology,
            TopologyConfig::Ras {
                num_subcarriers: 8,
                num_symbols: 4,
                num_antennas: 2
            }
        );

        let variances = config.sweep.as_ref().unwrap().noise_variances();
        assert_eq!(variances.len(), 3);
        assert_eq!(&variances[..2], &[0.0, 0.5]);
        assert!((variances[2] - 0.1).abs() < 1e-12);

        let driver = config.driver_config();
        assert_eq!(driver.run_seed, 9);
        assert_eq!(driver.failure_policy, TrialFailurePolicy::Isolate);
    }

    #[test]
    fn test_defaults() {
        let config = SimulationConfig::from_toml_str(
            r#"
            [model]
            channel_type = "rayleigh"
            modulation_type = "64qam"

            [model.topology]
            kind = "mimo"
            num_tx_antennas = 2
            num_rx_antennas = 2
            "#,
        )
        .unwrap();
        assert_eq!(config.num_iterations, 1000);
        assert_eq!(config.num_workers, 4);
        assert_eq!(config.run_seed, DEFAULT_RUN_SEED);
        assert_eq!(config.failure_policy, TrialFailurePolicy::AbortAll);
        assert_eq!(config.model.modulation_type, ModulationType::Qam64);
        assert!(config.sweep.is_none());
    }

    #[test]
    fn test_invalid_configs() {
        let bad_modulation = RAS_CONFIG.replace("\"qpsk\"", "\"256qam\"");
        assert!(matches!(
            SimulationConfig::from_toml_str(&bad_modulation),
            Err(SimulationError::Config(_))
        ));

        let no_workers = RAS_CONFIG.replace("num_workers = 3", "num_workers = 0");
        assert!(matches!(
            SimulationConfig::from_toml_str(&no_workers),
            Err(SimulationError::Config(_))
        ));

        assert!(matches!(
            SimulationConfig::from_toml_file("/nonexistent/simulation.toml"),
            Err(SimulationError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_run_and_sweep_from_config() {
        let config = SimulationConfig::from_toml_str(RAS_CONFIG).unwrap();

        let report = config.run().await.unwrap();
        assert_eq!(report.trials_completed, 12);
        assert!((0.0..=1.0).contains(&report.average_ber));

        let points = config.run_sweep().await.unwrap();
        assert_eq!(points.len(), 3);
        assert_eq!(points[0].1.average_ber, 0.0);
    }
}
