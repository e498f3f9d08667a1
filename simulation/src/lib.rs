//! Monte-Carlo BER Simulation
//!
//! Runs many independent channel trials over a bounded tokio worker pool
//! and aggregates their bit error rates.

pub mod config;
pub mod driver;
pub mod sweep;

pub use config::{SimulationConfig, SweepConfig};
pub use driver::{
    run_single_trial, trial_rng, DriverConfig, MonteCarloDriver, SimulationReport, TrialFailurePolicy,
    DEFAULT_RUN_SEED,
};
pub use sweep::run_noise_sweep;

use channel::ChannelError;
use thiserror::Error;

/// Simulation errors
#[derive(Error, Debug)]
pub enum SimulationError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Trial {trial} failed: {source}")]
    TrialFailure {
        trial: usize,
        #[source]
        source: ChannelError,
    },

    #[error("Worker panicked: {0}")]
    WorkerPanicked(String),

    #[error("All {failed} trials failed")]
    AllTrialsFailed { failed: usize },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Channel error: {0}")]
    Channel(#[source] ChannelError),
}

impl From<ChannelError> for SimulationError {
    fn from(err: ChannelError) -> Self {
        match err {
            ChannelError::InvalidParameter(msg) => SimulationError::InvalidParameter(msg),
            other => SimulationError::Channel(other),
        }
    }
}

impl From<common::InvalidParameter> for SimulationError {
    fn from(err: common::InvalidParameter) -> Self {
        SimulationError::InvalidParameter(err.0)
    }
}

impl From<toml::de::Error> for SimulationError {
    fn from(err: toml::de::Error) -> Self {
        SimulationError::Config(err.to_string())
    }
}

impl From<std::io::Error> for SimulationError {
    fn from(err: std::io::Error) -> Self {
        SimulationError::Config(err.to_string())
    }
}
