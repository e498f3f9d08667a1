//! Fading Channel Engine
//!
//! This crate implements the channel/equalization pipeline shared by the
//! RAS, OFDM and flat MIMO topologies: random signal generation, fading
//! channel synthesis, propagation, noise injection, zero-forcing
//! equalization and bit-error counting.

pub mod ber;
pub mod config;
pub mod equalizer;
pub mod matrix;
pub mod models;
pub mod noise;
pub mod propagation;
pub mod signal;

pub use ber::{calculate_ber, BerResult, SimulationRun};
pub use config::{ModelConfig, TopologyConfig};
pub use equalizer::SingularChannelPolicy;
pub use matrix::{ChannelDimensions, ChannelMatrix, FadingDistribution};
pub use models::{AnyChannelModel, MimoModel, ModelCore, OfdmModel, RasModel};
pub use signal::Signal;

use common::{ChannelType, ModulationType, Topology};
use rand::Rng;
use thiserror::Error;

/// Errors raised by the channel engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChannelError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Singular channel matrix on subcarrier {subcarrier} (conditioning {conditioning:.3e})")]
    SingularChannel { subcarrier: usize, conditioning: f64 },

    #[error("Channel matrix already generated")]
    ChannelAlreadyGenerated,
}

impl From<common::InvalidParameter> for ChannelError {
    fn from(err: common::InvalidParameter) -> Self {
        ChannelError::InvalidParameter(err.0)
    }
}

/// Capability set shared by every channel topology
///
/// Randomness is always drawn from the generator passed in, except for the
/// channel matrix, which each model draws once from its own seeded generator.
pub trait ChannelModel: Send + Sync {
    /// Topology tag of this model
    fn topology(&self) -> Topology;

    /// Shared parameters and the cached channel matrix
    fn core(&self) -> &ModelCore;

    /// Shape of a transmit signal
    fn signal_shape(&self) -> Vec<usize>;

    /// Dimensions of the channel matrix this model draws
    fn channel_dimensions(&self) -> ChannelDimensions;

    /// Pass a signal through the channel, materializing the matrix on first use
    fn apply_channel(&self, signal: &Signal) -> Result<Signal, ChannelError>;

    /// Zero-forcing estimate of the transmitted signal
    fn equalize_signal(&self, signal: &Signal) -> Result<Signal, ChannelError>;

    fn channel_type(&self) -> ChannelType {
        self.core().channel_type()
    }

    fn modulation_type(&self) -> ModulationType {
        self.core().modulation_type()
    }

    fn noise_variance(&self) -> f64 {
        self.core().noise_variance()
    }

    /// Draw a transmit signal from the modulation alphabet
    fn generate_random_signal<R: Rng + ?Sized>(&self, rng: &mut R) -> Signal {
        signal::generate_signal(self.modulation_type(), &self.signal_shape(), rng)
    }

    /// Materialize the channel matrix if needed and return it
    ///
    /// Concurrent callers block until the first one has finished drawing, so
    /// every caller observes the same fully-formed matrix.
    fn generate_channel_matrix(&self) -> &ChannelMatrix {
        self.core().channel_matrix_or_init(self.channel_dimensions())
    }

    /// Channel matrix, if it has been materialized
    fn channel_matrix(&self) -> Option<&ChannelMatrix> {
        self.core().channel_matrix()
    }

    /// Install an externally built channel matrix
    fn set_channel_matrix(&self, matrix: ChannelMatrix) -> Result<(), ChannelError> {
        self.core().install_channel_matrix(matrix, self.channel_dimensions())
    }

    /// Add complex Gaussian noise of the model's variance
    fn add_noise<R: Rng + ?Sized>(&self, signal: &Signal, rng: &mut R) -> Signal {
        self.core().noise().add_noise(signal, rng)
    }

    /// One Monte-Carlo trial: generate, propagate, add noise, equalize, count errors
    fn run_trial<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<SimulationRun, ChannelError> {
        let transmitted = self.generate_random_signal(rng);
        let received = self.apply_channel(&transmitted)?;
        let noisy = self.add_noise(&received, rng);
        let equalized = self.equalize_signal(&noisy)?;
        let ber = calculate_ber(&transmitted, &equalized)?;

        Ok(SimulationRun {
            transmitted,
            equalized,
            ber,
        })
    }
}
