//! Flat MIMO Model
//!
//! A single `rx x tx` fading matrix, one transmit vector per trial, and
//! pseudo-inverse equalization (defined for any antenna counts).

use super::{require_positive, ModelCore};
use crate::equalizer::equalize_flat;
use crate::matrix::ChannelDimensions;
use crate::propagation::propagate_flat;
use crate::{ChannelError, ChannelModel, Signal};
use common::{ChannelType, ModulationType, Topology};
use tracing::info;

/// Flat-fading MIMO channel model
#[derive(Debug, Clone)]
pub struct MimoModel {
    num_tx_antennas: usize,
    num_rx_antennas: usize,
    core: ModelCore,
}

impl MimoModel {
    /// Create a flat MIMO model
    pub fn new(
        num_tx_antennas: usize,
        num_rx_antennas: usize,
        channel_type: ChannelType,
        modulation_type: ModulationType,
    ) -> Result<Self, ChannelError> {
        let model = Self {
            num_tx_antennas: require_positive("num_tx_antennas", num_tx_antennas)?,
            num_rx_antennas: require_positive("num_rx_antennas", num_rx_antennas)?,
            core: ModelCore::new(channel_type, modulation_type)?,
        };

        info!(
            "MIMO model: {}x{} (tx x rx), {} / {}",
            num_tx_antennas, num_rx_antennas, channel_type, modulation_type
        );
        Ok(model)
    }

    pub fn with_noise_variance(mut self, variance: f64) -> Result<Self, ChannelError> {
        self.core.set_noise_variance(variance)?;
        Ok(self)
    }

    pub fn with_channel_seed(mut self, seed: u64) -> Self {
        self.core.set_channel_seed(seed);
        self
    }

    pub fn num_tx_antennas(&self) -> usize {
        self.num_tx_antennas
    }

    pub fn num_rx_antennas(&self) -> usize {
        self.num_rx_antennas
    }
}

impl ChannelModel for MimoModel {
    fn topology(&self) -> Topology {
        Topology::Mimo
    }

    fn core(&self) -> &ModelCore {
        &self.core
    }

    fn signal_shape(&self) -> Vec<usize> {
        vec![self.num_tx_antennas, 1]
    }

    fn channel_dimensions(&self) -> ChannelDimensions {
        ChannelDimensions {
            subcarriers: None,
            rows: self.num_rx_antennas,
            cols: self.num_tx_antennas,
        }
    }

    fn apply_channel(&self, signal: &Signal) -> Result<Signal, ChannelError> {
        let matrix = self.generate_channel_matrix();
        propagate_flat(matrix, signal)
    }

    fn equalize_signal(&self, signal: &Signal) -> Result<Signal, ChannelError> {
        let matrix = self.generate_channel_matrix();
        equalize_flat(matrix, signal)
    }
}
