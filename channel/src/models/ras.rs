//! RAS Model
//!
//! Multi-subcarrier square MIMO: one `antennas x antennas` fading block per
//! subcarrier, applied to every symbol on that subcarrier and removed by
//! exact per-subcarrier inversion.

use super::{require_positive, ModelCore};
use crate::equalizer::{equalize_subcarriers, SingularChannelPolicy};
use crate::matrix::ChannelDimensions;
use crate::propagation::propagate_subcarriers;
use crate::{ChannelError, ChannelModel, Signal};
use common::{ChannelType, ModulationType, Topology};
use tracing::info;

/// Multi-subcarrier square MIMO channel model
#[derive(Debug, Clone)]
pub struct RasModel {
    num_subcarriers: usize,
    num_symbols: usize,
    num_antennas: usize,
    core: ModelCore,
}

impl RasModel {
    /// Create a RAS model
    pub fn new(
        num_subcarriers: usize,
        num_symbols: usize,
        num_antennas: usize,
        channel_type: ChannelType,
        modulation_type: ModulationType,
    ) -> Result<Self, ChannelError> {
        let model = Self {
            num_subcarriers: require_positive("num_subcarriers", num_subcarriers)?,
            num_symbols: require_positive("num_symbols", num_symbols)?,
            num_antennas: require_positive("num_antennas", num_antennas)?,
            core: ModelCore::new(channel_type, modulation_type)?,
        };

        info!(
            "RAS model: {} subcarriers, {} symbols, {} antennas, {} / {}",
            num_subcarriers, num_symbols, num_antennas, channel_type, modulation_type
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

    pub fn with_singular_policy(mut self, policy: SingularChannelPolicy) -> Self {
        self.core.set_singular_policy(policy);
        self
    }

    pub fn num_subcarriers(&self) -> usize {
        self.num_subcarriers
    }

    pub fn num_symbols(&self) -> usize {
        self.num_symbols
    }

    pub fn num_antennas(&self) -> usize {
        self.num_antennas
    }
}

impl ChannelModel for RasModel {
    fn topology(&self) -> Topology {
        Topology::Ras
    }

    fn core(&self) -> &ModelCore {
        &self.core
    }

    fn signal_shape(&self) -> Vec<usize> {
        vec![self.num_subcarriers, self.num_symbols, self.num_antennas]
    }

    fn channel_dimensions(&self) -> ChannelDimensions {
        ChannelDimensions {
            subcarriers: Some(self.num_subcarriers),
            rows: self.num_antennas,
            cols: self.num_antennas,
        }
    }

    fn apply_channel(&self, signal: &Signal) -> Result<Signal, ChannelError> {
        let matrix = self.generate_channel_matrix();
        propagate_subcarriers(matrix, signal)
    }

    fn equalize_signal(&self, signal: &Signal) -> Result<Signal, ChannelError> {
        let matrix = self.generate_channel_matrix();
        equalize_subcarriers(matrix, signal, self.core.singular_policy())
    }
}
