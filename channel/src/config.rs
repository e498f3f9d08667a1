//! Channel Model Configuration
//!
//! Serde structures describing a model, deserializable from TOML/JSON-style
//! configuration, and the factory turning them into an [`AnyChannelModel`].

use crate::equalizer::SingularChannelPolicy;
use crate::models::{AnyChannelModel, MimoModel, OfdmModel, RasModel};
use crate::ChannelError;
use common::{ChannelType, ModulationType, Topology, DEFAULT_CHANNEL_SEED, DEFAULT_NOISE_VARIANCE};
use serde::{Deserialize, Serialize};

/// Topology and its dimensions
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TopologyConfig {
    Ras {
        num_subcarriers: usize,
        num_symbols: usize,
        num_antennas: usize,
    },
    Ofdm {
        num_subcarriers: usize,
        num_symbols: usize,
        num_antennas: usize,
        #[serde(default)]
        cyclic_prefix_length: usize,
    },
    Mimo {
        num_tx_antennas: usize,
        num_rx_antennas: usize,
    },
}

impl TopologyConfig {
    pub fn topology(&self) -> Topology {
        match self {
            TopologyConfig::Ras { .. } => Topology::Ras,
            TopologyConfig::Ofdm { .. } => Topology::Ofdm,
            TopologyConfig::Mimo { .. } => Topology::Mimo,
        }
    }
}

/// Complete description of one channel model
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ModelConfig {
    /// Topology and dimensions
    pub topology: TopologyConfig,
    /// Fading distribution
    pub channel_type: ChannelType,
    /// Symbol alphabet
    pub modulation_type: ModulationType,
    /// Complex noise variance
    #[serde(default = "default_noise_variance")]
    pub noise_variance: f64,
    /// Seed of the channel matrix generator
    #[serde(default = "default_channel_seed")]
    pub channel_seed: u64,
    /// Behavior on singular per-subcarrier blocks
    #[serde(default)]
    pub singular_policy: SingularChannelPolicy,
}

fn default_noise_variance() -> f64 {
    DEFAULT_NOISE_VARIANCE
}

fn default_channel_seed() -> u64 {
    DEFAULT_CHANNEL_SEED
}

impl ModelConfig {
    /// Config with default noise variance, seed and policy
    pub fn new(topology: TopologyConfig, channel_type: ChannelType, modulation_type: ModulationType) -> Self {
        Self {
            topology,
            channel_type,
            modulation_type,
            noise_variance: DEFAULT_NOISE_VARIANCE,
            channel_seed: DEFAULT_CHANNEL_SEED,
            singular_policy: SingularChannelPolicy::default(),
        }
    }

    /// Same config with another noise variance
    pub fn with_noise_variance(&self, noise_variance: f64) -> Self {
        Self {
            noise_variance,
            ..self.clone()
        }
    }

    /// Build the model this config describes
    pub fn build(&self) -> Result<AnyChannelModel, ChannelError> {
        let model: AnyChannelModel = match self.topology {
            TopologyConfig::Ras {
                num_subcarriers,
                num_symbols,
                num_antennas,
            } => RasModel::new(num_subcarriers, num_symbols, num_antennas, self.channel_type, self.modulation_type)?
                .with_noise_variance(self.noise_variance)?
                .with_channel_seed(self.channel_seed)
                .with_singular_policy(self.singular_policy)
                .into(),
            TopologyConfig::Ofdm {
                num_subcarriers,
                num_symbols,
                num_antennas,
                cyclic_prefix_length,
            } => OfdmModel::new(
                num_subcarriers,
                num_symbols,
                num_antennas,
                self.channel_type,
                self.modulation_type,
                cyclic_prefix_length,
            )?
            .with_noise_variance(self.noise_variance)?
            .with_channel_seed(self.channel_seed)
            .with_singular_policy(self.singular_policy)
            .into(),
            TopologyConfig::Mimo {
                num_tx_antennas,
                num_rx_antennas,
            } => MimoModel::new(num_tx_antennas, num_rx_antennas, self.channel_type, self.modulation_type)?
                .with_noise_variance(self.noise_variance)?
                .with_channel_seed(self.channel_seed)
                .into(),
        };
        Ok(model)
    }
}
