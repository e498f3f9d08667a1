//! Common Types for the BER Simulator
//!
//! Defines the fading, modulation and topology vocabulary shared by the
//! channel engine and the Monte-Carlo driver

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Rician K-factor (ratio of line-of-sight to scattered power)
pub const RICIAN_K_FACTOR: f64 = 5.0;

/// Rayleigh scale parameter (sigma)
pub const RAYLEIGH_SCALE: f64 = 1.0;

/// Decision threshold for counting a symbol position as an error
pub const DECISION_THRESHOLD: f64 = 0.5;

/// Default noise variance of every channel model
pub const DEFAULT_NOISE_VARIANCE: f64 = 0.1;

/// Default channel seed (every model draws the same channel unless told otherwise)
pub const DEFAULT_CHANNEL_SEED: u64 = 42;

/// Rejected parameter value
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid parameter: {0}")]
pub struct InvalidParameter(pub String);

/// Fading distribution used to draw channel coefficients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelType {
    /// Rayleigh magnitudes, no dominant path
    Rayleigh,
    /// Gaussian magnitudes around a line-of-sight mean
    Rician,
    /// i.i.d. complex Gaussian coefficients
    Gaussian,
}

impl ChannelType {
    /// Name used in configuration files
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelType::Rayleigh => "rayleigh",
            ChannelType::Rician => "rician",
            ChannelType::Gaussian => "gaussian",
        }
    }

    /// Mean of a Rician coefficient, sqrt(K/(K+1))
    pub fn rician_mean() -> f64 {
        (RICIAN_K_FACTOR / (RICIAN_K_FACTOR + 1.0)).sqrt()
    }

    /// Standard deviation of a Rician coefficient, sqrt(1/(2(K+1)))
    pub fn rician_std_dev() -> f64 {
        (1.0 / (2.0 * (RICIAN_K_FACTOR + 1.0))).sqrt()
    }
}

impl fmt::Display for ChannelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChannelType {
    type Err = InvalidParameter;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rayleigh" => Ok(ChannelType::Rayleigh),
            "rician" => Ok(ChannelType::Rician),
            "gaussian" => Ok(ChannelType::Gaussian),
            _ => Err(InvalidParameter(format!("Invalid channel type: {}", s))),
        }
    }
}

/// Symbol alphabet used by the random signal source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModulationType {
    /// {-1, 1}
    #[serde(rename = "qpsk")]
    Qpsk,
    /// {-3, -1, 1, 3}
    #[serde(rename = "16qam")]
    Qam16,
    /// {-7, -5, ..., 5, 7}
    #[serde(rename = "64qam")]
    Qam64,
}

impl ModulationType {
    /// Real-valued amplitude levels drawn for every signal coordinate
    pub fn alphabet(&self) -> &'static [f64] {
        match self {
            ModulationType::Qpsk => &[-1.0, 1.0],
            ModulationType::Qam16 => &[-3.0, -1.0, 1.0, 3.0],
            ModulationType::Qam64 => &[-7.0, -5.0, -3.0, -1.0, 1.0, 3.0, 5.0, 7.0],
        }
    }

    /// Name used in configuration files
    pub fn as_str(&self) -> &'static str {
        match self {
            ModulationType::Qpsk => "qpsk",
            ModulationType::Qam16 => "16qam",
            ModulationType::Qam64 => "64qam",
        }
    }
}

impl fmt::Display for ModulationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModulationType {
    type Err = InvalidParameter;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "qpsk" => Ok(ModulationType::Qpsk),
            "16qam" => Ok(ModulationType::Qam16),
            "64qam" => Ok(ModulationType::Qam64),
            _ => Err(InvalidParameter(format!("Invalid modulation type: {}", s))),
        }
    }
}

/// Antenna/subcarrier arrangement of a channel model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topology {
    /// Multi-subcarrier square MIMO
    Ras,
    /// Multi-subcarrier MIMO with cyclic prefix
    Ofdm,
    /// Single flat-fading MIMO matrix
    Mimo,
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topology::Ras => f.write_str("RAS"),
            Topology::Ofdm => f.write_str("OFDM"),
            Topology::Mimo => f.write_str("MIMO"),
        }
    }
}
