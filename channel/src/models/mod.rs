//! Channel Model Topologies
//!
//! RAS, OFDM and flat MIMO models share a [`ModelCore`] holding the fading
//! and modulation parameters, the noise injector and the once-only channel
//! matrix cache.

pub mod mimo;
pub mod ofdm;
pub mod ras;

pub use mimo::MimoModel;
pub use ofdm::{OfdmDemodulator, OfdmModel, OfdmModulator};
pub use ras::RasModel;

use crate::equalizer::SingularChannelPolicy;
use crate::matrix::{ChannelDimensions, ChannelMatrix, FadingDistribution};
use crate::noise::NoiseInjector;
use crate::{ChannelError, ChannelModel, Signal};
use common::{ChannelType, ModulationType, Topology, DEFAULT_CHANNEL_SEED, DEFAULT_NOISE_VARIANCE};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::OnceLock;
use tracing::debug;

/// Parameters and channel state shared by every topology
#[derive(Debug, Clone)]
pub struct ModelCore {
    channel_type: ChannelType,
    modulation_type: ModulationType,
    fading: FadingDistribution,
    noise: NoiseInjector,
    channel_seed: u64,
    singular_policy: SingularChannelPolicy,
    channel_matrix: OnceLock<ChannelMatrix>,
}

impl ModelCore {
    /// Create a core with default noise variance, channel seed and policy
    pub fn new(channel_type: ChannelType, modulation_type: ModulationType) -> Result<Self, ChannelError> {
        Ok(Self {
            channel_type,
            modulation_type,
            fading: FadingDistribution::new(channel_type)?,
            noise: NoiseInjector::new(DEFAULT_NOISE_VARIANCE)?,
            channel_seed: DEFAULT_CHANNEL_SEED,
            singular_policy: SingularChannelPolicy::default(),
            channel_matrix: OnceLock::new(),
        })
    }

    pub fn channel_type(&self) -> ChannelType {
        self.channel_type
    }

    pub fn modulation_type(&self) -> ModulationType {
        self.modulation_type
    }

    pub fn noise_variance(&self) -> f64 {
        self.noise.variance()
    }

    pub fn noise(&self) -> &NoiseInjector {
        &self.noise
    }

    pub fn channel_seed(&self) -> u64 {
        self.channel_seed
    }

    pub fn singular_policy(&self) -> SingularChannelPolicy {
        self.singular_policy
    }

    pub(crate) fn set_noise_variance(&mut self, variance: f64) -> Result<(), ChannelError> {
        self.noise = NoiseInjector::new(variance)?;
        Ok(())
    }

    /// A new seed discards any channel matrix drawn with the old one
    pub(crate) fn set_channel_seed(&mut self, seed: u64) {
        self.channel_seed = seed;
        self.channel_matrix = OnceLock::new();
    }

    pub(crate) fn set_singular_policy(&mut self, policy: SingularChannelPolicy) {
        self.singular_policy = policy;
    }

    pub fn channel_matrix(&self) -> Option<&ChannelMatrix> {
        self.channel_matrix.get()
    }

    /// Draw the channel matrix from the model's own seeded generator, once
    pub fn channel_matrix_or_init(&self, dimensions: ChannelDimensions) -> &ChannelMatrix {
        self.channel_matrix.get_or_init(|| {
            debug!(
                "Materializing {} channel matrix {:?} with seed {}",
                self.channel_type,
                dimensions.shape(),
                self.channel_seed
            );
            let mut rng = ChaCha8Rng::seed_from_u64(self.channel_seed);
            ChannelMatrix::generate(&self.fading, dimensions, &mut rng)
        })
    }

    /// Install a prebuilt matrix of the expected dimensions
    pub fn install_channel_matrix(
        &self,
        matrix: ChannelMatrix,
        dimensions: ChannelDimensions,
    ) -> Result<(), ChannelError> {
        if matrix.dimensions() != dimensions {
            return Err(ChannelError::InvalidParameter(format!(
                "Channel matrix shape {:?} does not match model shape {:?}",
                matrix.shape(),
                dimensions.shape()
            )));
        }

        self.channel_matrix
            .set(matrix)
            .map_err(|_| ChannelError::ChannelAlreadyGenerated)
    }
}

/// Reject zero-sized dimensions
pub(crate) fn require_positive(name: &str, value: usize) -> Result<usize, ChannelError> {
    if value == 0 {
        return Err(ChannelError::InvalidParameter(format!("{} must be positive", name)));
    }
    Ok(value)
}

/// Channel model selected by topology tag
#[derive(Debug, Clone)]
pub enum AnyChannelModel {
    Ras(RasModel),
    Ofdm(OfdmModel),
    Mimo(MimoModel),
}

impl From<RasModel> for AnyChannelModel {
    fn from(model: RasModel) -> Self {
        AnyChannelModel::Ras(model)
    }
}

impl From<OfdmModel> for AnyChannelModel {
    fn from(model: OfdmModel) -> Self {
        AnyChannelModel::Ofdm(model)
    }
}

impl From<MimoModel> for AnyChannelModel {
    fn from(model: MimoModel) -> Self {
        AnyChannelModel::Mimo(model)
    }
}

impl ChannelModel for AnyChannelModel {
    fn topology(&self) -> Topology {
        match self {
            AnyChannelModel::Ras(m) => m.topology(),
            AnyChannelModel::Ofdm(m) => m.topology(),
            AnyChannelModel::Mimo(m) => m.topology(),
        }
    }

    fn core(&self) -> &ModelCore {
        match self {
            AnyChannelModel::Ras(m) => m.core(),
            AnyChannelModel::Ofdm(m) => m.core(),
            AnyChannelModel::Mimo(m) => m.core(),
        }
    }

    fn signal_shape(&self) -> Vec<usize> {
        match self {
            AnyChannelModel::Ras(m) => m.signal_shape(),
            AnyChannelModel::Ofdm(m) => m.signal_shape(),
            AnyChannelModel::Mimo(m) => m.signal_shape(),
        }
    }

    fn channel_dimensions(&self) -> ChannelDimensions {
        match self {
            AnyChannelModel::Ras(m) => m.channel_dimensions(),
            AnyChannelModel::Ofdm(m) => m.channel_dimensions(),
            AnyChannelModel::Mimo(m) => m.channel_dimensions(),
        }
    }

    fn apply_channel(&self, signal: &Signal) -> Result<Signal, ChannelError> {
        match self {
            AnyChannelModel::Ras(m) => m.apply_channel(signal),
            AnyChannelModel::Ofdm(m) => m.apply_channel(signal),
            AnyChannelModel::Mimo(m) => m.apply_channel(signal),
        }
    }

    fn equalize_signal(&self, signal: &Signal) -> Result<Signal, ChannelError> {
        match self {
            AnyChannelModel::Ras(m) => m.equalize_signal(signal),
            AnyChannelModel::Ofdm(m) => m.equalize_signal(signal),
            AnyChannelModel::Mimo(m) => m.equalize_signal(signal),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DMatrix;
    use num_complex::Complex64;

    fn dims() -> ChannelDimensions {
        ChannelDimensions {
            subcarriers: Some(2),
            rows: 2,
            cols: 2,
        }
    }

    #[test]
    fn test_core_defaults() {
        let core = ModelCore::new(ChannelType::Rayleigh, ModulationType::Qpsk).unwrap();
        assert_eq!(core.noise_variance(), DEFAULT_NOISE_VARIANCE);
        assert_eq!(core.channel_seed(), DEFAULT_CHANNEL_SEED);
        assert_eq!(core.singular_policy(), SingularChannelPolicy::Fail);
        assert!(core.channel_matrix().is_none());
    }

    #[test]
    fn test_matrix_materialized_once() {
        let core = ModelCore::new(ChannelType::Rician, ModulationType::Qam16).unwrap();
        let first = core.channel_matrix_or_init(dims()).clone();
        let second = core.channel_matrix_or_init(dims());
        assert_eq!(&first, second);
        assert!(core.channel_matrix().is_some());
    }

    #[test]
    fn test_install_rules() {
        let core = ModelCore::new(ChannelType::Rayleigh, ModulationType::Qpsk).unwrap();

        let wrong = ChannelMatrix::per_subcarrier(vec![DMatrix::<Complex64>::identity(3, 3)]).unwrap();
        assert!(matches!(
            core.install_channel_matrix(wrong, dims()),
            Err(ChannelError::InvalidParameter(_))
        ));

        let right = ChannelMatrix::per_subcarrier(vec![DMatrix::identity(2, 2); 2]).unwrap();
        core.install_channel_matrix(right.clone(), dims()).unwrap();
        assert_eq!(core.channel_matrix(), Some(&right));

        assert_eq!(
            core.install_channel_matrix(right, dims()),
            Err(ChannelError::ChannelAlreadyGenerated)
        );
    }

    #[test]
    fn test_reseed_discards_matrix() {
        let mut core = ModelCore::new(ChannelType::Rayleigh, ModulationType::Qpsk).unwrap();
        let original = core.channel_matrix_or_init(dims()).clone();

        core.set_channel_seed(7);
        assert!(core.channel_matrix().is_none());
        assert_ne!(core.channel_matrix_or_init(dims()), &original);
    }

    #[test]
    fn test_require_positive() {
        assert!(require_positive("num_antennas", 0).is_err());
        assert_eq!(require_positive("num_antennas", 4).unwrap(), 4);
    }
}
