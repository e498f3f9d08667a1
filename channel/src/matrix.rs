//! Channel Matrix Generation
//!
//! A channel matrix is one `rows x cols` complex block per subcarrier, or a
//! single block for flat MIMO. Rows index receive antennas and columns index
//! transmit antennas.

use crate::ChannelError;
use common::{ChannelType, RAYLEIGH_SCALE};
use nalgebra::DMatrix;
use num_complex::Complex64;
use rand::Rng;
use rand_distr::{Distribution, Normal, StandardNormal};
use tracing::debug;

/// Shape of the channel matrix a model draws
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelDimensions {
    /// Number of per-subcarrier blocks, `None` for a single flat block
    pub subcarriers: Option<usize>,
    /// Output (receive) antennas
    pub rows: usize,
    /// Input (transmit) antennas
    pub cols: usize,
}

impl ChannelDimensions {
    /// Tensor shape: `[subcarriers, rows, cols]` or `[rows, cols]`
    pub fn shape(&self) -> Vec<usize> {
        match self.subcarriers {
            Some(n) => vec![n, self.rows, self.cols],
            None => vec![self.rows, self.cols],
        }
    }

    fn num_blocks(&self) -> usize {
        self.subcarriers.unwrap_or(1)
    }
}

/// Per-coefficient fading distribution
#[derive(Debug, Clone, Copy)]
pub enum FadingDistribution {
    /// Rayleigh magnitude with the given scale
    Rayleigh { scale: f64 },
    /// Real Gaussian around the line-of-sight mean
    Rician(Normal<f64>),
    /// Circular complex Gaussian, unit variance per component
    Gaussian,
}

impl FadingDistribution {
    /// Distribution for a channel type
    pub fn new(channel_type: ChannelType) -> Result<Self, ChannelError> {
        match channel_type {
            ChannelType::Rayleigh => Ok(FadingDistribution::Rayleigh {
                scale: RAYLEIGH_SCALE,
            }),
            ChannelType::Rician => {
                let normal = Normal::new(ChannelType::rician_mean(), ChannelType::rician_std_dev())
                    .map_err(|e| ChannelError::InvalidParameter(format!("Rician distribution: {}", e)))?;
                Ok(FadingDistribution::Rician(normal))
            }
            ChannelType::Gaussian => Ok(FadingDistribution::Gaussian),
        }
    }

    /// Draw one channel coefficient
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Complex64 {
        match self {
            FadingDistribution::Rayleigh { scale } => {
                // Magnitude of a circular Gaussian pair
                let x: f64 = StandardNormal.sample(rng);
                let y: f64 = StandardNormal.sample(rng);
                Complex64::new(scale * x.hypot(y), 0.0)
            }
            FadingDistribution::Rician(normal) => Complex64::new(normal.sample(rng), 0.0),
            FadingDistribution::Gaussian => {
                let re: f64 = StandardNormal.sample(rng);
                let im: f64 = StandardNormal.sample(rng);
                Complex64::new(re, im)
            }
        }
    }
}

/// Immutable channel matrix tensor
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelMatrix {
    blocks: Vec<DMatrix<Complex64>>,
    dimensions: ChannelDimensions,
}

impl ChannelMatrix {
    /// Draw a channel matrix, blocks in subcarrier order and entries row-major
    pub fn generate<R: Rng + ?Sized>(
        fading: &FadingDistribution,
        dimensions: ChannelDimensions,
        rng: &mut R,
    ) -> Self {
        let ChannelDimensions { rows, cols, .. } = dimensions;
        let blocks = (0..dimensions.num_blocks())
            .map(|_| DMatrix::from_row_iterator(rows, cols, (0..rows * cols).map(|_| fading.sample(rng))))
            .collect();

        debug!("Generated {:?} channel matrix with shape {:?}", fading, dimensions.shape());

        Self { blocks, dimensions }
    }

    /// One block per subcarrier
    pub fn per_subcarrier(blocks: Vec<DMatrix<Complex64>>) -> Result<Self, ChannelError> {
        let first = blocks
            .first()
            .ok_or_else(|| ChannelError::InvalidParameter("Channel matrix needs at least one block".into()))?;
        let (rows, cols) = first.shape();

        if let Some(pos) = blocks.iter().position(|b| b.shape() != (rows, cols)) {
            return Err(ChannelError::InvalidParameter(format!(
                "Block {} has shape {:?}, expected {:?}",
                pos,
                blocks[pos].shape(),
                (rows, cols)
            )));
        }

        let dimensions = ChannelDimensions {
            subcarriers: Some(blocks.len()),
            rows,
            cols,
        };
        Ok(Self { blocks, dimensions })
    }

    /// Single flat-fading block
    pub fn flat(block: DMatrix<Complex64>) -> Self {
        let (rows, cols) = block.shape();
        Self {
            blocks: vec![block],
            dimensions: ChannelDimensions {
                subcarriers: None,
                rows,
                cols,
            },
        }
    }

    pub fn dimensions(&self) -> ChannelDimensions {
        self.dimensions
    }

    /// Tensor shape, see [`ChannelDimensions::shape`]
    pub fn shape(&self) -> Vec<usize> {
        self.dimensions.shape()
    }

    pub fn blocks(&self) -> &[DMatrix<Complex64>] {
        &self.blocks
    }

    /// Block for a subcarrier (index 0 for flat MIMO)
    pub fn block(&self, subcarrier: usize) -> Option<&DMatrix<Complex64>> {
        self.blocks.get(subcarrier)
    }

    /// Iterate over every coefficient
    pub fn coefficients(&self) -> impl Iterator<Item = &Complex64> {
        self.blocks.iter().flat_map(|b| b.iter())
    }
}
