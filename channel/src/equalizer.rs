//! Zero-Forcing Equalization
//!
//! Square per-subcarrier blocks are inverted exactly; flat MIMO blocks use
//! the Moore-Penrose pseudo-inverse, which exists for any shape.

use crate::propagation::{apply_blockwise, apply_flat};
use crate::{ChannelError, ChannelMatrix, Signal};
use nalgebra::DMatrix;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Blocks whose reciprocal condition number falls below this are treated as singular
pub const SINGULARITY_THRESHOLD: f64 = 1e-12;

/// Relative cutoff for singular values in the pseudo-inverse
const PINV_RCOND: f64 = 1e-12;

/// What to do when a per-subcarrier block cannot be inverted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SingularChannelPolicy {
    /// Raise `SingularChannel`
    #[default]
    Fail,
    /// Fall back to the pseudo-inverse of the offending block
    PseudoInverse,
}

/// sigma_min / sigma_max of a block, in [0, 1]
///
/// Zero for a singular block, one for a scaled unitary block. Independent of
/// the antenna count for well-conditioned channels.
pub fn reciprocal_condition(block: &DMatrix<Complex64>) -> f64 {
    let singular_values = block.singular_values();
    let largest = singular_values.iter().copied().fold(0.0, f64::max);
    if largest == 0.0 {
        return 0.0;
    }
    let smallest = singular_values.iter().copied().fold(f64::INFINITY, f64::min);
    smallest / largest
}

/// Moore-Penrose pseudo-inverse via SVD
pub fn pseudo_inverse(block: &DMatrix<Complex64>) -> Result<DMatrix<Complex64>, ChannelError> {
    let largest = block.iter().map(|c| c.norm()).fold(0.0, f64::max);
    let eps = PINV_RCOND * largest * block.nrows().max(block.ncols()) as f64;

    block
        .clone()
        .pseudo_inverse(eps)
        .map_err(|e| ChannelError::InvalidParameter(format!("Pseudo-inverse failed: {}", e)))
}

/// Exact inverse of one square block, subject to the singular-channel policy
pub fn zero_forcing_inverse(
    block: &DMatrix<Complex64>,
    subcarrier: usize,
    policy: SingularChannelPolicy,
) -> Result<DMatrix<Complex64>, ChannelError> {
    if !block.is_square() {
        return Err(ChannelError::InvalidParameter(format!(
            "Exact inversion needs a square block, subcarrier {} is {}x{}",
            subcarrier,
            block.nrows(),
            block.ncols()
        )));
    }

    let conditioning = reciprocal_condition(block);
    let inverse = if conditioning < SINGULARITY_THRESHOLD {
        None
    } else {
        block.clone().try_inverse()
    };

    match (inverse, policy) {
        (Some(inverse), _) => Ok(inverse),
        (None, SingularChannelPolicy::Fail) => Err(ChannelError::SingularChannel {
            subcarrier,
            conditioning,
        }),
        (None, SingularChannelPolicy::PseudoInverse) => {
            warn!(
                "Subcarrier {} is singular (conditioning {:.3e}), using pseudo-inverse",
                subcarrier, conditioning
            );
            pseudo_inverse(block)
        }
    }
}

/// Invert every per-subcarrier block and apply it to each symbol slice
pub fn equalize_subcarriers(
    matrix: &ChannelMatrix,
    signal: &Signal,
    policy: SingularChannelPolicy,
) -> Result<Signal, ChannelError> {
    let inverses = matrix
        .blocks()
        .iter()
        .enumerate()
        .map(|(i, block)| zero_forcing_inverse(block, i, policy))
        .collect::<Result<Vec<_>, _>>()?;

    apply_blockwise(&inverses, signal)
}

/// Apply the pseudo-inverse of the flat block
pub fn equalize_flat(matrix: &ChannelMatrix, signal: &Signal) -> Result<Signal, ChannelError> {
    let block = matrix
        .block(0)
        .ok_or_else(|| ChannelError::InvalidParameter("Empty channel matrix".into()))?;
    let pinv = pseudo_inverse(block)?;
    apply_flat(&pinv, signal)
}
