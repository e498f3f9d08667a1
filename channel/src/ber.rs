//! Bit Error Rate Calculation

use crate::{ChannelError, Signal};
use common::DECISION_THRESHOLD;

/// Error count of one transmitted/recovered signal pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BerResult {
    /// Positions deviating by more than the decision threshold
    pub errors: usize,
    /// Total compared positions
    pub total: usize,
}

impl BerResult {
    /// Fraction of erroneous positions, in [0, 1]
    pub fn ber(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.errors as f64 / self.total as f64
    }
}

/// Outcome of a single Monte-Carlo trial
#[derive(Debug, Clone)]
pub struct SimulationRun {
    pub transmitted: Signal,
    pub equalized: Signal,
    pub ber: BerResult,
}

/// Count positions where |transmitted - recovered| exceeds the decision threshold
pub fn calculate_ber(transmitted: &Signal, recovered: &Signal) -> Result<BerResult, ChannelError> {
    if transmitted.shape() != recovered.shape() {
        return Err(ChannelError::InvalidParameter(format!(
            "Cannot compare signals of shape {:?} and {:?}",
            transmitted.shape(),
            recovered.shape()
        )));
    }

    let errors = transmitted
        .iter()
        .zip(recovered.iter())
        .filter(|(t, r)| (*t - *r).norm() > DECISION_THRESHOLD)
        .count();

    Ok(BerResult {
        errors,
        total: transmitted.len(),
    })
}
