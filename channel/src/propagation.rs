//! Signal Propagation
//!
//! Applies per-subcarrier blocks to every symbol slice of a
//! `[subcarriers, symbols, antennas]` signal, or a single flat block to an
//! `[antennas, columns]` signal.

use crate::{ChannelError, ChannelMatrix, Signal};
use nalgebra::{DMatrix, DVector};
use ndarray::{Array2, Array3, ArrayView2, ArrayView3, Ix2, Ix3};
use num_complex::Complex64;

/// View a signal as `[subcarriers, symbols, antennas]`
pub(crate) fn as_subcarrier_view(signal: &Signal) -> Result<ArrayView3<'_, Complex64>, ChannelError> {
    signal.view().into_dimensionality::<Ix3>().map_err(|_| {
        ChannelError::InvalidParameter(format!(
            "Expected a [subcarriers, symbols, antennas] signal, got shape {:?}",
            signal.shape()
        ))
    })
}

/// View a signal as `[antennas, columns]`
pub(crate) fn as_flat_view(signal: &Signal) -> Result<ArrayView2<'_, Complex64>, ChannelError> {
    signal.view().into_dimensionality::<Ix2>().map_err(|_| {
        ChannelError::InvalidParameter(format!(
            "Expected an [antennas, 1] signal, got shape {:?}",
            signal.shape()
        ))
    })
}

/// Multiply block `i` into every symbol slice of subcarrier `i`
///
/// All blocks must share one shape; the output antenna axis takes the
/// block row count.
pub(crate) fn apply_blockwise(
    blocks: &[DMatrix<Complex64>],
    signal: &Signal,
) -> Result<Signal, ChannelError> {
    let input = as_subcarrier_view(signal)?;
    let (num_subcarriers, num_symbols, num_antennas) = input.dim();

    let (rows, cols) = blocks.first().map(|b| b.shape()).unwrap_or((0, 0));
    if blocks.len() != num_subcarriers || cols != num_antennas {
        return Err(ChannelError::InvalidParameter(format!(
            "Signal shape {:?} does not match {} blocks of {}x{}",
            signal.shape(),
            blocks.len(),
            rows,
            cols
        )));
    }

    let mut output = Array3::<Complex64>::zeros((num_subcarriers, num_symbols, rows));
    for (i, block) in blocks.iter().enumerate() {
        for j in 0..num_symbols {
            let x = DVector::from_iterator(num_antennas, input.slice(ndarray::s![i, j, ..]).iter().copied());
            let y = block * x;
            for (k, value) in y.iter().enumerate() {
                output[[i, j, k]] = *value;
            }
        }
    }

    Ok(output.into_dyn())
}

/// Single matrix product `block * signal`
pub(crate) fn apply_flat(block: &DMatrix<Complex64>, signal: &Signal) -> Result<Signal, ChannelError> {
    let input = as_flat_view(signal)?;
    let (rows, columns) = input.dim();

    if rows != block.ncols() {
        return Err(ChannelError::InvalidParameter(format!(
            "Signal has {} antennas, channel block expects {}",
            rows,
            block.ncols()
        )));
    }

    let x = DMatrix::from_fn(rows, columns, |r, c| input[[r, c]]);
    let y = block * x;

    let mut output = Array2::<Complex64>::zeros((y.nrows(), columns));
    for ((r, c), value) in output.indexed_iter_mut() {
        *value = y[(r, c)];
    }
    Ok(output.into_dyn())
}

/// Propagate a multi-subcarrier signal through its per-subcarrier blocks
pub fn propagate_subcarriers(matrix: &ChannelMatrix, signal: &Signal) -> Result<Signal, ChannelError> {
    apply_blockwise(matrix.blocks(), signal)
}

/// Propagate a flat MIMO signal through the single channel block
pub fn propagate_flat(matrix: &ChannelMatrix, signal: &Signal) -> Result<Signal, ChannelError> {
    let block = matrix
        .block(0)
        .ok_or_else(|| ChannelError::InvalidParameter("Empty channel matrix".into()))?;
    apply_flat(block, signal)
}

/// Sum of squared magnitudes over a signal
#[cfg(test)]
pub(crate) fn signal_energy(signal: &Signal) -> f64 {
    signal.iter().map(|s| s.norm_sqr()).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::signal_from_real;
    use ndarray::IxDyn;

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    #[test]
    fn test_flat_product() {
        let block = DMatrix::from_row_slice(2, 2, &[c(1.0, 0.0), c(2.0, 0.0), c(0.0, 1.0), c(1.0, 0.0)]);
        let matrix = ChannelMatrix::flat(block);
        let signal = signal_from_real(&[2, 1], &[1.0, -1.0]).unwrap();

        let out = propagate_flat(&matrix, &signal).unwrap();
        assert_eq!(out.shape(), &[2, 1]);
        assert_eq!(out[IxDyn(&[0, 0])], c(-1.0, 0.0));
        assert_eq!(out[IxDyn(&[1, 0])], c(-1.0, 1.0));
    }

    #[test]
    fn test_flat_rectangular() {
        // 3 rx x 2 tx
        let block = DMatrix::from_element(3, 2, c(1.0, 0.0));
        let matrix = ChannelMatrix::flat(block);
        let signal = signal_from_real(&[2, 1], &[3.0, 1.0]).unwrap();

        let out = propagate_flat(&matrix, &signal).unwrap();
        assert_eq!(out.shape(), &[3, 1]);
        assert!(out.iter().all(|s| *s == c(4.0, 0.0)));

        let wrong = signal_from_real(&[3, 1], &[1.0, 1.0, 1.0]).unwrap();
        assert!(propagate_flat(&matrix, &wrong).is_err());
    }

    #[test]
    fn test_subcarrier_blocks_applied_per_subcarrier() {
        let blocks = vec![
            DMatrix::<Complex64>::identity(2, 2),
            DMatrix::from_element(2, 2, c(2.0, 0.0)) - DMatrix::<Complex64>::identity(2, 2) * c(2.0, 0.0),
        ];
        let matrix = ChannelMatrix::per_subcarrier(blocks).unwrap();
        // 2 subcarriers, 3 symbols, 2 antennas
        let signal = signal_from_real(&[2, 3, 2], &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();

        let out = propagate_subcarriers(&matrix, &signal).unwrap();
        assert_eq!(out.shape(), signal.shape());

        // Identity on subcarrier 0
        for j in 0..3 {
            for k in 0..2 {
                assert_eq!(out[IxDyn(&[0, j, k])], signal[IxDyn(&[0, j, k])]);
            }
        }
        // Anti-diagonal swap scaled by 2 on subcarrier 1
        assert_eq!(out[IxDyn(&[1, 0, 0])], c(4.0, 0.0));
        assert_eq!(out[IxDyn(&[1, 0, 1])], c(2.0, 0.0));
    }

    #[test]
    fn test_subcarrier_shape_mismatch() {
        let matrix = ChannelMatrix::per_subcarrier(vec![DMatrix::identity(2, 2); 4]).unwrap();
        let signal = signal_from_real(&[3, 1, 2], &[1.0; 6]).unwrap();
        assert!(matches!(
            propagate_subcarriers(&matrix, &signal),
            Err(ChannelError::InvalidParameter(_))
        ));

        let flat_signal = signal_from_real(&[2, 1], &[1.0, 1.0]).unwrap();
        assert!(propagate_subcarriers(&matrix, &flat_signal).is_err());
    }

    #[test]
    fn test_signal_energy() {
        let signal = signal_from_real(&[2, 1], &[3.0, -4.0]).unwrap();
        assert_eq!(signal_energy(&signal), 25.0);
    }
}
