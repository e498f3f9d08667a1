//! Random Signal Source
//!
//! Transmit signals are tensors of real-valued alphabet levels stored as
//! complex samples, shaped `[subcarriers, symbols, antennas]` for the
//! multi-subcarrier topologies and `[antennas, 1]` for flat MIMO.

use common::ModulationType;
use ndarray::{ArrayD, IxDyn};
use num_complex::Complex64;
use rand::Rng;

/// Complex signal tensor at any pipeline stage
pub type Signal = ArrayD<Complex64>;

/// Draw every coordinate of `shape` uniformly from the modulation alphabet
pub fn generate_signal<R: Rng + ?Sized>(
    modulation: ModulationType,
    shape: &[usize],
    rng: &mut R,
) -> Signal {
    let alphabet = modulation.alphabet();
    ArrayD::from_shape_simple_fn(IxDyn(shape), || {
        let level = alphabet[rng.gen_range(0..alphabet.len())];
        Complex64::new(level, 0.0)
    })
}

/// Build a signal from real amplitudes (row-major)
pub fn signal_from_real(shape: &[usize], values: &[f64]) -> Option<Signal> {
    let samples = values.iter().map(|&v| Complex64::new(v, 0.0)).collect();
    ArrayD::from_shape_vec(IxDyn(shape), samples).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_signal_uses_alphabet() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for modulation in [ModulationType::Qpsk, ModulationType::Qam16, ModulationType::Qam64] {
            let signal = generate_signal(modulation, &[4, 10, 2], &mut rng);
            assert_eq!(signal.shape(), &[4, 10, 2]);
            for s in signal.iter() {
                assert_eq!(s.im, 0.0);
                assert!(modulation.alphabet().contains(&s.re));
            }
        }
    }

    #[test]
    fn test_signal_covers_alphabet() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let signal = generate_signal(ModulationType::Qam64, &[2000], &mut rng);
        for level in ModulationType::Qam64.alphabet() {
            assert!(signal.iter().any(|s| s.re == *level), "level {} never drawn", level);
        }
    }

    #[test]
    fn test_signal_from_real() {
        let signal = signal_from_real(&[2, 1], &[1.0, -1.0]).unwrap();
        assert_eq!(signal.shape(), &[2, 1]);
        assert_eq!(signal[IxDyn(&[1, 0])], Complex64::new(-1.0, 0.0));
        assert!(signal_from_real(&[3, 1], &[1.0]).is_none());
    }
}
