//! OFDM Model with Cyclic Prefix
//!
//! Per-subcarrier MIMO fading like RAS, plus an OFDM air interface: each
//! (symbol, antenna) column of subcarriers is taken to the time domain with a
//! unitary IFFT, extended with a cyclic prefix, stripped and brought back with
//! a unitary FFT. With a flat block per subcarrier the prefix round trip is
//! lossless, so equalization is the same per-subcarrier inversion as RAS.
//!
//! No multipath delay spread is modelled: the prefix only changes the number
//! of time-domain samples per symbol and has no effect on BER, which matches
//! RAS up to floating-point round-off.

use super::{require_positive, ModelCore};
use crate::equalizer::{equalize_subcarriers, SingularChannelPolicy};
use crate::matrix::ChannelDimensions;
use crate::propagation::{as_subcarrier_view, propagate_subcarriers};
use crate::{ChannelError, ChannelModel, Signal};
use common::{ChannelType, ModulationType, Topology};
use ndarray::{s, Array3};
use num_complex::Complex64;
use rustfft::{Fft, FftPlanner};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// OFDM modulator: IFFT plus cyclic prefix insertion
#[derive(Clone)]
pub struct OfdmModulator {
    fft_size: usize,
    cp_length: usize,
    ifft: Arc<dyn Fft<f64>>,
}

impl OfdmModulator {
    /// Create a modulator for `fft_size` subcarriers
    pub fn new(planner: &mut FftPlanner<f64>, fft_size: usize, cp_length: usize) -> Result<Self, ChannelError> {
        validate_cp(fft_size, cp_length)?;
        Ok(Self {
            fft_size,
            cp_length,
            ifft: planner.plan_fft_inverse(fft_size),
        })
    }

    /// Modulate one symbol: frequency samples in, `fft_size + cp_length` time samples out
    pub fn modulate_symbol(&self, freq_samples: &[Complex64]) -> Result<Vec<Complex64>, ChannelError> {
        if freq_samples.len() != self.fft_size {
            return Err(ChannelError::InvalidParameter(format!(
                "Expected {} subcarriers, got {}",
                self.fft_size,
                freq_samples.len()
            )));
        }

        let mut time_samples = freq_samples.to_vec();
        self.ifft.process(&mut time_samples);

        let scale = 1.0 / (self.fft_size as f64).sqrt();
        time_samples.iter_mut().for_each(|s| *s *= scale);

        // Copy last cp_length samples as CP
        let mut output = Vec::with_capacity(self.fft_size + self.cp_length);
        output.extend_from_slice(&time_samples[self.fft_size - self.cp_length..]);
        output.extend_from_slice(&time_samples);
        Ok(output)
    }

    /// Samples per symbol including the prefix
    pub fn symbol_length(&self) -> usize {
        self.fft_size + self.cp_length
    }
}

/// OFDM demodulator: cyclic prefix removal plus FFT
#[derive(Clone)]
pub struct OfdmDemodulator {
    fft_size: usize,
    cp_length: usize,
    fft: Arc<dyn Fft<f64>>,
}

impl OfdmDemodulator {
    /// Create a demodulator for `fft_size` subcarriers
    pub fn new(planner: &mut FftPlanner<f64>, fft_size: usize, cp_length: usize) -> Result<Self, ChannelError> {
        validate_cp(fft_size, cp_length)?;
        Ok(Self {
            fft_size,
            cp_length,
            fft: planner.plan_fft_forward(fft_size),
        })
    }

    /// Demodulate one symbol of `fft_size + cp_length` time samples
    pub fn demodulate_symbol(&self, time_samples: &[Complex64]) -> Result<Vec<Complex64>, ChannelError> {
        let expected_len = self.fft_size + self.cp_length;
        if time_samples.len() != expected_len {
            return Err(ChannelError::InvalidParameter(format!(
                "Expected {} samples, got {}",
                expected_len,
                time_samples.len()
            )));
        }

        // Skip cyclic prefix and perform FFT
        let mut freq_samples = time_samples[self.cp_length..].to_vec();
        self.fft.process(&mut freq_samples);

        let scale = 1.0 / (self.fft_size as f64).sqrt();
        freq_samples.iter_mut().for_each(|s| *s *= scale);
        Ok(freq_samples)
    }
}

fn validate_cp(fft_size: usize, cp_length: usize) -> Result<(), ChannelError> {
    if cp_length > fft_size {
        return Err(ChannelError::InvalidParameter(format!(
            "Cyclic prefix length {} exceeds {} subcarriers",
            cp_length, fft_size
        )));
    }
    Ok(())
}

/// Multi-subcarrier MIMO channel model with an OFDM air interface
#[derive(Clone)]
pub struct OfdmModel {
    num_subcarriers: usize,
    num_symbols: usize,
    num_antennas: usize,
    cyclic_prefix_length: usize,
    modulator: OfdmModulator,
    demodulator: OfdmDemodulator,
    core: ModelCore,
}

impl OfdmModel {
    /// Create an OFDM model
    pub fn new(
        num_subcarriers: usize,
        num_symbols: usize,
        num_antennas: usize,
        channel_type: ChannelType,
        modulation_type: ModulationType,
        cyclic_prefix_length: usize,
    ) -> Result<Self, ChannelError> {
        let num_subcarriers = require_positive("num_subcarriers", num_subcarriers)?;

        let mut planner = FftPlanner::new();
        let modulator = OfdmModulator::new(&mut planner, num_subcarriers, cyclic_prefix_length)?;
        let demodulator = OfdmDemodulator::new(&mut planner, num_subcarriers, cyclic_prefix_length)?;

        let model = Self {
            num_subcarriers,
            num_symbols: require_positive("num_symbols", num_symbols)?,
            num_antennas: require_positive("num_antennas", num_antennas)?,
            cyclic_prefix_length,
            modulator,
            demodulator,
            core: ModelCore::new(channel_type, modulation_type)?,
        };

        info!(
            "OFDM model: {} subcarriers, {} symbols, {} antennas, CP {}, {} / {}",
            num_subcarriers, num_symbols, num_antennas, cyclic_prefix_length, channel_type, modulation_type
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

    pub fn cyclic_prefix_length(&self) -> usize {
        self.cyclic_prefix_length
    }

    /// Time-domain samples per OFDM symbol, prefix included
    pub fn symbol_length(&self) -> usize {
        self.modulator.symbol_length()
    }

    /// Send every (symbol, antenna) column through modulator and demodulator
    fn air_interface(&self, signal: &Signal) -> Result<Signal, ChannelError> {
        let input = as_subcarrier_view(signal)?;
        let (num_subcarriers, num_symbols, num_antennas) = input.dim();
        let mut output = Array3::<Complex64>::zeros((num_subcarriers, num_symbols, num_antennas));

        for j in 0..num_symbols {
            for k in 0..num_antennas {
                let column: Vec<Complex64> = input.slice(s![.., j, k]).to_vec();
                let time_samples = self.modulator.modulate_symbol(&column)?;
                let recovered = self.demodulator.demodulate_symbol(&time_samples)?;
                output.slice_mut(s![.., j, k]).assign(&ndarray::ArrayView1::from(&recovered[..]));
            }
        }

        debug!(
            "OFDM air interface: {} symbols x {} antennas, {} samples per symbol",
            num_symbols,
            num_antennas,
            self.symbol_length()
        );
        Ok(output.into_dyn())
    }
}

impl fmt::Debug for OfdmModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OfdmModel")
            .field("num_subcarriers", &self.num_subcarriers)
            .field("num_symbols", &self.num_symbols)
            .field("num_antennas", &self.num_antennas)
            .field("cyclic_prefix_length", &self.cyclic_prefix_length)
            .field("core", &self.core)
            .finish()
    }
}

impl ChannelModel for OfdmModel {
    fn topology(&self) -> Topology {
        Topology::Ofdm
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
        let faded = propagate_subcarriers(matrix, signal)?;
        self.air_interface(&faded)
    }

    fn equalize_signal(&self, signal: &Signal) -> Result<Signal, ChannelError> {
        let matrix = self.generate_channel_matrix();
        equalize_subcarriers(matrix, signal, self.core.singular_policy())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RasModel;
    use crate::propagation::signal_energy;
    use crate::signal::signal_from_real;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn max_error(a: &Signal, b: &Signal) -> f64 {
        a.iter().zip(b.iter()).map(|(x, y)| (x - y).norm()).fold(0.0, f64::max)
    }

    #[test]
    fn test_cyclic_prefix_insertion() {
        let mut planner = FftPlanner::new();
        let modulator = OfdmModulator::new(&mut planner, 8, 2).unwrap();
        let freq: Vec<Complex64> = (0..8).map(|i| Complex64::new(i as f64, -(i as f64))).collect();

        let time = modulator.modulate_symbol(&freq).unwrap();
        assert_eq!(time.len(), 10);
        assert_eq!(modulator.symbol_length(), 10);
        // Prefix repeats the tail of the symbol
        assert_eq!(time[0], time[8]);
        assert_eq!(time[1], time[9]);
    }

    #[test]
    fn test_modulate_demodulate_round_trip() {
        let mut planner = FftPlanner::new();
        let modulator = OfdmModulator::new(&mut planner, 16, 4).unwrap();
        let demodulator = OfdmDemodulator::new(&mut planner, 16, 4).unwrap();
        let freq: Vec<Complex64> = (0..16).map(|i| Complex64::new((i % 3) as f64 - 1.0, 0.5)).collect();

        let time = modulator.modulate_symbol(&freq).unwrap();
        let recovered = demodulator.demodulate_symbol(&time).unwrap();
        for (a, b) in freq.iter().zip(recovered.iter()) {
            assert!((a - b).norm() < 1e-12);
        }

        assert!(demodulator.demodulate_symbol(&time[1..]).is_err());
        assert!(modulator.modulate_symbol(&freq[1..]).is_err());
    }

    #[test]
    fn test_cp_longer_than_symbol_rejected() {
        assert!(matches!(
            OfdmModel::new(8, 4, 2, ChannelType::Rayleigh, ModulationType::Qpsk, 9),
            Err(ChannelError::InvalidParameter(_))
        ));
        assert!(OfdmModel::new(8, 4, 2, ChannelType::Rayleigh, ModulationType::Qpsk, 8).is_ok());
        assert!(OfdmModel::new(8, 4, 2, ChannelType::Rayleigh, ModulationType::Qpsk, 0).is_ok());
    }

    #[test]
    fn test_ofdm_shapes_and_round_trip() {
        let model = OfdmModel::new(32, 6, 2, ChannelType::Rayleigh, ModulationType::Qpsk, 8)
            .unwrap()
            .with_noise_variance(0.0)
            .unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(9);

        let tx = model.generate_random_signal(&mut rng);
        assert_eq!(tx.shape(), &[32, 6, 2]);

        let rx = model.apply_channel(&tx).unwrap();
        assert_eq!(rx.shape(), tx.shape());
        assert_eq!(model.channel_matrix().unwrap().shape(), vec![32, 2, 2]);

        let eq = model.equalize_signal(&model.add_noise(&rx, &mut rng)).unwrap();
        assert!(max_error(&tx, &eq) < 1e-6);
    }

    #[test]
    fn test_cyclic_prefix_matches_ras_channel() {
        let ofdm = OfdmModel::new(16, 3, 2, ChannelType::Rician, ModulationType::Qam16, 4).unwrap();
        let ras = RasModel::new(16, 3, 2, ChannelType::Rician, ModulationType::Qam16).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(10);

        let tx = ofdm.generate_random_signal(&mut rng);
        let through_ofdm = ofdm.apply_channel(&tx).unwrap();
        let through_ras = ras.apply_channel(&tx).unwrap();
        assert!(max_error(&through_ofdm, &through_ras) < 1e-12);
    }

    #[test]
    fn test_air_interface_preserves_energy() {
        let model = OfdmModel::new(4, 1, 1, ChannelType::Rayleigh, ModulationType::Qpsk, 1).unwrap();
        let signal = signal_from_real(&[4, 1, 1], &[1.0, -1.0, 3.0, -3.0]).unwrap();
        let out = model.air_interface(&signal).unwrap();
        assert!((signal_energy(&out) - signal_energy(&signal)).abs() < 1e-9);
    }
}
