//! Noise Injection
//!
//! Complex AWGN: real and imaginary parts are independent zero-mean normals
//! with standard deviation sqrt(noise_variance / 2).

use crate::{ChannelError, Signal};
use rand::Rng;
use rand_distr::{Distribution, Normal};

/// Complex AWGN source with fixed variance
#[derive(Debug, Clone, Copy)]
pub struct NoiseInjector {
    variance: f64,
    distr: Normal<f64>,
}

impl NoiseInjector {
    /// Create a noise injector with total (complex) variance `variance`
    pub fn new(variance: f64) -> Result<Self, ChannelError> {
        if !variance.is_finite() || variance < 0.0 {
            return Err(ChannelError::InvalidParameter(format!(
                "Noise variance must be finite and non-negative, got {}",
                variance
            )));
        }

        let distr = Normal::new(0.0, (variance / 2.0).sqrt())
            .map_err(|e| ChannelError::InvalidParameter(format!("Noise distribution: {}", e)))?;

        Ok(Self { variance, distr })
    }

    pub fn variance(&self) -> f64 {
        self.variance
    }

    /// Return `signal` plus noise, same shape
    pub fn add_noise<R: Rng + ?Sized>(&self, signal: &Signal, rng: &mut R) -> Signal {
        if self.variance == 0.0 {
            return signal.clone();
        }

        signal.mapv(|s| {
            let re = self.distr.sample(rng);
            let im = self.distr.sample(rng);
            s + num_complex::Complex64::new(re, im)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{ArrayD, IxDyn};
    use num_complex::Complex64;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_invalid_variance() {
        assert!(NoiseInjector::new(-0.1).is_err());
        assert!(NoiseInjector::new(f64::NAN).is_err());
        assert!(NoiseInjector::new(f64::INFINITY).is_err());
        assert!(NoiseInjector::new(0.0).is_ok());
    }

    #[test]
    fn test_zero_noise_is_identity() {
        let noise = NoiseInjector::new(0.0).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let signal = ArrayD::from_elem(IxDyn(&[3, 4, 2]), Complex64::new(1.0, 0.0));
        assert_eq!(noise.add_noise(&signal, &mut rng), signal);
    }

    #[test]
    fn test_noise_statistics() {
        let variance = 0.1;
        let noise = NoiseInjector::new(variance).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        let signal = ArrayD::from_elem(IxDyn(&[100, 100]), Complex64::new(0.0, 0.0));

        let noisy = noise.add_noise(&signal, &mut rng);
        assert_eq!(noisy.shape(), signal.shape());

        let n = noisy.len() as f64;
        let mean_re = noisy.iter().map(|s| s.re).sum::<f64>() / n;
        let mean_im = noisy.iter().map(|s| s.im).sum::<f64>() / n;
        let power = noisy.iter().map(|s| s.norm_sqr()).sum::<f64>() / n;
        let power_re = noisy.iter().map(|s| s.re * s.re).sum::<f64>() / n;

        assert!(mean_re.abs() < 0.01 && mean_im.abs() < 0.01);
        assert!((power - variance).abs() < 0.005, "power {}", power);
        assert!((power_re - variance / 2.0).abs() < 0.005, "real power {}", power_re);
    }
}
