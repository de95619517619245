//! Synthetic 802.11 style frames for testing the synchronizer without a radio:
//! <short preamble> <long preamble> [<cyclic prefix> <payload symbol> ...]

use crate::preamble::{
    long_preamble, short_training_freq, used_subcarriers, LTS_LEN, STS_LEN, STS_REPEATS,
};
use crate::sync::CP_LEN;
use num::{Complex, Zero};
use rand::Rng;
use rustfft::{FFTplanner, FFT};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Number of payload symbols per frame
    pub num_symbols: usize,
    /// Maximum amplitude of the uniform noise added to the real and imaginary parts
    pub noise: f32,
    /// Noise-only samples in front of every frame
    pub gap: usize,
    /// Frequency offsets are drawn from [-max_cfo, max_cfo] radians per sample
    pub max_cfo: f32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            num_symbols: 4,
            noise: 0.01,
            gap: 400,
            max_cfo: 0.005,
        }
    }
}

pub struct Frame {
    /// The samples as received
    pub samples: Vec<Complex<f32>>,
    /// Index in `samples` of the first cyclic prefix after the long preamble
    pub payload_start: usize,
    /// Payload symbols before frequency offset and noise, without cyclic prefix
    pub symbols: Vec<Vec<Complex<f32>>>,
    /// Frequency offset applied, in radians per sample
    pub cfo: f32,
}

pub struct FrameGenerator<R: Rng> {
    config: GeneratorConfig,
    rng: R,
    ifft: Arc<dyn FFT<f32>>,
    /// Normalizes IFFT output to unit power per sample
    scale: f32,
}

impl<R: Rng> FrameGenerator<R> {
    pub fn new(config: &GeneratorConfig, rng: R) -> Self {
        let mut planner = FFTplanner::new(true);
        Self {
            config: config.clone(),
            rng,
            ifft: planner.plan_fft(LTS_LEN),
            scale: 1. / (used_subcarriers().len() as f32).sqrt(),
        }
    }

    fn time_domain(&self, freq: &[Complex<f32>]) -> Vec<Complex<f32>> {
        let mut input = freq.to_vec();
        let mut out = vec![Complex::zero(); LTS_LEN];
        self.ifft.process(&mut input, &mut out);
        out.iter().map(|x| x * self.scale).collect()
    }

    /// 10 repeats of the short training sequence
    pub fn short_preamble(&self) -> Vec<Complex<f32>> {
        let sts = self.time_domain(&short_training_freq());
        sts[..STS_LEN]
            .iter()
            .cycle()
            .take(STS_REPEATS * STS_LEN)
            .cloned()
            .collect()
    }

    /// A payload symbol with random BPSK on every used subcarrier
    pub fn symbol(&mut self) -> Vec<Complex<f32>> {
        let mut freq = vec![Complex::zero(); LTS_LEN];
        for k in used_subcarriers() {
            freq[k] = match self.rng.gen() {
                true => Complex::new(1., 0.),
                false => Complex::new(-1., 0.),
            };
        }
        self.time_domain(&freq)
    }

    pub fn noise(&mut self, n: usize) -> Vec<Complex<f32>> {
        let a = self.config.noise;
        if a <= 0. {
            return vec![Complex::zero(); n];
        }
        (0..n)
            .map(|_| Complex::new(self.rng.gen_range(-a, a), self.rng.gen_range(-a, a)))
            .collect()
    }

    pub fn random_cfo(&mut self) -> f32 {
        let m = self.config.max_cfo;
        if m <= 0. {
            0.
        } else {
            self.rng.gen_range(-m, m)
        }
    }

    /// Build a frame rotated by `cfo` radians per sample, counting from its first sample
    pub fn frame(&mut self, cfo: f32) -> Frame {
        let mut samples = self.short_preamble();
        samples.extend(long_preamble());
        let payload_start = samples.len();

        let mut symbols = Vec::with_capacity(self.config.num_symbols);
        for _ in 0..self.config.num_symbols {
            let symbol = self.symbol();
            // Cyclic prefix
            samples.extend_from_slice(&symbol[LTS_LEN - CP_LEN as usize..]);
            samples.extend_from_slice(&symbol);
            symbols.push(symbol);
        }

        let noise = self.noise(samples.len());
        let samples = samples
            .iter()
            .zip(noise)
            .enumerate()
            .map(|(i, (s, n))| s * Complex::new(0., cfo * i as f32).exp() + n)
            .collect();

        Frame {
            samples,
            payload_start,
            symbols,
            cfo,
        }
    }

    /// `gap` samples of noise followed by a frame with a random frequency offset. Returns the
    /// burst and the index where the frame begins
    pub fn burst(&mut self) -> (Vec<Complex<f32>>, usize, Frame) {
        let mut burst = self.noise(self.config.gap);
        let cfo = self.random_cfo();
        let frame = self.frame(cfo);
        let start = burst.len();
        burst.extend_from_slice(&frame.samples);
        (burst, start, frame)
    }
}
