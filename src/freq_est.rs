use num::{Complex, Zero};
use std::f64::consts::PI;

/// Lag (in samples) of the auto-correlation. Equal to the short training sequence period
pub const LAG: usize = 16;
/// The estimate is taken this many samples before the frame start: 160 samples of short preamble
/// plus 17, so that it only integrates over the short preamble
pub const LOOKBACK: usize = 160 + 17;

/// Running lag-16 auto-correlation. The accumulator is never reset within a sync window; instead
/// its value at every offset is remembered so that, once the frame start is known, we can use the
/// value from before the long preamble started.
pub struct FreqEstimator {
    acc: Complex<f32>,
    history: Vec<Complex<f32>>,
}

impl FreqEstimator {
    /// `window` is the number of offsets we have to remember (the sync length)
    pub fn new(window: usize) -> Self {
        Self {
            acc: Complex::zero(),
            history: vec![Complex::zero(); window],
        }
    }

    /// Add `samp * conj(lagged)` to the running sum and remember it at `offset`
    pub fn push(&mut self, offset: usize, samp: Complex<f32>, lagged: Complex<f32>) {
        self.acc = self.acc + samp * lagged.conj();
        self.history[offset] = self.acc;
    }

    /// Replace the accumulator with the value it had `LOOKBACK` samples before `frame_start` and
    /// return it
    pub fn recall(&mut self, frame_start: usize) -> Complex<f32> {
        let idx = frame_start
            .saturating_sub(LOOKBACK)
            .min(self.history.len() - 1);
        self.acc = self.history[idx];
        self.acc
    }

    pub fn current(&self) -> Complex<f32> {
        self.acc
    }

    pub fn reset(&mut self) {
        self.acc = Complex::zero();
    }
}

/// Per-sample phase correction for the given auto-correlation. Since the signal is rotated by
/// `-arg(estimate) / LAG` per sample, this is the rotation that undoes it. Zero estimates give
/// zero correction.
pub fn phase_per_sample(estimate: Complex<f32>) -> f32 {
    estimate.arg() / LAG as f32
}

/// Carrier frequency offset in Hz that the estimate corrects for. This has the opposite sign of
/// the phase correction: a carrier running fast yields a positive offset
pub fn carrier_offset_hz(estimate: Complex<f32>, sample_rate: f64) -> f64 {
    -phase_per_sample(estimate) as f64 * sample_rate / (2. * PI)
}

/// Rotation that corrects the sample at `offset` given a per-sample phase correction
pub fn rotation(offset: i64, phase_per_sample: f32) -> Complex<f32> {
    let phase = (offset as f64 * phase_per_sample as f64) % (2. * PI);
    Complex::new(0., phase as f32).exp()
}

/// Take a buffer whose first sample sits at `offset` and correct it with the per-sample phase
/// correction
pub fn correct_cfo(samps: &[Complex<f32>], phase_per_sample: f32, offset: i64) -> Vec<Complex<f32>> {
    samps
        .iter()
        .enumerate()
        .map(|(i, s)| s * rotation(offset + i as i64, phase_per_sample))
        .collect()
}
