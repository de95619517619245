use crate::preamble::{LONG_PREAMBLE, LTS_LEN};
use num::Complex;

/// Matched filter for the long training sequence. Output `i` is the correlation of
/// `input[i..i + LTS_LEN]` with the known LTS, so every output needs `LTS_LEN - 1` samples of
/// lookahead.
pub struct Correlator {
    /// Time reversed conjugate of the LTS
    taps: Vec<Complex<f32>>,
    /// Scratch space for the filter output. Never grows beyond the capacity given in `new`
    out: Vec<Complex<f32>>,
    capacity: usize,
}

impl Correlator {
    /// `capacity` is the maximum number of outputs computed per call
    pub fn new(capacity: usize) -> Self {
        Self {
            taps: LONG_PREAMBLE.iter().rev().map(|x| x.conj()).collect(),
            out: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Number of valid output positions for `n` input samples
    pub fn num_outputs(&self, n: usize) -> usize {
        self.capacity.min(n.saturating_sub(LTS_LEN - 1))
    }

    /// Filter as much of `input` as possible and return the outputs
    pub fn filter(&mut self, input: &[Complex<f32>]) -> &[Complex<f32>] {
        let n = self.num_outputs(input.len());
        self.out.clear();
        for i in 0..n {
            let window = &input[i..i + LTS_LEN];
            self.out.push(
                self.taps
                    .iter()
                    .zip(window.iter().rev())
                    .map(|(t, x)| t * x)
                    .sum::<Complex<f32>>(),
            );
        }
        &self.out
    }
}
