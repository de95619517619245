//! Known training sequences of the 802.11 OFDM preamble.
//!
//! Long preamble:
//!  - <Guard Interval> 2 * <Long Training Sequence>
//!    The guard interval is 1/2 the size of the LTS
//!
//! Short preamble:
//!  - 10 repeats of a 16 sample short training sequence

use num::Complex;

/// Number of samples in one long training sequence
pub const LTS_LEN: usize = 64;
/// Number of samples in one short training sequence
pub const STS_LEN: usize = 16;
/// The short preamble is this many repeats of the short training sequence
pub const STS_REPEATS: usize = 10;
/// Guard interval in front of the two long training sequences
pub const LTS_GUARD_LEN: usize = LTS_LEN / 2;

/// Subcarriers -26..=26 of the long training sequence. Multiply by 1 to get the BPSK symbol.
pub const LONG_SUBCARRIERS: [i8; 53] = [
    1, 1, -1, -1, 1, 1, -1, 1, -1, 1, 1, 1, 1, 1, 1, -1, -1, 1, 1, -1, 1, -1, 1, 1, 1, 1, 0, 1, -1,
    -1, 1, 1, -1, 1, -1, 1, -1, -1, -1, -1, -1, 1, 1, -1, -1, 1, -1, 1, -1, 1, 1, 1, 1,
];

/// Subcarriers -26..=26 of the short training sequence, in units of sqrt(13/6) * (1 + j)
pub const SHORT_SUBCARRIERS: [i8; 53] = [
    0, 0, 1, 0, 0, 0, -1, 0, 0, 0, 1, 0, 0, 0, -1, 0, 0, 0, -1, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0,
    -1, 0, 0, 0, -1, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0,
];

/// Time domain long training sequence the synchronizer correlates against
pub const LONG_PREAMBLE: [Complex<f32>; LTS_LEN] = [
    Complex { re: 1.3868, im: 0.0000 }, Complex { re: -0.0455, im: -1.0679 },
    Complex { re: 0.3528, im: -0.9865 }, Complex { re: 0.8594, im: 0.7348 },
    Complex { re: 0.1874, im: 0.2475 }, Complex { re: 0.5309, im: -0.7784 },
    Complex { re: -1.0218, im: -0.4897 }, Complex { re: -0.3401, im: -0.9423 },
    Complex { re: 0.8657, im: -0.2298 }, Complex { re: 0.4734, im: 0.0362 },
    Complex { re: 0.0088, im: -1.0207 }, Complex { re: -1.2142, im: -0.4205 },
    Complex { re: 0.2172, im: -0.5195 }, Complex { re: 0.5207, im: -0.1326 },
    Complex { re: -0.1995, im: 1.4259 }, Complex { re: 1.0583, im: -0.0363 },
    Complex { re: 0.5547, im: -0.5547 }, Complex { re: 0.3277, im: 0.8728 },
    Complex { re: -0.5077, im: 0.3488 }, Complex { re: -1.1650, im: 0.5789 },
    Complex { re: 0.7297, im: 0.8197 }, Complex { re: 0.6173, im: 0.1253 },
    Complex { re: -0.5353, im: 0.7214 }, Complex { re: -0.5011, im: -0.1935 },
    Complex { re: -0.3110, im: -1.3392 }, Complex { re: -1.0818, im: -0.1470 },
    Complex { re: -1.1300, im: -0.1820 }, Complex { re: 0.6663, im: -0.6571 },
    Complex { re: -0.0249, im: 0.4773 }, Complex { re: -0.8155, im: 1.0218 },
    Complex { re: 0.8140, im: 0.9396 }, Complex { re: 0.1090, im: 0.8662 },
    Complex { re: -1.3868, im: 0.0000 }, Complex { re: 0.1090, im: -0.8662 },
    Complex { re: 0.8140, im: -0.9396 }, Complex { re: -0.8155, im: -1.0218 },
    Complex { re: -0.0249, im: -0.4773 }, Complex { re: 0.6663, im: 0.6571 },
    Complex { re: -1.1300, im: 0.1820 }, Complex { re: -1.0818, im: 0.1470 },
    Complex { re: -0.3110, im: 1.3392 }, Complex { re: -0.5011, im: 0.1935 },
    Complex { re: -0.5353, im: -0.7214 }, Complex { re: 0.6173, im: -0.1253 },
    Complex { re: 0.7297, im: -0.8197 }, Complex { re: -1.1650, im: -0.5789 },
    Complex { re: -0.5077, im: -0.3488 }, Complex { re: 0.3277, im: -0.8728 },
    Complex { re: 0.5547, im: 0.5547 }, Complex { re: 1.0583, im: 0.0363 },
    Complex { re: -0.1995, im: -1.4259 }, Complex { re: 0.5207, im: 0.1326 },
    Complex { re: 0.2172, im: 0.5195 }, Complex { re: -1.2142, im: 0.4205 },
    Complex { re: 0.0088, im: 1.0207 }, Complex { re: 0.4734, im: -0.0362 },
    Complex { re: 0.8657, im: 0.2298 }, Complex { re: -0.3401, im: 0.9423 },
    Complex { re: -1.0218, im: 0.4897 }, Complex { re: 0.5309, im: 0.7784 },
    Complex { re: 0.1874, im: -0.2475 }, Complex { re: 0.8594, im: -0.7348 },
    Complex { re: 0.3528, im: 0.9865 }, Complex { re: -0.0455, im: 1.0679 },
];

/// Lay out subcarriers -26..=26 in FFT bin order (DC at bin 0, negative frequencies at the top)
fn to_fft_order(subcarriers: &[i8; 53], scale: Complex<f32>) -> Vec<Complex<f32>> {
    let mut bins = vec![Complex::new(0., 0.); LTS_LEN];
    for (i, s) in subcarriers.iter().enumerate() {
        let k = (i as i64 - 26).rem_euclid(LTS_LEN as i64) as usize;
        bins[k] = scale * *s as f32;
    }
    bins
}

/// Frequency domain long training sequence in FFT bin order
pub fn long_training_freq() -> Vec<Complex<f32>> {
    to_fft_order(&LONG_SUBCARRIERS, Complex::new(1., 0.))
}

/// Frequency domain short training sequence in FFT bin order
pub fn short_training_freq() -> Vec<Complex<f32>> {
    let scale = (13. / 6f32).sqrt();
    to_fft_order(&SHORT_SUBCARRIERS, Complex::new(scale, scale))
}

/// Subcarriers that carry energy in an OFDM symbol (everything but DC and the guard bands)
pub fn used_subcarriers() -> Vec<usize> {
    long_training_freq()
        .iter()
        .enumerate()
        .filter(|(_, x)| x.re != 0.)
        .map(|(k, _)| k)
        .collect()
}

/// The complete long preamble as transmitted: guard interval followed by two LTS
pub fn long_preamble() -> Vec<Complex<f32>> {
    let mut res = Vec::with_capacity(LTS_GUARD_LEN + 2 * LTS_LEN);
    res.extend_from_slice(&LONG_PREAMBLE[LTS_LEN - LTS_GUARD_LEN..]);
    res.extend_from_slice(&LONG_PREAMBLE);
    res.extend_from_slice(&LONG_PREAMBLE);
    res
}
