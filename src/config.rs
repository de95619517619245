use crate::error::SyncError;
use num::Complex;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Number of samples correlated against the LTS before deciding where the frame starts
    pub sync_length: usize,
    /// Log every detected frame along with its frequency offset
    pub log: bool,
    /// Log consumed/produced counts on every call
    pub debug: bool,
    /// Sample rate in Hz. Only used to report the frequency offset in Hz
    pub sample_rate: f64,
    /// Identity attached to every `ofdm_start` tag we emit
    pub name: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            sync_length: 320,
            log: false,
            debug: false,
            sample_rate: 20e6,
            name: "sync_long".to_string(),
        }
    }
}

impl SyncConfig {
    pub fn from_json(json: &str) -> Result<Self, SyncError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// A file storing samples is just a list of numbers, each on a separate line. Even numbers are
/// the real part and odd ones are the imaginary
pub fn filename_to_cplx_vec(fname: &str) -> Result<Vec<Complex<f32>>, SyncError> {
    str_to_cplx_vec(&std::fs::read_to_string(fname)?)
}

pub fn str_to_cplx_vec(str_data: &str) -> Result<Vec<Complex<f32>>, SyncError> {
    let mut f32_data = Vec::new();
    for (line, s) in str_data.split('\n').enumerate() {
        let s = s.trim();
        if s.is_empty() {
            continue;
        }
        let x: f32 = s.parse().map_err(|_| SyncError::BadSample {
            line: line + 1,
            text: s.to_string(),
        })?;
        f32_data.push(x);
    }

    if f32_data.len() % 2 != 0 {
        return Err(SyncError::OddSampleCount(f32_data.len()));
    }
    Ok(f32_data
        .chunks(2)
        .map(|x| Complex::new(x[0], x[1]))
        .collect())
}
