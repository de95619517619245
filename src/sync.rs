//! Fine synchronization on the long preamble. The synchronizer takes two copies of the same
//! stream: `input` is used to find the frame and estimate the frequency offset, while `delayed`
//! (the same stream delayed by the sync length upstream) is what gets corrected and copied to the
//! output once the frame start is known.

use crate::config::SyncConfig;
use crate::correlator::Correlator;
use crate::error::SyncError;
use crate::frame_search::{search_frame_start, CANDIDATES};
use crate::freq_est::{carrier_offset_hz, phase_per_sample, rotation, FreqEstimator, LAG};
use crate::preamble::LTS_LEN;
use crate::tags::{first_in_range, ResyncTag, StartTag};
use log::{debug, info};
use num::{Complex, Zero};

/// Length of an OFDM symbol including its cyclic prefix
pub const SYMBOL_LEN: i64 = 80;
/// Length of the cyclic prefix
pub const CP_LEN: i64 = 16;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncState {
    /// Correlating against the LTS until the sync window fills up
    Sync,
    /// Copying frequency corrected payload with the cyclic prefix stripped
    Copy,
    /// A new frame was announced while copying. Pad the output with zeros up to the next symbol
    /// boundary, then go back to `Sync`
    Reset,
}

/// What the last frame start search decided
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SyncReport {
    /// Frame start relative to the beginning of the sync window
    pub frame_start: usize,
    /// The lag-16 auto-correlation the correction is derived from
    pub freq_est: Complex<f32>,
    /// Phase (in radians) added to every successive output sample
    pub phase_per_sample: f32,
}

/// Result of one call to `SyncLong::work`
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WorkStatus {
    /// Items consumed from both inputs
    pub consumed: usize,
    /// Items written to the output
    pub produced: usize,
    /// Set if one of the produced items is the first payload sample of a frame
    pub start: Option<StartTag>,
}

struct Step {
    consumed: usize,
    produced: usize,
    start: Option<StartTag>,
    next: SyncState,
}

pub struct SyncLong {
    config: SyncConfig,
    state: SyncState,
    /// Offset since the start of the current sync window
    offset: i64,
    frame_start: i64,
    correlator: Correlator,
    freq: FreqEstimator,
    /// `(magnitude, offset)` of the correlation at every offset of the sync window
    cor: Vec<(f32, usize)>,
    nitems_read: u64,
    nitems_written: u64,
    last_sync: Option<SyncReport>,
}

impl SyncLong {
    pub fn new(config: &SyncConfig) -> Result<Self, SyncError> {
        if config.sync_length < CANDIDATES {
            return Err(SyncError::SyncLengthTooShort(
                config.sync_length,
                CANDIDATES,
            ));
        }
        Ok(Self {
            config: config.clone(),
            state: SyncState::Sync,
            offset: 0,
            frame_start: 0,
            correlator: Correlator::new(config.sync_length),
            freq: FreqEstimator::new(config.sync_length),
            cor: Vec::with_capacity(config.sync_length),
            nitems_read: 0,
            nitems_written: 0,
            last_sync: None,
        })
    }

    /// Minimum number of items needed on each input to produce `noutput` items
    pub fn forecast(&self, noutput: usize) -> usize {
        match self.state {
            // Need at least a symbol to correlate with the pattern
            SyncState::Sync => LTS_LEN,
            SyncState::Copy | SyncState::Reset => noutput,
        }
    }

    /// Process as much of `input`/`delayed` as possible, writing into `output`. `tags` may hold
    /// re-sync tags anywhere in the stream; only the earliest one within the available input is
    /// acted upon. The caller must drop the consumed prefix of both inputs before the next call.
    pub fn work(
        &mut self,
        input: &[Complex<f32>],
        delayed: &[Complex<f32>],
        output: &mut [Complex<f32>],
        tags: &[ResyncTag],
    ) -> Result<WorkStatus, SyncError> {
        let avail = input.len().min(delayed.len());
        let mut ninput = avail;

        let nread = self.nitems_read;
        if let Some(tag) = first_in_range(tags, nread, nread + avail as u64) {
            if tag.offset > nread {
                // Never run into the next frame within one call
                ninput = (tag.offset - nread) as usize;
            } else if self.state == SyncState::Copy {
                self.state = SyncState::Reset;
            }
        }

        let step = match self.state {
            SyncState::Sync => self.sync(&input[..avail], ninput)?,
            SyncState::Copy => self.copy(&delayed[..ninput], output),
            SyncState::Reset => self.reset(output),
        };

        if self.config.debug {
            debug!(
                "{}: state {:?} -> {:?}, ninput {} noutput {}, consumed {} produced {}",
                self.config.name,
                self.state,
                step.next,
                ninput,
                output.len(),
                step.consumed,
                step.produced
            );
        }

        self.state = step.next;
        self.nitems_read += step.consumed as u64;
        self.nitems_written += step.produced as u64;
        Ok(WorkStatus {
            consumed: step.consumed,
            produced: step.produced,
            start: step.start,
        })
    }

    /// Correlate and accumulate the frequency estimate. Samples past `ninput` are only used as
    /// correlation lookahead, never consumed.
    fn sync(&mut self, input: &[Complex<f32>], ninput: usize) -> Result<Step, SyncError> {
        let sync_length = self.config.sync_length as i64;
        let cor = self.correlator.filter(input);

        let mut i = 0;
        let mut full = false;
        while i < ninput && i + LTS_LEN - 1 < input.len() {
            let offset = self.offset as usize;
            self.freq.push(offset, input[i], input[i + LAG]);
            self.cor.push((cor[i].norm(), offset));

            i += 1;
            self.offset += 1;

            if self.offset == sync_length {
                full = true;
                break;
            }
        }

        let next = if full { self.lock()? } else { SyncState::Sync };
        Ok(Step {
            consumed: i,
            produced: 0,
            start: None,
            next,
        })
    }

    /// Sync window is full. Decide where the frame starts and which frequency estimate to use
    fn lock(&mut self) -> Result<SyncState, SyncError> {
        let frame_start = search_frame_start(&self.cor, self.config.sync_length)?;
        self.cor.clear();

        let freq_est = self.freq.recall(frame_start);
        self.frame_start = frame_start as i64;
        self.offset = 0;
        self.last_sync = Some(SyncReport {
            frame_start,
            freq_est,
            phase_per_sample: phase_per_sample(freq_est),
        });

        if self.config.log {
            info!(
                "{}: frame at {} - carrier offset ({} MHz): {:.1} Hz",
                self.config.name,
                frame_start,
                self.config.sample_rate / 1e6,
                carrier_offset_hz(freq_est, self.config.sample_rate)
            );
        }
        Ok(SyncState::Copy)
    }

    fn copy(&mut self, delayed: &[Complex<f32>], output: &mut [Complex<f32>]) -> Step {
        let phase = phase_per_sample(self.freq.current());
        let mut start = None;
        let (mut i, mut o) = (0, 0);

        while i < delayed.len() {
            let rel = self.offset - self.frame_start;
            if rel >= 0 && rel % SYMBOL_LEN >= CP_LEN {
                if o >= output.len() {
                    break;
                }
                if rel == CP_LEN {
                    // Nothing is produced between the frame start and its first payload sample
                    debug_assert_eq!(o, 0);
                    start = Some(StartTag::new(
                        self.nitems_written + o as u64,
                        &self.config.name,
                    ));
                }
                output[o] = delayed[i] * rotation(self.offset, phase);
                o += 1;
            }
            i += 1;
            self.offset += 1;
        }

        Step {
            consumed: i,
            produced: o,
            start,
            next: SyncState::Copy,
        }
    }

    /// Doesn't consume anything; only finishes the current symbol with zeros
    fn reset(&mut self, output: &mut [Complex<f32>]) -> Step {
        let mut o = 0;
        let mut next = SyncState::Reset;

        while o < output.len() {
            let rel = (self.offset - self.frame_start) % SYMBOL_LEN;
            if rel == 0 {
                self.offset = 0;
                self.freq.reset();
                next = SyncState::Sync;
                break;
            } else if rel >= CP_LEN {
                output[o] = Complex::zero();
                o += 1;
            }
            self.offset += 1;
        }

        Step {
            consumed: 0,
            produced: o,
            start: None,
            next,
        }
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Offset within the current sync window
    pub fn offset(&self) -> i64 {
        self.offset
    }

    /// The current value of the frequency accumulator
    pub fn freq_estimate(&self) -> Complex<f32> {
        self.freq.current()
    }

    pub fn last_sync(&self) -> Option<&SyncReport> {
        self.last_sync.as_ref()
    }

    pub fn nitems_read(&self) -> u64 {
        self.nitems_read
    }

    pub fn nitems_written(&self) -> u64 {
        self.nitems_written
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sim::{FrameGenerator, GeneratorConfig};
    use crate::stream::StreamDriver;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const SYNC_LENGTH: usize = 320;

    fn config() -> SyncConfig {
        SyncConfig {
            sync_length: SYNC_LENGTH,
            ..SyncConfig::default()
        }
    }

    /// A noiseless frame starting at sample 0 followed by `tail` zeros, and the same stream
    /// delayed by the sync length
    fn clean_streams(
        cfo: f32,
        tail: usize,
    ) -> (Vec<Complex<f32>>, Vec<Complex<f32>>, Vec<Vec<Complex<f32>>>) {
        let gen_config = GeneratorConfig {
            noise: 0.,
            ..GeneratorConfig::default()
        };
        let mut gen = FrameGenerator::new(&gen_config, StdRng::seed_from_u64(7));
        let frame = gen.frame(cfo);
        let mut direct = frame.samples;
        direct.extend(vec![Complex::zero(); tail]);
        let mut delayed = vec![Complex::zero(); SYNC_LENGTH];
        delayed.extend_from_slice(&direct);
        delayed.truncate(direct.len());
        (direct, delayed, frame.symbols)
    }

    #[test]
    fn test_sync_length_too_short() {
        let config = SyncConfig {
            sync_length: CANDIDATES - 1,
            ..SyncConfig::default()
        };
        match SyncLong::new(&config) {
            Err(SyncError::SyncLengthTooShort(3, 4)) => (),
            _ => panic!("sync length of 3 accepted"),
        }
    }

    #[test]
    fn test_needs_a_full_lts_to_start() {
        let mut sync = SyncLong::new(&config()).unwrap();
        assert_eq!(sync.forecast(1000), LTS_LEN);

        let input = vec![Complex::new(1., 0.); LTS_LEN - 1];
        let mut out = vec![Complex::zero(); 100];
        let status = sync.work(&input, &input, &mut out, &[]).unwrap();
        assert_eq!(status, WorkStatus::default());

        // One more sample lets us correlate a single position
        let input = vec![Complex::new(1., 0.); LTS_LEN];
        let status = sync.work(&input, &input, &mut out, &[]).unwrap();
        assert_eq!(status.consumed, 1);
        assert_eq!(sync.offset(), 1);
        assert_eq!(sync.state(), SyncState::Sync);
    }

    /// Frequency offset is removed from the payload, cyclic prefixes are dropped and the first
    /// payload sample is tagged
    #[test]
    fn test_frequency_correction() {
        let cfo = 0.01;
        let (direct, delayed, symbols) = clean_streams(cfo, 2 * SYNC_LENGTH);
        let mut sync = SyncLong::new(&config()).unwrap();
        let mut out = vec![Complex::zero(); 1000];

        // Sync window: 10 STS, guard interval, LTS at 192 and 256
        let status = sync.work(&direct, &delayed, &mut out, &[]).unwrap();
        assert_eq!(status.consumed, SYNC_LENGTH);
        assert_eq!(status.produced, 0);
        assert_eq!(sync.state(), SyncState::Copy);
        assert_eq!(sync.forecast(500), 500);

        let report = *sync.last_sync().unwrap();
        assert_eq!(report.frame_start, 320);
        assert!((report.phase_per_sample + cfo).abs() < 1e-4);

        let status = sync
            .work(&direct[SYNC_LENGTH..], &delayed[SYNC_LENGTH..], &mut out, &[])
            .unwrap();
        assert_eq!(status.start, Some(StartTag::new(0, "sync_long")));
        assert!(status.produced >= 64 * symbols.len());

        for (x, y) in out.iter().zip(symbols.iter().flatten()) {
            assert!((x - y).norm() < 1e-3);
            if y.norm() > 0.1 {
                assert!((x / y).arg().abs() < 0.01);
            }
        }
    }

    #[test]
    fn test_cyclic_prefix_stripping() {
        let (direct, delayed, _) = clean_streams(0., 2000);
        let mut sync = SyncLong::new(&config()).unwrap();
        let mut out = vec![Complex::zero(); 1000];

        let status = sync
            .work(&direct[..SYNC_LENGTH + 63], &delayed[..SYNC_LENGTH + 63], &mut out, &[])
            .unwrap();
        assert_eq!(status.consumed, SYNC_LENGTH);
        assert_eq!(sync.last_sync().unwrap().frame_start, 320);

        // Up to the frame start nothing is produced
        let mut pos = SYNC_LENGTH;
        let status = sync
            .work(&direct[pos..pos + 320], &delayed[pos..pos + 320], &mut out, &[])
            .unwrap();
        assert_eq!((status.consumed, status.produced), (320, 0));
        assert!(status.start.is_none());
        pos += 320;

        let mut starts = 0;
        for &n in &[1, 3, 7] {
            let len = 80 * n;
            let status = sync
                .work(&direct[pos..pos + len], &delayed[pos..pos + len], &mut out, &[])
                .unwrap();
            assert_eq!(status.consumed, len);
            assert_eq!(status.produced, 64 * n);
            starts += status.start.iter().count();
            pos += len;
        }
        assert_eq!(starts, 1);
        assert_eq!(sync.nitems_written(), 64 * 11);
    }

    #[test]
    fn test_copy_stops_when_output_full() {
        let (direct, delayed, _) = clean_streams(0., 2000);
        let mut sync = SyncLong::new(&config()).unwrap();
        let mut out = vec![Complex::zero(); 10];
        sync.work(&direct, &delayed, &mut out, &[]).unwrap();

        // 320 before the frame, 16 cyclic prefix, then 10 payload samples
        let status = sync
            .work(&direct[SYNC_LENGTH..], &delayed[SYNC_LENGTH..], &mut out, &[])
            .unwrap();
        assert_eq!((status.consumed, status.produced), (346, 10));
        assert!(status.start.is_some());

        let status = sync
            .work(&direct[SYNC_LENGTH + 346..], &delayed[SYNC_LENGTH + 346..], &mut out, &[])
            .unwrap();
        assert_eq!((status.consumed, status.produced), (10, 10));
        assert!(status.start.is_none());
    }

    #[test]
    fn test_resync_tag_truncates_input() {
        let (direct, delayed, _) = clean_streams(0., 2000);
        let mut sync = SyncLong::new(&config()).unwrap();
        let mut out = vec![Complex::zero(); 1000];

        let tags = [ResyncTag { offset: 100 }];
        let status = sync.work(&direct, &delayed, &mut out, &tags).unwrap();
        assert_eq!(status.consumed, 100);
        assert_eq!(sync.state(), SyncState::Sync);

        // Tag at the very next sample doesn't disturb a synchronizer that is still syncing
        let status = sync
            .work(&direct[100..], &delayed[100..], &mut out, &tags)
            .unwrap();
        assert_eq!(status.consumed, SYNC_LENGTH - 100);
        assert_eq!(sync.state(), SyncState::Copy);

        // While copying, input stops right before the tag
        let tags = [ResyncTag { offset: 700 }];
        let status = sync
            .work(&direct[320..], &delayed[320..], &mut out, &tags)
            .unwrap();
        assert_eq!(status.consumed, 380);
        assert_eq!(sync.nitems_read(), 700);
        assert_eq!(sync.state(), SyncState::Copy);
    }

    #[test]
    fn test_resync_forces_reset() {
        let (direct, delayed, _) = clean_streams(0.02, 2000);
        let mut sync = SyncLong::new(&config()).unwrap();
        let mut out = vec![Complex::zero(); 1000];
        sync.work(&direct, &delayed, &mut out, &[]).unwrap();

        // Stop 37 samples into the second payload symbol's 80 sample period
        let pos = SYNC_LENGTH;
        let status = sync
            .work(&direct[pos..pos + 437], &delayed[pos..pos + 437], &mut out, &[])
            .unwrap();
        assert_eq!(status.produced, 64 + 21);
        assert!(sync.freq_estimate() != Complex::zero());

        let pos = pos + 437;
        let tags = [ResyncTag { offset: pos as u64 }];
        for x in out.iter_mut() {
            *x = Complex::new(1., 1.);
        }
        let status = sync
            .work(&direct[pos..], &delayed[pos..], &mut out, &tags)
            .unwrap();

        // Zeros for the remaining 43 samples of the symbol. Nothing consumed
        assert_eq!((status.consumed, status.produced), (0, 43));
        assert!(out[..43].iter().all(|x| *x == Complex::zero()));
        assert_eq!(sync.state(), SyncState::Sync);
        assert_eq!(sync.offset(), 0);
        assert_eq!(sync.freq_estimate(), Complex::zero());
        assert_eq!(sync.nitems_read(), pos as u64);

        // The next window starts at the tag
        let status = sync
            .work(&direct[pos..], &delayed[pos..], &mut out, &tags)
            .unwrap();
        assert_eq!(status.consumed, SYNC_LENGTH);
    }

    #[test]
    fn test_reset_across_calls() {
        let (direct, delayed, _) = clean_streams(0., 2000);
        let mut sync = SyncLong::new(&config()).unwrap();
        let mut out = vec![Complex::zero(); 1000];
        sync.work(&direct, &delayed, &mut out, &[]).unwrap();
        // 17 samples into the first symbol: one payload sample out
        let status = sync
            .work(&direct[320..657], &delayed[320..657], &mut out, &[])
            .unwrap();
        assert_eq!(status.produced, 1);

        let tags = [ResyncTag { offset: 657 }];
        let mut small = vec![Complex::zero(); 20];
        let status = sync
            .work(&direct[657..], &delayed[657..], &mut small, &tags)
            .unwrap();
        assert_eq!((status.consumed, status.produced), (0, 20));
        assert_eq!(sync.state(), SyncState::Reset);
        assert_eq!(sync.forecast(20), 20);

        // A reset synchronizer ignores further tags at the same offset. 63 zeros in total finish
        // the symbol
        for &produced in &[20, 20, 3] {
            assert_eq!(sync.state(), SyncState::Reset);
            let status = sync
                .work(&direct[657..], &delayed[657..], &mut small, &tags)
                .unwrap();
            assert_eq!((status.consumed, status.produced), (0, produced));
        }
        assert_eq!(sync.state(), SyncState::Sync);
    }

    /// Noise, then a tag, then two back-to-back LTS at 500 and 564 followed by four symbols.
    #[test]
    fn test_long_preamble_in_noise() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut noise = |n: usize| -> Vec<Complex<f32>> {
            (0..n)
                .map(|_| {
                    Complex::new(
                        rng.gen_range(-0.05f32, 0.05f32),
                        rng.gen_range(-0.05f32, 0.05f32),
                    )
                })
                .collect()
        };

        let mut stream = noise(448);
        stream.extend(noise(20));
        stream.extend(crate::preamble::long_preamble());
        assert_eq!(stream.len(), 628);
        let gen_config = GeneratorConfig {
            noise: 0.,
            ..GeneratorConfig::default()
        };
        let mut gen = FrameGenerator::new(&gen_config, StdRng::seed_from_u64(9));
        for _ in 0..4 {
            let symbol = gen.symbol();
            stream.extend_from_slice(&symbol[48..]);
            stream.extend(symbol);
        }
        // Enough for the delayed stream to reach the end of the last symbol
        stream.extend(noise(SYNC_LENGTH));
        assert_eq!(stream.len(), 1268);

        let mut driver = StreamDriver::new(&config(), 1).unwrap();
        driver.push(&stream);
        driver.push_tag(448);
        let aligned = driver.run().unwrap();

        // Window starts at the tag, so the LTS peaks are at 52 and 116
        let report = driver.sync().last_sync().unwrap();
        assert_eq!(448 + report.frame_start, 564 + 64);
        assert_eq!(driver.sync().state(), SyncState::Copy);

        let start = aligned.starts.last().unwrap();
        assert_eq!(start.key, "ofdm_start");
        assert!(start.value);
        assert_eq!(aligned.samples.len() as u64 - start.offset, 256);
    }
}
