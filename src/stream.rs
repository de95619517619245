use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::sync::{SyncLong, SyncReport};
use crate::tags::{ResyncTag, StartTag};
use num::{Complex, Zero};

/// Everything produced by one `StreamDriver::run`
#[derive(Clone, Debug, Default)]
pub struct Aligned {
    pub samples: Vec<Complex<f32>>,
    /// Start tags, with offsets counted from the beginning of the output stream
    pub starts: Vec<StartTag>,
    /// The sync decision behind each entry of `starts`
    pub reports: Vec<SyncReport>,
}

/// Buffers a sample stream, builds the delayed copy of it and keeps calling `SyncLong::work` for
/// as long as the synchronizer can make progress.
pub struct StreamDriver {
    sync: SyncLong,
    /// Samples not yet consumed
    direct: Vec<Complex<f32>>,
    /// Same stream, delayed by the sync length. Always holds more samples than `direct`
    delayed: Vec<Complex<f32>>,
    tags: Vec<ResyncTag>,
    /// Output capacity offered per call
    chunk: usize,
    pushed: u64,
}

impl StreamDriver {
    pub fn new(config: &SyncConfig, chunk: usize) -> Result<Self, SyncError> {
        assert!(chunk > 0);
        Ok(Self {
            sync: SyncLong::new(config)?,
            direct: Vec::new(),
            delayed: vec![Complex::zero(); config.sync_length],
            tags: Vec::new(),
            chunk,
            pushed: 0,
        })
    }

    pub fn push(&mut self, samps: &[Complex<f32>]) {
        self.direct.extend_from_slice(samps);
        self.delayed.extend_from_slice(samps);
        self.pushed += samps.len() as u64;
    }

    /// Announce that a new frame begins at `offset` samples into the stream
    pub fn push_tag(&mut self, offset: u64) {
        self.tags.push(ResyncTag { offset });
    }

    /// Number of samples pushed so far
    pub fn pushed(&self) -> u64 {
        self.pushed
    }

    pub fn sync(&self) -> &SyncLong {
        &self.sync
    }

    /// Run the synchronizer until it runs out of input
    pub fn run(&mut self) -> Result<Aligned, SyncError> {
        let mut res = Aligned::default();
        let mut out = vec![Complex::zero(); self.chunk];
        loop {
            let avail = self.direct.len().min(self.delayed.len());
            // Ask for less output when the input can't cover a full chunk
            let noutput = self.chunk.min(avail);
            if noutput == 0 || avail < self.sync.forecast(noutput) {
                break;
            }

            let state = self.sync.state();
            let status = self.sync.work(
                &self.direct,
                &self.delayed,
                &mut out[..noutput],
                &self.tags,
            )?;

            res.samples.extend_from_slice(&out[..status.produced]);
            if let Some(start) = status.start {
                res.starts.push(start);
                res.reports.extend(self.sync.last_sync().copied());
            }
            self.direct.drain(..status.consumed);
            self.delayed.drain(..status.consumed);
            let nread = self.sync.nitems_read();
            self.tags.retain(|t| t.offset >= nread);

            if status.consumed == 0 && status.produced == 0 && self.sync.state() == state {
                break;
            }
        }
        Ok(res)
    }
}
