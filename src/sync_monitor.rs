//! Runs a simulated transmitter and the long preamble synchronizer side by side and prints one
//! JSON line per aligned frame. The transmitter repeatedly sends:
//!
//! [<noise gap> <short preamble> <long preamble> <payload symbols>]
//!
//! and tags the start of every short preamble, standing in for the upstream frame detector.
//!
//! Usage: sync_monitor [config.json [samples.txt]]
//!
//! With a sample file (one float per line, real and imaginary parts interleaved) the file is
//! synchronized once, without tags, instead of running the simulation.

use failure::{err_msg, Error};
use log::{debug, info};
use lts_sync::config::{filename_to_cplx_vec, SyncConfig};
use lts_sync::freq_est::carrier_offset_hz;
use lts_sync::sim::{FrameGenerator, GeneratorConfig};
use lts_sync::{Aligned, StreamDriver};
use num::Complex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::sync::Arc;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    sync: SyncConfig,
    generator: GeneratorConfig,
    /// Output items offered to the synchronizer per call
    chunk: Option<usize>,
    seed: u64,
    /// Stop after this many frames instead of waiting for Ctrl-C
    max_frames: Option<u64>,
}

impl MonitorConfig {
    fn chunk(&self) -> usize {
        self.chunk.unwrap_or(4096).max(1)
    }
}

struct Burst {
    samples: Vec<Complex<f32>>,
    /// Index in `samples` where a frame starts
    start: Option<usize>,
}

#[derive(Serialize)]
struct FrameReport {
    frame: u64,
    /// Output item carrying the `ofdm_start` tag
    output_offset: u64,
    /// Payload start relative to the sync window
    frame_start: usize,
    carrier_offset_hz: f64,
}

/// Loops as a transmitter until signalled to close by `close` or `max_frames` is reached
fn run_tx(
    tx: SyncSender<Burst>,
    config: &MonitorConfig,
    close: Arc<AtomicBool>,
) -> Result<(), Error> {
    let mut gen = FrameGenerator::new(&config.generator, StdRng::seed_from_u64(config.seed));
    let mut sent = 0;

    while !close.load(Ordering::Relaxed) && config.max_frames.map_or(true, |m| sent < m) {
        let (samples, start, frame) = gen.burst();
        debug!(
            "Tx frame {} with CFO {:.1} Hz",
            sent,
            frame.cfo as f64 * config.sync.sample_rate / (2. * std::f64::consts::PI)
        );
        if tx
            .send(Burst {
                samples,
                start: Some(start),
            })
            .is_err()
        {
            break;
        }
        sent += 1;
    }

    // The delayed stream lags by the sync length. Push the last frame through
    let tail = gen.noise(config.sync.sync_length + config.chunk());
    let _ = tx.send(Burst {
        samples: tail,
        start: None,
    });

    info!("Tx closed after {} frames", sent);
    Ok(())
}

fn report(aligned: &Aligned, frames: &mut u64, sample_rate: f64) -> Result<(), Error> {
    for (start, sync) in aligned.starts.iter().zip(&aligned.reports) {
        let report = FrameReport {
            frame: *frames,
            output_offset: start.offset,
            frame_start: sync.frame_start,
            carrier_offset_hz: carrier_offset_hz(sync.freq_est, sample_rate),
        };
        println!("{}", serde_json::to_string(&report)?);
        *frames += 1;
    }
    Ok(())
}

/// Loops as a receiver until the transmitter hangs up or we are signalled to close
fn run_rx(
    rx: Receiver<Burst>,
    config: &MonitorConfig,
    close: Arc<AtomicBool>,
) -> Result<(), Error> {
    let mut driver = StreamDriver::new(&config.sync, config.chunk())?;
    let mut frames = 0;

    while let Ok(burst) = rx.recv() {
        if let Some(start) = burst.start {
            driver.push_tag(driver.pushed() + start as u64);
        }
        driver.push(&burst.samples);

        let aligned = driver.run()?;
        report(&aligned, &mut frames, config.sync.sample_rate)?;

        if close.load(Ordering::Relaxed) {
            break;
        }
    }

    info!("Rx closed after {} frames", frames);
    Ok(())
}

fn run_file(config: &MonitorConfig, fname: &str) -> Result<(), Error> {
    let samps = filename_to_cplx_vec(fname)?;
    let mut driver = StreamDriver::new(&config.sync, config.chunk())?;
    driver.push(&samps);
    let aligned = driver.run()?;

    let mut frames = 0;
    report(&aligned, &mut frames, config.sync.sample_rate)?;
    info!(
        "{} samples in, {} out, {} frames",
        samps.len(),
        aligned.samples.len(),
        frames
    );
    Ok(())
}

fn main() -> Result<(), Error> {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    let config: MonitorConfig = match args.get(1) {
        Some(fname) => serde_json::from_str(&std::fs::read_to_string(fname)?)?,
        None => MonitorConfig::default(),
    };
    if let Some(fname) = args.get(2) {
        return run_file(&config, fname);
    }

    // Register signal handler to stop on Ctrl-C
    let close = Arc::new(AtomicBool::new(false));
    let close_handler = close.clone();
    ctrlc::set_handler(move || {
        close_handler.store(true, Ordering::Relaxed);
    })?;

    let (tx, rx) = sync_channel(16);

    let close_rx = close.clone();
    let config_rx = config.clone();
    let rx_handle = std::thread::spawn(move || run_rx(rx, &config_rx, close_rx));
    let tx_handle = std::thread::spawn(move || run_tx(tx, &config, close));

    tx_handle
        .join()
        .map_err(|_| err_msg("transmitter thread panicked"))??;
    rx_handle
        .join()
        .map_err(|_| err_msg("receiver thread panicked"))??;
    Ok(())
}
