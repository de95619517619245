//! Fine timing and frequency synchronization for 802.11 style OFDM. We assume the following frame
//! structure:
//! <Short Preamble> <Long Preamble> [<Cyclic Prefix> <Data symbol> ...]
//!
//! An upstream detector tags the stream roughly where a frame begins. From there we correlate
//! against the long training sequence (LTS) to find the exact start of the payload, estimate the
//! carrier frequency offset from the short preamble and then copy out frequency corrected
//! payload symbols with their cyclic prefixes removed.
//!
//! In 802.11, the LTS is 64 samples long and each data symbol is 64 samples plus a 16 sample
//! cyclic prefix.

pub mod config;
pub mod correlator;
pub mod error;
pub mod frame_search;
pub mod freq_est;
pub mod preamble;
pub mod sim;
pub mod stream;
pub mod sync;
pub mod tags;

pub use config::SyncConfig;
pub use error::SyncError;
pub use stream::{Aligned, StreamDriver};
pub use sync::{SyncLong, SyncReport, SyncState, WorkStatus};
pub use tags::{ResyncTag, StartTag};
