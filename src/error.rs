use failure::Fail;

#[derive(Debug, Fail)]
pub enum SyncError {
    /// The frame start search ranks this many candidates, so the window must be at least as long
    #[fail(display = "sync length {} is shorter than the {} search candidates", _0, _1)]
    SyncLengthTooShort(usize, usize),
    /// Frame start search ran before the correlation window filled up. This is a logic error in
    /// the state machine, not something the caller can recover from
    #[fail(
        display = "correlation window holds {} entries, expected {}",
        found, expected
    )]
    IncompleteWindow { found: usize, expected: usize },
    #[fail(display = "I/O error: {}", _0)]
    Io(#[cause] std::io::Error),
    #[fail(display = "malformed config: {}", _0)]
    Config(#[cause] serde_json::Error),
    #[fail(display = "line {} is not a number: {:?}", line, text)]
    BadSample { line: usize, text: String },
    #[fail(
        display = "sample file has {} values; real and imaginary parts must come in pairs",
        _0
    )]
    OddSampleCount(usize),
}

impl From<std::io::Error> for SyncError {
    fn from(e: std::io::Error) -> Self {
        SyncError::Io(e)
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(e: serde_json::Error) -> Self {
        SyncError::Config(e)
    }
}
