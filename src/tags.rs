use serde::Serialize;

/// Key of the tag marking the first payload sample of a frame
pub const START_KEY: &str = "ofdm_start";

/// An upstream detector thinks a new frame begins at `offset` (in items read from the input)
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct ResyncTag {
    pub offset: u64,
}

/// Attached to the first output sample of an aligned frame, at `offset` in items written
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StartTag {
    pub offset: u64,
    pub key: &'static str,
    pub value: bool,
    /// Who produced the tag
    pub source: String,
}

impl StartTag {
    pub fn new(offset: u64, source: &str) -> Self {
        Self {
            offset,
            key: START_KEY,
            value: true,
            source: source.to_string(),
        }
    }
}

/// Earliest tag with an offset in `start..end`
pub fn first_in_range(tags: &[ResyncTag], start: u64, end: u64) -> Option<ResyncTag> {
    tags.iter()
        .filter(|t| t.offset >= start && t.offset < end)
        .min()
        .copied()
}
