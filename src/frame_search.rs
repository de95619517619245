use crate::error::SyncError;
use crate::preamble::LTS_LEN;

/// Number of correlation peaks considered when looking for the two LTS
pub const CANDIDATES: usize = 4;

/// Pick the `CANDIDATES` largest `(magnitude, offset)` pairs, largest first. Equal magnitudes keep
/// their window order, so the earlier offset wins a tie.
pub fn strongest(cor: &[(f32, usize)]) -> Vec<(f32, usize)> {
    let mut top: Vec<(f32, usize)> = Vec::with_capacity(CANDIDATES + 1);
    for &(mag, offset) in cor {
        if top.len() == CANDIDATES && mag <= top[CANDIDATES - 1].0 {
            continue;
        }
        let pos = top
            .iter()
            .position(|t| mag > t.0)
            .unwrap_or_else(|| top.len());
        top.insert(pos, (mag, offset));
        top.truncate(CANDIDATES);
    }
    top
}

/// Find where the payload starts given the correlation magnitude at every offset of the sync
/// window. The two LTS produce peaks exactly `LTS_LEN` apart and the payload begins `LTS_LEN`
/// after the second one. Peaks 63 or 65 apart are accepted as a fallback, but an exact match wins
/// immediately. If nothing lines up we return `sync_length`.
pub fn search_frame_start(cor: &[(f32, usize)], sync_length: usize) -> Result<usize, SyncError> {
    if cor.len() != sync_length {
        return Err(SyncError::IncompleteWindow {
            found: cor.len(),
            expected: sync_length,
        });
    }

    let top = strongest(cor);
    let mut frame_start = sync_length;
    for i in 0..top.len() {
        for k in i + 1..top.len() {
            let (a, b) = (top[i].1, top[k].1);
            let later = a.max(b);
            let diff = later - a.min(b);
            if diff == LTS_LEN {
                return Ok(later + LTS_LEN);
            } else if diff == LTS_LEN - 1 {
                // TODO: 63 and 65 haven't been verified against captures; they only absorb one
                // sample of timing jitter
                frame_start = later + LTS_LEN - 1;
            } else if diff == LTS_LEN + 1 {
                frame_start = later + LTS_LEN;
            }
        }
    }
    Ok(frame_start)
}
