//! Mote directory listing.
//!
//! The peer answers `sys/motes` with a success status, a `motes:` marker and
//! one hostname per line, each ending in `.local`:
//!
//! ```text
//! 2.05 CONTENT motes:
//! nodeA.local
//! nodeB.local
//! ```

use crate::constants::{MOTES_MARKER, MOTE_SUFFIX};
use crate::responses::Response;

/// Extract up to `max` hostnames from a directory listing.
///
/// Returns an empty list when the response is not a success or carries no
/// `motes:` marker. Names are returned in discovery order, duplicates kept.
pub fn parse_motes(text: &str, max: usize) -> Vec<String> {
    let mut motes = Vec::new();
    if !Response::parse(text).is_success() {
        return motes;
    }
    let Some(marker) = text.find(MOTES_MARKER) else {
        return motes;
    };

    let mut rest = &text[marker + MOTES_MARKER.len()..];
    while motes.len() < max {
        let Some(at) = rest.find(MOTE_SUFFIX) else {
            break;
        };
        let end = at + MOTE_SUFFIX.len();
        let name = rest[..end].trim();
        if name.len() == MOTE_SUFFIX.len() {
            // suffix with no host part in front of it
            break;
        }
        motes.push(name.to_string());
        rest = &rest[end..];
    }
    motes
}
