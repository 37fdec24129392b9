//! OpenVPN recognizer.
//!
//! The first OpenVPN packet is length-prefixed: two big-endian bytes give
//! the length of everything that follows. We accept only when that declared
//! length equals exactly what's left in the buffer.
//!
//! Open question (carried from spec.md §9): if the kernel coalesced several
//! packets into one read, this will incorrectly NEXT since the declared
//! length will be shorter than the remaining buffer. Relaxing the check to
//! `<=` would fix that case but would also accept padded/garbage trailers;
//! left as an exact match to match the upstream heuristic being reproduced.

use crate::entry::ProtocolEntry;
use crate::outcome::ProbeOutcome;

pub fn probe(bytes: &[u8], _entry: &ProtocolEntry) -> ProbeOutcome {
    if bytes.len() < 2 {
        return ProbeOutcome::Again;
    }
    let declared = u16::from_be_bytes([bytes[0], bytes[1]]) as usize;
    if declared == bytes.len() - 2 {
        ProbeOutcome::Match
    } else {
        ProbeOutcome::Next
    }
}
