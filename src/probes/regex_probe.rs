//! Regex-based custom probe.
//!
//! Patterns are matched in the order the configuration lists them, against
//! exactly the bytes handed to the probe — `regex::bytes::Regex` never reads
//! past the end of the slice it's given, so no separate region bookkeeping
//! is needed. This probe never returns AGAIN: patterns are expected to
//! tolerate partial input themselves, or the entry's `min_length` handles
//! the waiting.

use crate::entry::{ProbeData, ProtocolEntry};
use crate::outcome::ProbeOutcome;

pub fn probe(bytes: &[u8], entry: &ProtocolEntry) -> ProbeOutcome {
    let ProbeData::Regex(patterns) = &entry.data else {
        // Configuration binding guarantees a regex entry always carries
        // ProbeData::Regex; a mismatch here is a fatal internal error, not
        // something the probe can express in ProbeOutcome.
        panic!("regex probe invoked on entry `{}` without ProbeData::Regex", entry.name);
    };

    for pattern in patterns {
        if pattern.is_match(bytes) {
            return ProbeOutcome::Match;
        }
    }
    ProbeOutcome::Next
}
