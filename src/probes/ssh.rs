//! SSH recognizer.

use crate::entry::ProtocolEntry;
use crate::outcome::ProbeOutcome;

const PREFIX: &[u8; 4] = b"SSH-";

pub fn probe(bytes: &[u8], _entry: &ProtocolEntry) -> ProbeOutcome {
    if bytes.len() < PREFIX.len() {
        return ProbeOutcome::Again;
    }
    if &bytes[..PREFIX.len()] == PREFIX {
        ProbeOutcome::Match
    } else {
        ProbeOutcome::Next
    }
}
