//! HTTP recognizer. `HTTP` appearing anywhere in the prefix (status lines,
//! `Upgrade:` responses, etc.) is an immediate match; otherwise we check the
//! request methods in the fixed order the spec requires, case-sensitively.

use crate::entry::ProtocolEntry;
use crate::outcome::ProbeOutcome;

const NEEDLE: &[u8] = b"HTTP";
const SEARCH_CAP: usize = 1024;

const METHODS: &[&[u8]] = &[
    b"OPTIONS", b"GET", b"HEAD", b"POST", b"PUT", b"DELETE", b"TRACE", b"CONNECT",
];

pub fn probe(bytes: &[u8], _entry: &ProtocolEntry) -> ProbeOutcome {
    let searched = &bytes[..bytes.len().min(SEARCH_CAP)];
    if contains(searched, NEEDLE) {
        return ProbeOutcome::Match;
    }

    for method in METHODS {
        if bytes.len() < method.len() {
            return ProbeOutcome::Again;
        }
        if &bytes[..method.len()] == *method {
            return ProbeOutcome::Match;
        }
    }
    ProbeOutcome::Next
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    if needle.is_empty() || haystack.len() < needle.len() {
        return false;
    }
    haystack.windows(needle.len()).any(|w| w == needle)
}
