//! Android Debug Bridge (ADB) recognizer.
//!
//! A `CNXN` connect message is 24 bytes of fixed header followed by a
//! `host:` tagged payload. Some client versions first send a 24-byte
//! all-zero-then-`0xFF` "empty message" before the real `CNXN`; we tolerate
//! that prefix and re-check at the offset that follows it.
//!
//! Open question (carried from spec.md §9): the empty-message heuristic is
//! tied to a specific client build and could misfire on payloads that
//! happen to start the same way; making it opt-in via configuration is
//! flagged as future work rather than solved here.

use crate::entry::ProtocolEntry;
use crate::outcome::ProbeOutcome;

const HEADER_LEN: usize = 30; // 24-byte ADB header + 5-byte "host:" tag (indices 24..29)
const EMPTY_MSG_LEN: usize = 24;
const HOST_TAG: &[u8; 5] = b"host:";

pub fn probe(bytes: &[u8], _entry: &ProtocolEntry) -> ProbeOutcome {
    if bytes.len() < HEADER_LEN {
        return ProbeOutcome::Again;
    }

    if is_cnxn_host(bytes, 0) {
        return ProbeOutcome::Match;
    }

    if bytes.len() < HEADER_LEN + EMPTY_MSG_LEN {
        return ProbeOutcome::Again;
    }

    if !is_empty_message_prefix(&bytes[..EMPTY_MSG_LEN]) {
        return ProbeOutcome::Next;
    }

    if is_cnxn_host(bytes, EMPTY_MSG_LEN) {
        ProbeOutcome::Match
    } else {
        ProbeOutcome::Next
    }
}

fn is_cnxn_host(bytes: &[u8], offset: usize) -> bool {
    bytes.len() >= offset + HEADER_LEN
        && &bytes[offset..offset + 4] == b"CNXN"
        && &bytes[offset + 24..offset + 29] == HOST_TAG
}

fn is_empty_message_prefix(prefix: &[u8]) -> bool {
    prefix.len() == EMPTY_MSG_LEN
        && prefix[..20].iter().all(|&b| b == 0)
        && prefix[20..24].iter().all(|&b| b == 0xFF)
}
