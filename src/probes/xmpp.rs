//! XMPP recognizer: looks for `jabber` anywhere in the opening stream
//! element. The search is capped to the first [`SEARCH_CAP`] bytes so an
//! adversarial client can't make this probe scan arbitrarily large buffers.

use crate::entry::ProtocolEntry;
use crate::outcome::ProbeOutcome;

const NEEDLE: &[u8] = b"jabber";
const SEARCH_CAP: usize = 1024;
const MIN_WAIT_LEN: usize = 50;

pub fn probe(bytes: &[u8], _entry: &ProtocolEntry) -> ProbeOutcome {
    let searched = &bytes[..bytes.len().min(SEARCH_CAP)];
    if contains(searched, NEEDLE) {
        return ProbeOutcome::Match;
    }
    if bytes.len() < MIN_WAIT_LEN {
        ProbeOutcome::Again
    } else {
        ProbeOutcome::Next
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    if needle.is_empty() || haystack.len() < needle.len() {
        return false;
    }
    haystack.windows(needle.len()).any(|w| w == needle)
}
