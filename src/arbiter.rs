//! The arbitration loop: combines every configured entry's probe outcome
//! for one buffer into a single decision.
//!
//! Entries are evaluated in declaration order. The first `MATCH` wins
//! immediately — entries after it are never consulted. If nothing matches,
//! the result is `AGAIN` if any entry asked for more bytes, and otherwise
//! the configured fallback entry (the last one, conventionally `anyprot` or
//! a catch-all backend) is selected.

use crate::entry::ProtocolEntry;
use crate::outcome::ProbeOutcome;

/// Result of arbitrating one buffer against a configured entry list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision<'a> {
    /// An entry matched; route to it.
    Matched(&'a ProtocolEntry),
    /// At least one entry wants more bytes before it can decide.
    NeedMoreBytes,
    /// Every entry said NEXT; route to the fallback (last configured) entry.
    Exhausted(Option<&'a ProtocolEntry>),
}

/// Run every entry's probe against `bytes` and combine the outcomes.
///
/// An entry with `probe: None` (a pseudo-entry that only carries a backend,
/// such as a `timeout` target) is skipped entirely rather than contributing
/// an outcome. An entry whose `min_length` exceeds `bytes.len()` is treated
/// as an implicit AGAIN without invoking its probe function.
pub fn arbitrate<'a>(bytes: &[u8], entries: &'a [ProtocolEntry]) -> Decision<'a> {
    let mut saw_again = false;
    let last_index = entries.len().checked_sub(1);

    for (index, entry) in entries.iter().enumerate() {
        let Some(probe) = entry.probe else {
            continue;
        };

        // The trailing always-match sentinel is handled as the residual
        // fallback below, not invoked directly: invoking it here would let
        // it pre-empt an earlier entry that only needs more bytes to decide.
        if Some(index) == last_index && entry.is_anyprot() {
            break;
        }

        let outcome = match entry.min_length {
            Some(min) if bytes.len() < min => ProbeOutcome::Again,
            _ => probe(bytes, entry),
        };

        match outcome {
            ProbeOutcome::Match => return Decision::Matched(entry),
            ProbeOutcome::Again => saw_again = true,
            ProbeOutcome::Next => {}
        }
    }

    if saw_again {
        Decision::NeedMoreBytes
    } else {
        Decision::Exhausted(entries.last())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::ProtocolEntry;
    use crate::probes;

    fn entries() -> Vec<ProtocolEntry> {
        vec![
            ProtocolEntry::new("ssh", probes::ssh_probe),
            ProtocolEntry::new("http", probes::http_probe),
            ProtocolEntry::new("anyprot", probes::anyprot_probe),
        ]
    }

    #[test]
    fn first_match_wins_in_order() {
        let entries = entries();
        match arbitrate(b"SSH-2.0-OpenSSH_9.0", &entries) {
            Decision::Matched(entry) => assert_eq!(entry.name, "ssh"),
            other => panic!("expected Matched(ssh), got {other:?}"),
        }
    }

    #[test]
    fn needs_more_bytes_when_any_entry_wants_it() {
        let entries = entries();
        // 2 bytes: too short for ssh (needs 4) and too short for every http
        // method, but long enough to rule nothing in.
        match arbitrate(b"SS", &entries) {
            Decision::NeedMoreBytes => {}
            other => panic!("expected NeedMoreBytes, got {other:?}"),
        }
    }

    #[test]
    fn falls_back_to_last_entry_when_exhausted() {
        // No min_length/probe combination here can return Again for an
        // all-probes-declined buffer other than the trailing anyprot, which
        // always matches — so exhaust the chain with a two-entry list with
        // no catch-all to exercise the Exhausted path directly.
        let entries = vec![
            ProtocolEntry::new("ssh", probes::ssh_probe),
            ProtocolEntry::new("tinc", probes::tinc_probe),
        ];
        match arbitrate(b"not a known prefix at all", &entries) {
            Decision::Exhausted(Some(entry)) => assert_eq!(entry.name, "tinc"),
            other => panic!("expected Exhausted(tinc), got {other:?}"),
        }
    }

    #[test]
    fn entries_without_a_probe_are_skipped() {
        let entries = vec![
            ProtocolEntry {
                name: "timeout".to_string(),
                probe: None,
                min_length: None,
                data: crate::entry::ProbeData::None,
                backend: None,
            },
            ProtocolEntry::new("anyprot", probes::anyprot_probe),
        ];
        // The probe-less `timeout` entry is skipped, and the trailing
        // anyprot entry is the residual fallback rather than an invoked
        // probe, so this resolves via Exhausted rather than Matched.
        match arbitrate(b"anything", &entries) {
            Decision::Exhausted(Some(entry)) => assert_eq!(entry.name, "anyprot"),
            other => panic!("expected Exhausted(anyprot), got {other:?}"),
        }
    }

    #[test]
    fn trailing_anyprot_does_not_preempt_an_entry_still_wanting_bytes() {
        let entries = vec![
            ProtocolEntry::new("ssh", probes::ssh_probe),
            ProtocolEntry::new("anyprot", probes::anyprot_probe),
        ];
        // Only 2 bytes: ssh needs 4 and asks for more. anyprot must not be
        // invoked here even though it would trivially match anything.
        match arbitrate(b"SS", &entries) {
            Decision::NeedMoreBytes => {}
            other => panic!("expected NeedMoreBytes, got {other:?}"),
        }
    }

    #[test]
    fn min_length_forces_again_without_invoking_probe() {
        let entries = vec![ProtocolEntry::new("ssh", probes::ssh_probe).with_min_length(100)];
        match arbitrate(b"SSH-2.0-x", &entries) {
            Decision::NeedMoreBytes => {}
            other => panic!("expected NeedMoreBytes, got {other:?}"),
        }
    }

    #[test]
    fn min_length_exactly_satisfied_invokes_the_probe() {
        let entries = vec![ProtocolEntry::new("ssh", probes::ssh_probe).with_min_length(4)];
        // Exactly 4 bytes: min_length is satisfied (not "< min_length"), so
        // the probe runs rather than contributing an implicit AGAIN.
        match arbitrate(b"SSH-", &entries) {
            Decision::Matched(entry) => assert_eq!(entry.name, "ssh"),
            other => panic!("expected Matched(ssh), got {other:?}"),
        }
    }
}
