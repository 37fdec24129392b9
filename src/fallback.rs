//! Fallback entry selection for the two cases the arbiter itself doesn't
//! resolve: an idle timeout, and probe-chain exhaustion.

use crate::config::Configuration;
use crate::entry::ProtocolEntry;

/// Why a connection fell back to a default entry instead of matching a probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    /// No entry matched within the idle timeout.
    Timeout,
    /// Every entry returned NEXT (or the connection ended before any entry
    /// could match).
    Exhausted,
}

/// Resolve the entry to route to for a given fallback reason.
pub fn select<'a>(config: &'a Configuration, reason: FallbackReason) -> Option<&'a ProtocolEntry> {
    match reason {
        FallbackReason::Timeout => config.timeout_fallback(),
        FallbackReason::Exhausted => config.exhaustion_fallback(),
    }
}
