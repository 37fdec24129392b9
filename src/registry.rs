//! The static table mapping built-in protocol names to probe functions.
//!
//! `regex` and `timeout` are reserved names resolved outside this table:
//! `regex` is never exposed as a built-in (it only becomes meaningful once a
//! configuration attaches compiled patterns via `ProbeData::Regex`), and
//! `timeout` resolves to the always-match sentinel so it can appear as a
//! pseudo-protocol in a configuration. Neither is something user input
//! should be able to select at runtime — only the configuration binder
//! resolves names.

use crate::entry::ProbeFn;
use crate::probes;

/// Reserved name for the regex probe. Never returned by [`resolve_probe`].
pub const REGEX_NAME: &str = "regex";
/// Reserved name for the timeout pseudo-protocol.
pub const TIMEOUT_NAME: &str = "timeout";

const BUILTINS: &[(&str, ProbeFn)] = &[
    ("ssh", probes::ssh_probe),
    ("openvpn", probes::openvpn_probe),
    ("tinc", probes::tinc_probe),
    ("xmpp", probes::xmpp_probe),
    ("http", probes::http_probe),
    ("tls", probes::tls),
    ("adb", probes::adb_probe),
    ("socks5", probes::socks5_probe),
    (crate::entry::ProtocolEntry::ANYPROT_NAME, probes::anyprot_probe),
];

/// Resolve a probe name to its function, used when binding configuration
/// entries to their implementations. Unknown names return `None`, which the
/// configuration layer treats as a fatal load-time error.
pub fn resolve_probe(name: &str) -> Option<ProbeFn> {
    if name == TIMEOUT_NAME {
        return Some(probes::anyprot_probe);
    }
    BUILTINS
        .iter()
        .find(|(builtin, _)| *builtin == name)
        .map(|(_, f)| *f)
}

/// Names of every built-in probe (excludes the `regex` and `timeout`
/// reserved names, which are resolved specially rather than listed here).
pub fn builtin_names() -> impl Iterator<Item = &'static str> {
    BUILTINS.iter().map(|(name, _)| *name)
}
