//! TLS probe: parses a ClientHello and evaluates the configured SNI/ALPN
//! allow-lists against it.

mod parser;

pub use parser::{ClientHelloInfo, ParseOutcome};

use crate::entry::{ProbeData, ProtocolEntry};
use crate::outcome::ProbeOutcome;

/// SNI/ALPN allow-lists for a TLS entry. An empty list means "no
/// restriction" for that dimension.
#[derive(Debug, Clone, Default)]
pub struct TlsPolicy {
    /// Hostname patterns. A leading `*.` label matches exactly one leading
    /// label of the presented name (`*.example.com` matches
    /// `foo.example.com`, not `example.com` or `a.b.example.com`).
    pub sni_allow: Vec<String>,
    /// ALPN protocol names, matched case-sensitively.
    pub alpn_allow: Vec<String>,
}

impl TlsPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sni(mut self, patterns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.sni_allow = patterns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_alpn(mut self, protocols: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.alpn_allow = protocols.into_iter().map(Into::into).collect();
        self
    }

    fn matches(&self, hello: &ClientHelloInfo) -> bool {
        let sni_ok = if self.sni_allow.is_empty() {
            true
        } else {
            hello
                .server_name
                .as_deref()
                .is_some_and(|name| self.sni_allow.iter().any(|pat| sni_matches(pat, name)))
        };

        let alpn_ok = if self.alpn_allow.is_empty() {
            true
        } else {
            hello
                .alpn
                .iter()
                .any(|offered| self.alpn_allow.iter().any(|allowed| allowed == offered))
        };

        sni_ok && alpn_ok
    }
}

/// Case-insensitive SNI match with single-label wildcard support.
fn sni_matches(pattern: &str, host: &str) -> bool {
    let pattern = normalize_name(pattern);
    let host = normalize_name(&host);

    match pattern.strip_prefix("*.") {
        Some(suffix) => {
            let Some(label_and_dot) = host.strip_suffix(&suffix) else {
                return false;
            };
            match label_and_dot.strip_suffix('.') {
                Some(label) => !label.is_empty() && !label.contains('.'),
                None => false,
            }
        }
        None => pattern == host,
    }
}

fn normalize_name(name: &str) -> String {
    name.to_lowercase().trim_end_matches('.').to_string()
}

/// The TLS probe function bound into [`crate::registry`].
pub fn probe(bytes: &[u8], entry: &ProtocolEntry) -> ProbeOutcome {
    match parser::parse_client_hello(bytes) {
        ParseOutcome::Incomplete => ProbeOutcome::Again,
        ParseOutcome::NotTls => ProbeOutcome::Next,
        ParseOutcome::Hello(hello) => {
            let accepts = match &entry.data {
                ProbeData::Tls(policy) => policy.matches(&hello),
                _ => true, // no policy configured: any well-formed ClientHello matches
            };
            if accepts {
                ProbeOutcome::Match
            } else {
                ProbeOutcome::Next
            }
        }
    }
}
