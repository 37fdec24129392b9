//! Configured protocol entries and the per-probe data they carry.

use crate::outcome::ProbeOutcome;
use crate::tls::TlsPolicy;

/// Signature every probe function implements.
///
/// Probes are plain functions of `(bytes, entry)`: no I/O, no shared state,
/// no panics on truncated input. `entry` is only consulted by probes that
/// need configuration (TLS, regex); byte-level probes ignore it.
pub type ProbeFn = fn(&[u8], &ProtocolEntry) -> ProbeOutcome;

/// Opaque per-probe configuration, typed instead of an untyped blob so the
/// TLS and regex probes can dispatch on the variant they expect.
#[derive(Debug, Clone)]
pub enum ProbeData {
    /// No configuration needed (SSH, OpenVPN, tinc, XMPP, HTTP, ADB, SOCKS5,
    /// the always-match sentinel).
    None,
    /// SNI/ALPN allow-lists for the TLS probe.
    Tls(TlsPolicy),
    /// Ordered, compiled patterns for the regex probe. Order matters: the
    /// first pattern to match wins, mirroring probe-chain ordering.
    Regex(Vec<regex::bytes::Regex>),
}

impl Default for ProbeData {
    fn default() -> Self {
        ProbeData::None
    }
}

/// Backend connection parameters. Opaque to the core — consumed only by the
/// external collaborator that dials the winning entry's backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendTarget {
    pub host: String,
    pub port: u16,
}

/// A single configured protocol in the probe chain.
#[derive(Debug, Clone)]
pub struct ProtocolEntry {
    /// Unique name within a configuration.
    pub name: String,
    /// The probe function, if any. Entries without a probe (e.g. a `timeout`
    /// pseudo-entry that only exists to carry a backend target) are skipped
    /// by the arbiter rather than treated as an error.
    pub probe: Option<ProbeFn>,
    /// If the buffer is shorter than this, the probe is not invoked and the
    /// entry contributes an implicit AGAIN.
    pub min_length: Option<usize>,
    /// Per-probe configuration.
    pub data: ProbeData,
    /// Backend host/port, opaque to the core.
    pub backend: Option<BackendTarget>,
}

impl ProtocolEntry {
    /// Build a bare entry with a built-in probe and no extra configuration.
    pub fn new(name: impl Into<String>, probe: ProbeFn) -> Self {
        Self {
            name: name.into(),
            probe: Some(probe),
            min_length: None,
            data: ProbeData::None,
            backend: None,
        }
    }

    pub fn with_min_length(mut self, min_length: usize) -> Self {
        self.min_length = Some(min_length);
        self
    }

    pub fn with_data(mut self, data: ProbeData) -> Self {
        self.data = data;
        self
    }

    pub fn with_backend(mut self, host: impl Into<String>, port: u16) -> Self {
        self.backend = Some(BackendTarget {
            host: host.into(),
            port,
        });
        self
    }

    /// Name reserved for the always-match sentinel. Per the ordering
    /// invariant, if present it must be the last entry in a configuration.
    pub const ANYPROT_NAME: &'static str = "anyprot";

    pub fn is_anyprot(&self) -> bool {
        self.name == Self::ANYPROT_NAME
    }
}
