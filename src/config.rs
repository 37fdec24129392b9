//! Configuration: the ordered protocol list plus timeout/verbosity knobs,
//! and the binder that turns a parsed TOML file into bound [`ProtocolEntry`]
//! values with their probe functions already resolved.

use std::path::Path;

use serde::Deserialize;

use crate::entry::{BackendTarget, ProbeData, ProtocolEntry};
use crate::error::ConfigError;
use crate::registry;
use crate::tls::TlsPolicy;

/// A fully bound, ready-to-arbitrate configuration.
#[derive(Debug, Clone)]
pub struct Configuration {
    /// Protocol entries in declaration order. The probe chain is evaluated
    /// in exactly this order.
    pub entries: Vec<ProtocolEntry>,
    /// Name of the entry to select on idle timeout. Falls back to the first
    /// configured entry if unset or if the name doesn't resolve.
    pub on_timeout: Option<String>,
    /// Diagnostic verbosity level (0 = quiet).
    pub verbose: u8,
}

impl Configuration {
    pub fn builder() -> ConfigurationBuilder {
        ConfigurationBuilder::default()
    }

    /// Load and bind a configuration from a TOML file on disk.
    pub fn load_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(text)?;
        bind(raw)
    }

    /// The entry to fall back to once the probe chain is exhausted without a
    /// match, or on a read/EOF that ends the connection early: the last
    /// configured entry.
    pub fn exhaustion_fallback(&self) -> Option<&ProtocolEntry> {
        self.entries.last()
    }

    /// The entry to select on idle timeout: `on_timeout` by name if it
    /// resolves, else the first configured entry.
    pub fn timeout_fallback(&self) -> Option<&ProtocolEntry> {
        self.on_timeout
            .as_deref()
            .and_then(|name| self.entries.iter().find(|e| e.name == name))
            .or_else(|| self.entries.first())
    }
}

/// Incrementally assembled [`Configuration`], for callers building one in
/// code rather than from a file (tests, a built-in demo configuration).
#[derive(Debug, Default)]
pub struct ConfigurationBuilder {
    entries: Vec<ProtocolEntry>,
    on_timeout: Option<String>,
    verbose: u8,
}

impl ConfigurationBuilder {
    pub fn entry(mut self, entry: ProtocolEntry) -> Self {
        self.entries.push(entry);
        self
    }

    pub fn on_timeout(mut self, name: impl Into<String>) -> Self {
        self.on_timeout = Some(name.into());
        self
    }

    pub fn verbose(mut self, level: u8) -> Self {
        self.verbose = level;
        self
    }

    pub fn build(self) -> Result<Configuration, ConfigError> {
        validate(&self.entries)?;
        Ok(Configuration {
            entries: self.entries,
            on_timeout: self.on_timeout,
            verbose: self.verbose,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    verbose: u8,
    #[serde(default)]
    on_timeout: Option<String>,
    #[serde(default)]
    entries: Vec<RawEntry>,
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    name: String,
    #[serde(default)]
    probe: Option<String>,
    #[serde(default)]
    min_length: Option<usize>,
    #[serde(default)]
    backend: Option<RawBackend>,
    #[serde(default)]
    tls: Option<RawTlsPolicy>,
    #[serde(default)]
    patterns: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawBackend {
    host: String,
    port: u16,
}

#[derive(Debug, Deserialize, Default)]
struct RawTlsPolicy {
    #[serde(default)]
    sni_allow: Vec<String>,
    #[serde(default)]
    alpn_allow: Vec<String>,
}

fn bind(raw: RawConfig) -> Result<Configuration, ConfigError> {
    let mut entries = Vec::with_capacity(raw.entries.len());

    for raw_entry in raw.entries {
        entries.push(bind_entry(raw_entry)?);
    }

    validate(&entries)?;

    Ok(Configuration {
        entries,
        on_timeout: raw.on_timeout,
        verbose: raw.verbose,
    })
}

fn bind_entry(raw: RawEntry) -> Result<ProtocolEntry, ConfigError> {
    let (probe, data) = match raw.probe.as_deref() {
        None => (None, ProbeData::None),
        Some(registry::REGEX_NAME) => {
            if raw.patterns.is_empty() {
                return Err(ConfigError::EmptyRegexPatterns(raw.name));
            }
            let mut compiled = Vec::with_capacity(raw.patterns.len());
            for pattern in &raw.patterns {
                let re = regex::bytes::Regex::new(pattern).map_err(|source| {
                    ConfigError::InvalidRegex {
                        entry: raw.name.clone(),
                        pattern: pattern.clone(),
                        source,
                    }
                })?;
                compiled.push(re);
            }
            (Some(crate::probes::regex), ProbeData::Regex(compiled))
        }
        Some("tls") => {
            let policy = raw
                .tls
                .map(|t| TlsPolicy::new().with_sni(t.sni_allow).with_alpn(t.alpn_allow))
                .unwrap_or_default();
            let probe = registry::resolve_probe("tls")
                .expect("\"tls\" is always a resolvable builtin name");
            (Some(probe), ProbeData::Tls(policy))
        }
        Some(name) => {
            let probe = registry::resolve_probe(name)
                .ok_or_else(|| ConfigError::UnknownProbe(name.to_string()))?;
            (Some(probe), ProbeData::None)
        }
    };

    Ok(ProtocolEntry {
        name: raw.name,
        probe,
        min_length: raw.min_length,
        data,
        backend: raw.backend.map(|b| BackendTarget {
            host: b.host,
            port: b.port,
        }),
    })
}

fn validate(entries: &[ProtocolEntry]) -> Result<(), ConfigError> {
    let mut seen = std::collections::HashSet::new();
    for entry in entries {
        if !seen.insert(entry.name.as_str()) {
            return Err(ConfigError::DuplicateName(entry.name.clone()));
        }
    }

    if let Some(idx) = entries.iter().position(|e| e.is_anyprot()) {
        if idx != entries.len() - 1 {
            return Err(ConfigError::AnyprotNotLast(idx));
        }
    }

    Ok(())
}
