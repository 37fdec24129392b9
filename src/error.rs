//! Fatal, load-time configuration errors.
//!
//! Nothing in the runtime probe/arbiter path returns `Result` — per the
//! error handling design, a probe has no out-of-band error channel, only
//! the three-valued [`crate::outcome::ProbeOutcome`]. Errors only exist at
//! configuration bind time, before any connection is accepted.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown probe name `{0}`")]
    UnknownProbe(String),

    #[error("duplicate protocol entry name `{0}`")]
    DuplicateName(String),

    #[error("`anyprot` entry must be last in the configuration, found at index {0}")]
    AnyprotNotLast(usize),

    #[error("regex probe on entry `{entry}` has an invalid pattern `{pattern}`: {source}")]
    InvalidRegex {
        entry: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("entry `{0}` declares probe = \"regex\" but has no patterns configured")]
    EmptyRegexPatterns(String),

    #[error("failed to parse configuration file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("failed to read configuration file `{path}`: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
