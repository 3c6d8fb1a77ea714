use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// An optional feature of the host server that some configuration constructs
/// depend on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Regular-expression conditions (`=~` and `!~`).
    PatternMatching,
    /// TLS listeners (`ssl.engine = "enable"`).
    Tls,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::PatternMatching => write!(f, "pattern matching"),
            Capability::Tls => write!(f, "TLS"),
        }
    }
}

#[derive(Debug, Error)]
#[cfg_attr(feature = "rich-errors", derive(miette::Diagnostic))]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(srvconf::io)))]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("No config file named '{file_name}' found in any search path")]
    #[cfg_attr(
        feature = "rich-errors",
        diagnostic(code(srvconf::not_found), help("pass the file explicitly with -f"))
    )]
    NotFound { file_name: String },

    #[error("line {line}, pos {column}: {reason}")]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(srvconf::lex)))]
    Lex {
        line: usize,
        column: usize,
        reason: String,
    },

    #[error("parser failed near line {line}, pos {column}: {reason}")]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(srvconf::parse)))]
    Parse {
        line: usize,
        column: usize,
        reason: String,
    },

    #[error("unexpected type for key '{key}' (line {line}): found {found}, expected {expected}, e.g. {example}")]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(srvconf::type_mismatch)))]
    Type {
        key: String,
        line: usize,
        found: String,
        expected: &'static str,
        example: &'static str,
    },

    #[error("{capability} is not available but is required by {context}")]
    #[cfg_attr(
        feature = "rich-errors",
        diagnostic(
            code(srvconf::capability),
            help("enable the capability (SRVCONF_PATTERN_MATCHING / SRVCONF_TLS) or remove the construct")
        )
    )]
    CapabilityUnavailable {
        capability: Capability,
        context: String,
    },

    #[error("invalid pattern \"{pattern}\" (line {line}): {source}")]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(srvconf::pattern)))]
    InvalidPattern {
        pattern: String,
        line: usize,
        source: regex::Error,
    },

    #[error("Unknown key '{key}' (line {line})")]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(srvconf::unknown_key)))]
    UnknownKey { key: String, line: usize },

    #[error("Unknown keys in config file")]
    #[cfg_attr(
        feature = "rich-errors",
        diagnostic(
            code(srvconf::unknown_keys),
            help("register module keys with .known_keys() or disable strict mode")
        )
    )]
    UnknownKeys(Vec<ConfigError>),

    #[error("ssl.pemfile has to be set when ssl.engine is enabled (in {context})")]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(srvconf::pemfile)))]
    MissingPemFile { context: String },

    #[error("the selected event-handler is unknown or not supported: {0}")]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(srvconf::event_handler)))]
    UnknownEventHandler(String),

    #[error("there is no event handler available for this system")]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(srvconf::event_handler)))]
    NoEventHandler,

    #[error("Capability settings error: {0}")]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(srvconf::capabilities)))]
    Capabilities(#[from] confique::Error),

    #[error("Failed to render settings: {0}")]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(srvconf::render)))]
    Render(#[from] serde_json::Error),
}

impl ConfigError {
    /// Line of the configuration file the error points at, if any.
    pub fn line(&self) -> Option<usize> {
        match self {
            ConfigError::Lex { line, .. }
            | ConfigError::Parse { line, .. }
            | ConfigError::Type { line, .. }
            | ConfigError::InvalidPattern { line, .. }
            | ConfigError::UnknownKey { line, .. } => Some(*line),
            _ => None,
        }
    }
}
