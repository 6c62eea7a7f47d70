//! Errors raised while layering and validating configuration.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Why an environment override was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvProblem {
    /// The variable carries the prefix but names no setting.
    UnknownKey,
    /// The value does not parse; holds the expected shape.
    Expected(&'static str),
}

impl fmt::Display for EnvProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownKey => f.write_str("names no setting"),
            Self::Expected(shape) => write!(f, "expected {shape}"),
        }
    }
}

/// A configuration layer or the merged result was rejected.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A file layer could not be read. A missing file lands here too; see
    /// [`ConfigError::is_not_found`].
    #[error("cannot read configuration file {}: {source}", .path.display())]
    Read {
        /// The file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// The extension or format name is neither TOML nor JSON.
    #[error("unsupported configuration format '{0}' (expected toml or json)")]
    UnsupportedFormat(String),

    /// A TOML layer does not fit the schema, unknown keys included.
    #[error("TOML layer rejected: {0}")]
    Toml(#[from] toml::de::Error),

    /// A JSON layer does not fit the schema, unknown keys included.
    #[error("JSON layer rejected: {0}")]
    Json(#[from] serde_json::Error),

    /// A setting parses but cannot drive the dispatcher or telemetry.
    #[error("invalid {setting}: {reason}")]
    Invalid {
        /// Dotted path of the setting, e.g. `metrics.listen_addr`.
        setting: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// An environment override was rejected.
    #[error("environment variable {var} {problem}")]
    Env {
        /// Full variable name, prefix included.
        var: String,
        /// What is wrong with it.
        problem: EnvProblem,
    },

    /// A `.env` file could not be loaded.
    #[error("failed to load .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),
}

impl ConfigError {
    pub(crate) fn invalid(setting: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            setting,
            reason: reason.into(),
        }
    }

    pub(crate) fn env(var: impl Into<String>, problem: EnvProblem) -> Self {
        Self::Env {
            var: var.into(),
            problem,
        }
    }

    /// True if a file layer did not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Read { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }

    /// The setting or environment variable the error is about.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::Invalid { setting, .. } => Some(*setting),
            Self::Env { var, .. } => Some(var.as_str()),
            _ => None,
        }
    }
}
