//! Error taxonomy for detection.
//!
//! Unsupported features are never errors: probes report `false`. Errors are
//! reserved for programmer misuse (bad patterns, wrongly shaped arguments)
//! and for configuration that cannot be loaded.

use std::path::PathBuf;

use serde_json::Value;
use thiserror::Error;

/// Errors surfaced by the detection API.
#[derive(Debug, Error)]
pub enum DetectionError {
    /// A user agent pattern failed to compile.
    #[error("invalid user agent pattern `{pattern}`: {message}")]
    InvalidPattern { pattern: String, message: String },

    /// An argument had the wrong shape for the probe it was passed to.
    #[error("invalid argument for {context}: expected {expected}, found {found}")]
    TypeArgument {
        context: String,
        expected: &'static str,
        found: String,
    },

    /// Two checks were registered under the same name.
    #[error("duplicate check name: {name}")]
    DuplicateCheck { name: String },

    /// The configuration file could not be read.
    #[error("failed to read config {}: {source}", path.display())]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid JSON for [`crate::DetectionConfig`].
    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] serde_json::Error),
}

impl DetectionError {
    /// Builds a [`DetectionError::TypeArgument`] describing a JSON value of the wrong kind.
    pub(crate) fn unexpected_json(context: &str, expected: &'static str, found: &Value) -> Self {
        Self::TypeArgument {
            context: context.to_string(),
            expected,
            found: json_kind(found).to_string(),
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T, E = DetectionError> = std::result::Result<T, E>;

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
