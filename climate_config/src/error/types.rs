//! Primary error enum for configuration aggregation flows.

use thiserror::Error;

/// Errors that can occur while loading, substituting or parsing settings.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClimateError {
    /// A settings file could not be read.
    #[error("Failed to read settings file '{path}': {source}")]
    Io {
        /// Path that triggered the failure.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A settings file was read but its contents failed to parse.
    #[error("Settings file error in '{path}': {source}")]
    File {
        /// Path of the offending file.
        path: std::path::PathBuf,
        /// Underlying error reported by the format parser.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Inline content for a registered format failed to parse.
    #[error("Failed to parse {format} content: {source}")]
    Content {
        /// Name of the format the content was parsed as.
        format: String,
        /// Underlying error reported by the format parser.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// No registered format loader accepts the given path or content.
    #[error("No compatible loader found for '{input}'")]
    NoCompatibleLoader {
        /// Path or content that no loader accepted.
        input: String,
    },

    /// An option was configured with an unusable value.
    #[error("Invalid option '{option}': {message}")]
    InvalidOption {
        /// Name of the option.
        option: String,
        /// Human-readable explanation of the problem.
        message: String,
    },

    /// Substitution kept deriving new fragments beyond the safety bound.
    #[error("Substitution exceeded depth {limit} at '{path}'")]
    SubstitutionDepth {
        /// Dotted path of the fragment that hit the bound.
        path: String,
        /// Depth limit that was exceeded.
        limit: usize,
    },

    /// The merged settings tree could not be deserialised into the target type.
    #[error("Failed to deserialise settings: {0}")]
    Deserialize(#[from] serde_json::Error),

    /// A parser rejected a specific settings key.
    #[error("Validation failed for '{key}': {message}")]
    Validation {
        /// Settings key that failed validation.
        key: String,
        /// Human-readable explanation of the validation failure.
        message: String,
    },

    /// A caller-supplied parser failed.
    #[error("Failed to parse settings: {0}")]
    Parse(#[source] Box<dyn std::error::Error + Send + Sync>),
}
