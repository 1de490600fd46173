//! Constructors and classification helpers for `ClimateError`.

use std::error::Error;
use std::io;
use std::path::Path;
use std::sync::Arc;

use super::ClimateError;

impl ClimateError {
    /// Construct an [`ClimateError::Io`] for `path`.
    #[must_use]
    pub fn io(path: &Path, source: io::Error) -> Arc<Self> {
        Arc::new(Self::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Construct a [`ClimateError::File`] for a parse failure in `path`.
    #[must_use]
    pub fn file(path: &Path, source: impl Into<Box<dyn Error + Send + Sync>>) -> Arc<Self> {
        Arc::new(Self::File {
            path: path.to_path_buf(),
            source: source.into(),
        })
    }

    /// Construct a [`ClimateError::Content`] for inline `format` content.
    #[must_use]
    pub fn content(
        format: impl Into<String>,
        source: impl Into<Box<dyn Error + Send + Sync>>,
    ) -> Arc<Self> {
        Arc::new(Self::Content {
            format: format.into(),
            source: source.into(),
        })
    }

    /// Construct a [`ClimateError::InvalidOption`].
    ///
    /// # Examples
    ///
    /// ```
    /// use climate_config::ClimateError;
    /// let err = ClimateError::invalid_option("split_char", "must be a single character");
    /// assert!(matches!(&*err, ClimateError::InvalidOption { .. }));
    /// ```
    #[must_use]
    pub fn invalid_option(option: impl Into<String>, message: impl Into<String>) -> Arc<Self> {
        Arc::new(Self::InvalidOption {
            option: option.into(),
            message: message.into(),
        })
    }

    /// Wrap an arbitrary parser failure as [`ClimateError::Parse`].
    ///
    /// # Examples
    ///
    /// ```
    /// use climate_config::ClimateError;
    /// let err = ClimateError::parse(std::io::Error::other("forbidden key"));
    /// assert!(err.to_string().contains("forbidden key"));
    /// ```
    #[must_use]
    pub fn parse(source: impl Into<Box<dyn Error + Send + Sync>>) -> Arc<Self> {
        Arc::new(Self::Parse(source.into()))
    }

    /// Construct a [`ClimateError::Validation`] for `key`.
    #[must_use]
    pub fn validation(key: impl Into<String>, message: impl Into<String>) -> Arc<Self> {
        Arc::new(Self::Validation {
            key: key.into(),
            message: message.into(),
        })
    }

    /// Returns `true` when the error reports a file that does not exist.
    ///
    /// Substitution rules use this to tell a dangling `_from_file` reference
    /// apart from a file that exists but is malformed.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }
}
