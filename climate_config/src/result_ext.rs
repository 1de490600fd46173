//! Conversions from foreign results into [`ClimateResult`].
//!
//! Settings parsers return `ClimateResult<T>`; these helpers save them from
//! spelling out `map_err(|e| Arc::new(..))` for every fallible step.
//!
//! # Examples
//!
//! ```
//! use climate_config::{ClimateResult, ClimateResultExt};
//!
//! fn port(settings: serde_json::Value) -> ClimateResult<u16> {
//!     serde_json::from_value(settings).into_climate()
//! }
//!
//! assert_eq!(port(serde_json::json!(8080)).ok(), Some(8080));
//! ```

use std::error::Error;
use std::sync::Arc;

use crate::{ClimateError, ClimateResult};

/// Maps errors that already convert into [`ClimateError`], such as
/// `serde_json::Error`.
pub trait ClimateResultExt<T, E> {
    /// Wrap the error with its `Into<ClimateError>` conversion.
    ///
    /// # Errors
    ///
    /// Returns the converted error when `self` is `Err`.
    fn into_climate(self) -> ClimateResult<T>;
}

impl<T, E> ClimateResultExt<T, E> for Result<T, E>
where
    E: Into<ClimateError>,
{
    fn into_climate(self) -> ClimateResult<T> {
        self.map_err(|err| Arc::new(err.into()))
    }
}

/// Maps any error raised inside a settings parser to
/// [`ClimateError::Parse`].
///
/// # Examples
///
/// ```
/// use climate_config::{ClimateError, ClimateResult, ParseResultExt};
///
/// fn level(settings: &serde_json::Value) -> ClimateResult<u8> {
///     let raw = settings["level"].as_str().unwrap_or("0");
///     raw.parse::<u8>().into_parse_error()
/// }
///
/// let err = level(&serde_json::json!({"level": "high"})).unwrap_err();
/// assert!(matches!(&*err, ClimateError::Parse(_)));
/// ```
pub trait ParseResultExt<T> {
    /// Box the error as the source of a [`ClimateError::Parse`].
    ///
    /// # Errors
    ///
    /// Returns [`ClimateError::Parse`] when `self` is `Err`.
    fn into_parse_error(self) -> ClimateResult<T>;
}

impl<T, E> ParseResultExt<T> for Result<T, E>
where
    E: Error + Send + Sync + 'static,
{
    fn into_parse_error(self) -> ClimateResult<T> {
        self.map_err(ClimateError::parse)
    }
}
