//! Provenance-tracked configuration aggregation.
//!
//! `climate_config` combines settings files, environment variables and
//! in-code updates into a single settings tree. Every contribution is kept as
//! a [`Fragment`] (a value, a source label and a [`FragmentPath`]) so the
//! final tree can be explained line by line through [`Climate::update_log`].
//!
//! Sources are folded in a fixed order: settings files, then environment
//! variables, then manual updates. Later sources overwrite earlier ones at
//! overlapping paths; sequences merge index by index so a sparse overlay only
//! touches the positions it names.
//!
//! Keys ending in a trigger suffix are rewritten before merging:
//!
//! - `_from_file`: the value is a path or glob whose contents replace it;
//! - `_from_env`: the value names an environment variable;
//! - `_from_<ext>_content`: the value is embedded content of a registered
//!   format, for example `_from_json_content`.
//!
//! # Example
//!
//! ```
//! use climate_config::Climate;
//! use serde_json::json;
//!
//! # fn main() -> climate_config::ClimateResult<()> {
//! let mut climate = Climate::builder().prefix("DOCTEST_EXAMPLE").build()?;
//! climate.update(json!({"server": {"port": 8080}}))?;
//! climate.update_at(json!("localhost"), "server.host")?;
//!
//! let settings = climate.settings()?;
//! assert_eq!(settings["server"]["port"], 8080);
//! assert_eq!(settings["server"]["host"], "localhost");
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

mod climate;
pub mod env;
mod error;
mod fragment;
pub mod loader;
mod merge;
mod path;
mod result_ext;
pub mod substitute;
mod value;

pub use climate::{Climate, ClimateBuilder, SettingsItem, SettingsParser};
pub use env::EnvParser;
pub use error::ClimateError;
pub use fragment::Fragment;
pub use loader::{FormatLoader, FormatRegistry};
pub use merge::merge_nested;
pub use path::{FragmentPath, MAX_SEQUENCE_INDEX, PathSegment};
pub use result_ext::{ClimateResultExt, ParseResultExt};
pub use substitute::SubstitutionPipeline;
pub use value::{Map, Sentinel, Value};

/// Result type used throughout the crate.
///
/// Errors are shared behind an [`Arc`] so they can be cloned into logs and
/// retained by callers without re-allocating the underlying source chain.
pub type ClimateResult<T> = Result<T, Arc<ClimateError>>;

/// Re-export of `serde_json` so callers can build settings patches with the
/// same version the crate uses.
pub use serde_json;
