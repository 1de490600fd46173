//! Builder for [`Climate`].
//!
//! Option errors, such as an invalid split character, are held until
//! [`ClimateBuilder::build`] so calls can be chained.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;

use super::{Climate, SettingsParser};
use crate::env::EnvParser;
use crate::loader::FormatRegistry;
use crate::result_ext::ClimateResultExt;
use crate::substitute::SubstitutionPipeline;
use crate::{ClimateError, ClimateResult};

/// Builder for [`Climate`].
///
/// # Examples
///
/// ```
/// use climate_config::Climate;
/// use serde::Deserialize;
/// use serde_json::json;
///
/// #[derive(Debug, Deserialize, PartialEq)]
/// struct Server {
///     #[serde(default)]
///     port: u16,
/// }
///
/// # fn main() -> climate_config::ClimateResult<()> {
/// let mut climate = Climate::builder()
///     .prefix("CLIMATE_DOC_BUILDER")
///     .split_char("-")
///     .deserialize::<Server>()
///     .build()?;
/// climate.update(json!({"port": 8080}))?;
/// assert_eq!(climate.settings()?, &Server { port: 8080 });
/// # Ok(())
/// # }
/// ```
pub struct ClimateBuilder<T = serde_json::Value> {
    settings_files: Vec<String>,
    env_parser: ClimateResult<EnvParser>,
    formats: FormatRegistry,
    pipeline: Option<SubstitutionPipeline>,
    parser: SettingsParser<T>,
}

impl ClimateBuilder {
    /// Builder with default options producing raw JSON settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            settings_files: Vec::new(),
            env_parser: Ok(EnvParser::new()),
            formats: FormatRegistry::builtin(),
            pipeline: None,
            parser: Box::new(Ok::<serde_json::Value, Arc<ClimateError>>),
        }
    }
}

impl Default for ClimateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ClimateBuilder<T> {
    fn map_env<F>(mut self, apply: F) -> Self
    where
        F: FnOnce(EnvParser) -> ClimateResult<EnvParser>,
    {
        self.env_parser = self.env_parser.and_then(apply);
        self
    }

    /// Environment variable prefix; see [`EnvParser::with_prefix`].
    #[must_use]
    pub fn prefix(self, prefix: impl Into<String>) -> Self {
        let owned = prefix.into();
        self.map_env(|parser| Ok(parser.with_prefix(owned)))
    }

    /// Environment name separator; see [`EnvParser::with_split_char`].
    #[must_use]
    pub fn split_char(self, split_char: &str) -> Self {
        self.map_env(|parser| parser.with_split_char(split_char))
    }

    /// See [`EnvParser::with_implicit_depth`].
    #[must_use]
    pub fn implicit_depth(self, depth: usize) -> Self {
        self.map_env(|parser| Ok(parser.with_implicit_depth(depth)))
    }

    /// See [`EnvParser::with_settings_file_suffix`].
    #[must_use]
    pub fn settings_file_suffix(self, suffix: impl Into<String>) -> Self {
        let owned = suffix.into();
        self.map_env(|parser| parser.with_settings_file_suffix(owned))
    }

    /// See [`EnvParser::with_exclude`].
    #[must_use]
    pub fn exclude<I, S>(self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.map_env(|parser| Ok(parser.with_exclude(names)))
    }

    /// Replace the environment parser, discarding earlier environment options
    /// and any error they produced.
    #[must_use]
    pub fn env_parser(mut self, env_parser: EnvParser) -> Self {
        self.env_parser = Ok(env_parser);
        self
    }

    /// Append a path, glob or inline content to load before the environment.
    #[must_use]
    pub fn settings_file(mut self, path_or_content: impl Into<String>) -> Self {
        self.settings_files.push(path_or_content.into());
        self
    }

    /// Replace the settings files.
    #[must_use]
    pub fn settings_files<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.settings_files = files.into_iter().map(Into::into).collect();
        self
    }

    /// Formats used for settings files and `_from_<ext>_content` keys.
    #[must_use]
    pub fn formats(mut self, formats: FormatRegistry) -> Self {
        self.formats = formats;
        self
    }

    /// Use `pipeline` instead of the one derived from
    /// [`ClimateBuilder::formats`].
    #[must_use]
    pub fn substitution_pipeline(mut self, pipeline: SubstitutionPipeline) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    /// Convert the merged tree with `parser`.
    ///
    /// The parser sees the tree after tombstones have been pruned. Its
    /// error is returned unchanged from the call that triggered loading.
    #[must_use]
    pub fn parser<U, F>(self, parser: F) -> ClimateBuilder<U>
    where
        F: Fn(serde_json::Value) -> ClimateResult<U> + Send + Sync + 'static,
    {
        ClimateBuilder {
            settings_files: self.settings_files,
            env_parser: self.env_parser,
            formats: self.formats,
            pipeline: self.pipeline,
            parser: Box::new(parser),
        }
    }

    /// Deserialize the merged tree into `U`.
    #[must_use]
    pub fn deserialize<U>(self) -> ClimateBuilder<U>
    where
        U: DeserializeOwned + 'static,
    {
        self.parser(deserialize_tree::<U>)
    }

    /// Finish configuration.
    ///
    /// No sources are read until settings are first accessed.
    ///
    /// # Errors
    ///
    /// Returns the first invalid option, such as a split character that is
    /// not exactly one character.
    pub fn build(self) -> ClimateResult<Climate<T>> {
        let env_parser = self.env_parser?;
        let pipeline = self
            .pipeline
            .unwrap_or_else(|| SubstitutionPipeline::new(&self.formats));
        Ok(Climate::from_parts(
            self.settings_files,
            env_parser,
            self.formats,
            pipeline,
            self.parser,
        ))
    }
}

fn deserialize_tree<U: DeserializeOwned>(tree: serde_json::Value) -> ClimateResult<U> {
    serde_json::from_value(tree).into_climate()
}

impl<T> fmt::Debug for ClimateBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClimateBuilder")
            .field("settings_files", &self.settings_files)
            .field("env_parser", &self.env_parser)
            .field("formats", &self.formats)
            .field("pipeline", &self.pipeline)
            .finish_non_exhaustive()
    }
}
