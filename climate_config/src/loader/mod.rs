//! Settings file formats and the registry that dispatches between them.
//!
//! A [`FormatRegistry`] owns an ordered list of [`FormatLoader`]s. Paths are
//! matched by extension and inline content by its leading characters; the
//! first loader that accepts an input wins.

use std::error::Error;
use std::fmt;
use std::sync::Arc;

use camino::Utf8Path;
use tracing::{debug, trace};

use crate::fragment::Fragment;
use crate::value::{Map, Value};
use crate::{ClimateError, ClimateResult};

mod expand;
mod formats;
mod fs;

pub(crate) use expand::{expand_user, expand_vars};
pub use formats::JsonLoader;
#[cfg(feature = "json5")]
pub use formats::Json5Loader;
#[cfg(feature = "toml")]
pub use formats::TomlLoader;
#[cfg(feature = "yaml")]
pub use formats::YamlLoader;
pub(crate) use fs::{glob_files, has_glob_magic, read_to_string};

/// Boxed error returned by [`FormatLoader::parse`].
pub type ParseError = Box<dyn Error + Send + Sync>;

/// A settings file format.
///
/// Implementors only supply the parser and the matching rules; reading files
/// and wrapping errors are provided.
pub trait FormatLoader: fmt::Debug + Send + Sync {
    /// Short format name used in error messages, e.g. `"json"`.
    fn name(&self) -> &'static str;

    /// File extensions handled by this format, without the leading dot.
    fn extensions(&self) -> &'static [&'static str];

    /// Prefixes that identify inline content of this format. An empty list
    /// means the format is only ever loaded from files.
    fn content_prefixes(&self) -> &'static [&'static str];

    /// Parse `content` into a JSON value.
    ///
    /// # Errors
    ///
    /// Returns the format parser's error when `content` is malformed.
    fn parse(&self, content: &str) -> Result<serde_json::Value, ParseError>;

    /// Parse inline content.
    ///
    /// # Errors
    ///
    /// Returns [`ClimateError::Content`] when parsing fails.
    fn from_content(&self, content: &str) -> ClimateResult<Value> {
        self.parse(content)
            .map(Value::from)
            .map_err(|err| ClimateError::content(self.name(), err))
    }

    /// Read and parse the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ClimateError::Io`] when the file cannot be read and
    /// [`ClimateError::File`] when its contents fail to parse.
    fn from_path(&self, path: &Utf8Path) -> ClimateResult<Value> {
        let content =
            fs::read_to_string(path).map_err(|err| ClimateError::io(path.as_std_path(), err))?;
        self.parse(&content)
            .map(Value::from)
            .map_err(|err| ClimateError::file(path.as_std_path(), err))
    }

    /// Returns `true` when `input` is a single-line path with one of
    /// [`FormatLoader::extensions`].
    fn is_path(&self, input: &str) -> bool {
        let trimmed = input.trim();
        if trimmed.is_empty() || trimmed.lines().count() != 1 {
            return false;
        }
        Utf8Path::new(trimmed).extension().is_some_and(|ext| {
            self.extensions()
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
    }

    /// Returns `true` when `input` starts with one of
    /// [`FormatLoader::content_prefixes`], ignoring leading whitespace.
    fn is_content(&self, input: &str) -> bool {
        let trimmed = input.trim_start();
        self.content_prefixes()
            .iter()
            .any(|prefix| trimmed.starts_with(prefix))
    }
}

/// Ordered table of [`FormatLoader`]s.
///
/// # Examples
///
/// ```
/// use climate_config::FormatRegistry;
/// use serde_json::json;
///
/// let formats = FormatRegistry::builtin();
/// let value = formats.load_from_content(r#"{"a": 1}"#)?;
/// assert_eq!(value.into_json(), json!({"a": 1}));
/// # Ok::<_, std::sync::Arc<climate_config::ClimateError>>(())
/// ```
#[derive(Clone, Debug)]
pub struct FormatRegistry {
    loaders: Vec<Arc<dyn FormatLoader>>,
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl FormatRegistry {
    /// Registry with no formats.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            loaders: Vec::new(),
        }
    }

    /// Registry with every format enabled by cargo features.
    #[must_use]
    pub fn builtin() -> Self {
        let mut loaders: Vec<Arc<dyn FormatLoader>> = vec![Arc::new(JsonLoader)];
        #[cfg(feature = "yaml")]
        loaders.push(Arc::new(YamlLoader));
        #[cfg(feature = "toml")]
        loaders.push(Arc::new(TomlLoader));
        #[cfg(feature = "json5")]
        loaders.push(Arc::new(Json5Loader));
        Self { loaders }
    }

    /// Append `loader`; earlier loaders take precedence.
    #[must_use]
    pub fn register(mut self, loader: impl FormatLoader + 'static) -> Self {
        self.loaders.push(Arc::new(loader));
        self
    }

    /// Registered loaders in precedence order.
    pub fn loaders(&self) -> impl Iterator<Item = &Arc<dyn FormatLoader>> {
        self.loaders.iter()
    }

    /// `(extension, loader)` pairs, one per extension of each registered
    /// loader. Each pair backs a `_from_<extension>_content` trigger.
    #[must_use]
    pub fn content_triggers(&self) -> Vec<(&'static str, Arc<dyn FormatLoader>)> {
        self.loaders
            .iter()
            .flat_map(|loader| {
                loader
                    .extensions()
                    .iter()
                    .map(move |ext| (*ext, Arc::clone(loader)))
            })
            .collect()
    }

    /// Load the file at `path` with the first loader accepting its extension.
    ///
    /// # Errors
    ///
    /// Returns [`ClimateError::NoCompatibleLoader`] when no loader accepts
    /// the extension, otherwise any error from [`FormatLoader::from_path`].
    pub fn load_from_path(&self, path: &Utf8Path) -> ClimateResult<Value> {
        let loader = self
            .loaders
            .iter()
            .find(|loader| loader.is_path(path.as_str()))
            .ok_or_else(|| no_compatible_loader(path.as_str()))?;
        trace!(path = %path, format = loader.name(), "loading settings file");
        loader.from_path(path)
    }

    /// Parse inline `content` with the first loader recognising it.
    ///
    /// Empty content yields an empty object.
    ///
    /// # Errors
    ///
    /// Returns [`ClimateError::NoCompatibleLoader`] when no loader recognises
    /// the content, otherwise any error from [`FormatLoader::from_content`].
    pub fn load_from_content(&self, content: &str) -> ClimateResult<Value> {
        if content.is_empty() {
            return Ok(Value::Object(Map::new()));
        }
        let loader = self
            .loaders
            .iter()
            .find(|loader| loader.is_content(content))
            .ok_or_else(|| no_compatible_loader(content))?;
        loader.from_content(content)
    }

    /// Load settings from a path, a glob or inline content.
    ///
    /// Environment variables and a leading `~` are expanded first. Every
    /// matching file becomes one root fragment, in sorted order, with the
    /// file path as its source. When nothing matches, the original input is
    /// parsed as inline content with source `"content"`. Empty input yields
    /// no fragments.
    ///
    /// # Errors
    ///
    /// Returns any error from [`FormatRegistry::load_from_path`] or
    /// [`FormatRegistry::load_from_content`].
    pub fn iter_load(&self, path_or_content: &str) -> ClimateResult<Vec<Fragment>> {
        if path_or_content.is_empty() {
            return Ok(Vec::new());
        }
        let expanded = expand_user(&expand_vars(path_or_content));
        let files = glob_files(&expanded);
        if files.is_empty() {
            let value = self.load_from_content(path_or_content)?;
            return Ok(vec![Fragment::new(value).with_source("content")]);
        }
        files
            .iter()
            .map(|file| {
                let value = self.load_from_path(file)?;
                debug!(path = %file, "loaded settings file");
                Ok(Fragment::new(value).with_source(file.as_str()))
            })
            .collect()
    }
}

fn no_compatible_loader(input: &str) -> Arc<ClimateError> {
    Arc::new(ClimateError::NoCompatibleLoader {
        input: input.to_owned(),
    })
}
