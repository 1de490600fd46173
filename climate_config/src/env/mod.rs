//! Environment variables as settings fragments.
//!
//! A variable such as `MYAPP_SERVER__PORT=8080` becomes a fragment holding
//! `8080` at path `server.port`. Names are matched case-insensitively against
//! the prefix and keys are lower-cased. Nesting is expressed with a doubled
//! split character; `implicit_depth` additionally treats the first few single
//! split characters as nesting boundaries.

use std::collections::BTreeMap;

use tracing::{debug, trace, warn};
use uncased::{Uncased, UncasedStr};

use crate::fragment::Fragment;
use crate::loader::FormatRegistry;
use crate::path::{FragmentPath, PathSegment};
use crate::value::Value;
use crate::{ClimateError, ClimateResult};

/// Prefix used when none is configured.
pub const DEFAULT_PREFIX: &str = "CLIMATE";

/// Suffix naming the settings file variable when none is configured.
pub const DEFAULT_SETTINGS_FILE_SUFFIX: &str = "SETTINGS_FILE";

/// Turns prefixed environment variables into [`Fragment`]s.
///
/// # Examples
///
/// ```
/// use climate_config::{EnvParser, FormatRegistry, FragmentPath};
///
/// let parser = EnvParser::new().with_prefix("myapp").with_implicit_depth(1);
/// assert_eq!(parser.prefix(), "MYAPP_");
/// assert_eq!(parser.settings_file_env_var(), "MYAPP_SETTINGS_FILE");
///
/// let fragments = parser.iter_load_from(
///     [("MYAPP_SERVER_PORT", "8080")],
///     &FormatRegistry::builtin(),
/// )?;
/// assert_eq!(fragments[0].path(), &FragmentPath::from_spec("server.port"));
/// # Ok::<_, std::sync::Arc<climate_config::ClimateError>>(())
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnvParser {
    prefix: String,
    split_char: char,
    implicit_depth: usize,
    settings_file_suffix: String,
    exclude: Vec<Uncased<'static>>,
}

impl Default for EnvParser {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_owned(),
            split_char: '_',
            implicit_depth: 0,
            settings_file_suffix: DEFAULT_SETTINGS_FILE_SUFFIX.to_owned(),
            exclude: Vec::new(),
        }
    }
}

impl EnvParser {
    /// Parser with the default prefix, `_` as split character and no
    /// implicit nesting.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Only consider variables starting with `prefix` (case-insensitive).
    ///
    /// An empty prefix leaves only the split character, so with the default
    /// `_` just variables such as `_PORT` are considered.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Split variable names at `split_char`.
    ///
    /// # Errors
    ///
    /// Returns [`ClimateError::InvalidOption`] unless `split_char` is exactly
    /// one character.
    pub fn with_split_char(mut self, split_char: &str) -> ClimateResult<Self> {
        let mut chars = split_char.chars();
        match (chars.next(), chars.next()) {
            (Some(ch), None) => {
                self.split_char = ch;
                Ok(self)
            }
            _ => Err(ClimateError::invalid_option(
                "split_char",
                format!("must be a single character, got {split_char:?}"),
            )),
        }
    }

    /// Treat the first `depth` single split characters after the prefix as
    /// nesting boundaries.
    #[must_use]
    pub const fn with_implicit_depth(mut self, depth: usize) -> Self {
        self.implicit_depth = depth;
        self
    }

    /// Name the settings file variable `<PREFIX><SUFFIX>`.
    ///
    /// # Errors
    ///
    /// Returns [`ClimateError::InvalidOption`] when `suffix` is empty.
    pub fn with_settings_file_suffix(mut self, suffix: impl Into<String>) -> ClimateResult<Self> {
        let owned = suffix.into();
        if owned.is_empty() {
            return Err(ClimateError::invalid_option(
                "settings_file_suffix",
                "must not be empty",
            ));
        }
        self.settings_file_suffix = owned;
        Ok(self)
    }

    /// Ignore the named variables (case-insensitive).
    #[must_use]
    pub fn with_exclude<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude = names
            .into_iter()
            .map(|name| Uncased::from_owned(name.into()))
            .collect();
        self
    }

    /// Upper-cased prefix ending in exactly one split character, e.g.
    /// `"this"` becomes `"THIS_"`. An empty prefix yields the split
    /// character alone.
    #[must_use]
    pub fn prefix(&self) -> String {
        let base = self.strip_split_char(&self.prefix);
        format!("{}{}", base.to_uppercase(), self.split_char)
    }

    /// Character separating name sections.
    #[must_use]
    pub const fn split_char(&self) -> char {
        self.split_char
    }

    /// Number of single split characters treated as nesting boundaries.
    #[must_use]
    pub const fn implicit_depth(&self) -> usize {
        self.implicit_depth
    }

    /// Suffix of the settings file variable as configured.
    #[must_use]
    pub fn settings_file_suffix(&self) -> &str {
        &self.settings_file_suffix
    }

    /// Name of the variable pointing at a settings file, e.g.
    /// `MYAPP_SETTINGS_FILE`. It is never parsed as a setting itself.
    #[must_use]
    pub fn settings_file_env_var(&self) -> String {
        format!(
            "{}{}",
            self.prefix(),
            self.strip_split_char(&self.settings_file_suffix).to_uppercase()
        )
    }

    /// Returns `true` when `name` is excluded from parsing.
    #[must_use]
    pub fn is_excluded(&self, name: &str) -> bool {
        let candidate = UncasedStr::new(name);
        candidate == UncasedStr::new(&self.settings_file_env_var())
            || self
                .exclude
                .iter()
                .any(|excluded| candidate == excluded.as_uncased_str())
    }

    /// Path encoded by the variable `name`, or `None` when the variable does
    /// not match the prefix, is excluded or encodes no keys.
    ///
    /// # Examples
    ///
    /// ```
    /// use climate_config::{EnvParser, FragmentPath};
    ///
    /// let parser = EnvParser::new().with_prefix("APP");
    /// assert_eq!(
    ///     parser.nested_keys("APP_LIST__1__NAME"),
    ///     Some(FragmentPath::from_spec("list.1.name"))
    /// );
    /// assert_eq!(parser.nested_keys("OTHER_NAME"), None);
    /// ```
    #[must_use]
    pub fn nested_keys(&self, name: &str) -> Option<FragmentPath> {
        if self.is_excluded(name) {
            return None;
        }
        let prefix = self.prefix();
        let head = name.get(..prefix.len())?;
        if UncasedStr::new(head) != UncasedStr::new(&prefix) {
            return None;
        }
        let body = name.get(prefix.len()..)?.to_lowercase();
        let doubled: String = [self.split_char, self.split_char].iter().collect();
        let mut segments = Vec::new();
        for (position, section) in body.split(doubled.as_str()).enumerate() {
            if position == 0 && self.implicit_depth > 0 {
                segments.extend(
                    section
                        .splitn(self.implicit_depth.saturating_add(1), self.split_char)
                        .filter(|part| !part.is_empty())
                        .map(PathSegment::parse),
                );
            } else if !section.is_empty() {
                segments.push(PathSegment::parse(section));
            }
        }
        (!segments.is_empty()).then(|| FragmentPath::from(segments))
    }

    /// Load fragments from the process environment.
    ///
    /// Variables whose name or value is not valid Unicode are skipped.
    ///
    /// # Errors
    ///
    /// Returns any error raised while loading the settings file variable.
    pub fn iter_load(&self, formats: &FormatRegistry) -> ClimateResult<Vec<Fragment>> {
        let vars = std::env::vars_os()
            .filter_map(|(name, value)| Some((name.into_string().ok()?, value.into_string().ok()?)));
        self.iter_load_from(vars, formats)
    }

    /// Load fragments from an explicit set of variables.
    ///
    /// The settings file variable is loaded first, each resulting fragment
    /// labelled `ENV:<VAR>:<source>`. Every matching variable then yields one
    /// fragment labelled `ENV:<VAR>`, in variable name order. Values are
    /// decoded as JSON when possible and kept as strings otherwise.
    ///
    /// # Errors
    ///
    /// Returns any error from [`FormatRegistry::iter_load`] for the settings
    /// file variable, or [`ClimateError::InvalidOption`] when a variable names
    /// an index above [`MAX_SEQUENCE_INDEX`](crate::MAX_SEQUENCE_INDEX).
    pub fn iter_load_from<I, K, V>(
        &self,
        vars: I,
        formats: &FormatRegistry,
    ) -> ClimateResult<Vec<Fragment>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let sorted: BTreeMap<String, String> = vars
            .into_iter()
            .map(|(name, value)| (name.into(), value.into()))
            .collect();
        let mut fragments = Vec::new();

        let file_var = self.settings_file_env_var();
        if let Some(path_or_content) = sorted.get(&file_var).filter(|value| !value.is_empty()) {
            debug!(var = %file_var, "loading settings file from environment");
            fragments.extend(formats.iter_load(path_or_content)?.into_iter().map(|fragment| {
                let source = format!("ENV:{file_var}:{}", fragment.source());
                fragment.with_source(source)
            }));
        }

        for (name, raw) in &sorted {
            let Some(path) = self.nested_keys(name) else {
                continue;
            };
            path.validate()
                .inspect_err(|_| warn!(var = %name, "environment variable index out of range"))?;
            trace!(var = %name, path = %path, "parsed setting from environment");
            fragments.push(
                Fragment::new(Value::parse_json_or_string(raw))
                    .with_source(format!("ENV:{name}"))
                    .with_path(path),
            );
        }
        Ok(fragments)
    }

    fn strip_split_char<'a>(&self, input: &'a str) -> &'a str {
        input
            .strip_prefix(self.split_char)
            .or_else(|| input.strip_suffix(self.split_char))
            .unwrap_or(input)
    }
}

#[cfg(test)]
mod tests;
