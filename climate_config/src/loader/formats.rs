//! Built-in settings formats.

use super::{FormatLoader, ParseError};

/// JSON files (`.json`) and inline objects starting with `{`.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonLoader;

impl FormatLoader for JsonLoader {
    fn name(&self) -> &'static str {
        "json"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["json"]
    }

    fn content_prefixes(&self) -> &'static [&'static str] {
        &["{"]
    }

    fn parse(&self, content: &str) -> Result<serde_json::Value, ParseError> {
        Ok(serde_json::from_str(content)?)
    }
}

/// YAML files (`.yml`, `.yaml`) and inline documents starting with `---`.
///
/// Parsed with `serde-saphyr` using strict booleans, so only `true` and
/// `false` are booleans; `yes`, `on` and friends stay strings.
#[cfg(feature = "yaml")]
#[derive(Clone, Copy, Debug, Default)]
pub struct YamlLoader;

#[cfg(feature = "yaml")]
impl FormatLoader for YamlLoader {
    fn name(&self) -> &'static str {
        "yaml"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["yml", "yaml"]
    }

    fn content_prefixes(&self) -> &'static [&'static str] {
        &["---"]
    }

    fn parse(&self, content: &str) -> Result<serde_json::Value, ParseError> {
        let options = serde_saphyr::Options {
            strict_booleans: true,
            ..serde_saphyr::Options::default()
        };
        Ok(serde_saphyr::from_str_with_options(content, options)?)
    }
}

/// TOML files (`.toml`, `.ini`, `.config`, `.cfg`) and inline documents
/// starting with a `[` table header.
#[cfg(feature = "toml")]
#[derive(Clone, Copy, Debug, Default)]
pub struct TomlLoader;

#[cfg(feature = "toml")]
impl FormatLoader for TomlLoader {
    fn name(&self) -> &'static str {
        "toml"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["toml", "ini", "config", "cfg"]
    }

    fn content_prefixes(&self) -> &'static [&'static str] {
        &["["]
    }

    fn parse(&self, content: &str) -> Result<serde_json::Value, ParseError> {
        Ok(toml::from_str(content)?)
    }
}

/// JSON5 files (`.json5`). Inline JSON5 is not sniffed; the JSON loader owns
/// the `{` prefix.
#[cfg(feature = "json5")]
#[derive(Clone, Copy, Debug, Default)]
pub struct Json5Loader;

#[cfg(feature = "json5")]
impl FormatLoader for Json5Loader {
    fn name(&self) -> &'static str {
        "json5"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["json5"]
    }

    fn content_prefixes(&self) -> &'static [&'static str] {
        &[]
    }

    fn parse(&self, content: &str) -> Result<serde_json::Value, ParseError> {
        Ok(json5::from_str(content)?)
    }
}
