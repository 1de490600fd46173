//! Built-in substitution rules.

use std::io;
use std::sync::Arc;

use camino::Utf8Path;
use tracing::info;

use super::{Replacement, SubstitutionRule};
use crate::fragment::Fragment;
use crate::loader::{
    FormatLoader, FormatRegistry, expand_user, expand_vars, glob_files, has_glob_magic,
    read_to_string,
};
use crate::path::FragmentPath;
use crate::value::Value;
use crate::{ClimateError, ClimateResult};

/// `_from_file`: replace the value with the contents of a file.
///
/// The value is a path, a glob or a list of either. Files with a registered
/// extension are parsed; any other file is read as trimmed text. Each file
/// matched by a glob is labelled with its own path. Missing files and globs
/// without matches are skipped.
#[derive(Clone, Debug)]
pub struct FileRule {
    formats: FormatRegistry,
}

impl FileRule {
    /// Rule parsing files with `formats`.
    #[must_use]
    pub const fn new(formats: FormatRegistry) -> Self {
        Self { formats }
    }

    fn load(&self, raw: &str, path: &FragmentPath) -> ClimateResult<Vec<Replacement>> {
        let expanded = expand_user(&expand_vars(raw));
        if has_glob_magic(&expanded) {
            return self.load_glob(&expanded, path);
        }
        let file = Utf8Path::new(&expanded);
        match self.formats.load_from_path(file) {
            Ok(value) => Ok(vec![Replacement::Value(value)]),
            Err(err) if err.is_not_found() => {
                info!(path = %path, file = %file, "settings file not found, skipping");
                Ok(Vec::new())
            }
            Err(err) if matches!(&*err, ClimateError::NoCompatibleLoader { .. }) => {
                load_text(file, path)
            }
            Err(err) => Err(err),
        }
    }

    fn load_glob(&self, pattern: &str, path: &FragmentPath) -> ClimateResult<Vec<Replacement>> {
        let files = glob_files(pattern);
        if files.is_empty() {
            info!(path = %path, pattern, "no files match settings glob, skipping");
        }
        files
            .iter()
            .map(|file| {
                let value = self.formats.load_from_path(file)?;
                Ok(Replacement::Fragment(
                    Fragment::new(value).with_source(file.as_str()),
                ))
            })
            .collect()
    }
}

fn load_text(file: &Utf8Path, path: &FragmentPath) -> ClimateResult<Vec<Replacement>> {
    match read_to_string(file) {
        Ok(text) => Ok(vec![Replacement::Value(Value::String(text.trim().to_owned()))]),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            info!(path = %path, file = %file, "settings file not found, skipping");
            Ok(Vec::new())
        }
        Err(err) => Err(ClimateError::io(file.as_std_path(), err)),
    }
}

impl SubstitutionRule for FileRule {
    fn suffix(&self) -> &str {
        "_from_file"
    }

    fn accepts(&self, value: &Value) -> bool {
        matches!(value, Value::String(_) | Value::Array(_))
    }

    fn transform(&self, value: &Value, path: &FragmentPath) -> ClimateResult<Vec<Replacement>> {
        match value {
            Value::String(raw) => self.load(raw, path),
            Value::Array(items) => {
                let mut replacements = Vec::new();
                for item in items {
                    match item {
                        Value::String(raw) => replacements.extend(self.load(raw, path)?),
                        other => {
                            info!(path = %path, item = %other, "file path is not a string, skipping");
                        }
                    }
                }
                Ok(replacements)
            }
            _ => Ok(Vec::new()),
        }
    }
}

/// `_from_env`: replace the value with an environment variable.
///
/// The value names the variable. A value containing `$` is instead expanded
/// as a template, leaving unknown references in place. The result is
/// decoded as JSON when possible.
#[derive(Clone, Copy, Debug, Default)]
pub struct EnvRule;

impl SubstitutionRule for EnvRule {
    fn suffix(&self) -> &str {
        "_from_env"
    }

    fn transform(&self, value: &Value, path: &FragmentPath) -> ClimateResult<Vec<Replacement>> {
        let Value::String(name) = value else {
            return Ok(Vec::new());
        };
        let raw = if name.contains('$') {
            expand_vars(name)
        } else {
            match std::env::var(name) {
                Ok(found) => found,
                Err(err) => {
                    info!(path = %path, var = %name, error = %err, "environment variable unavailable, skipping");
                    return Ok(Vec::new());
                }
            }
        };
        Ok(vec![Replacement::Value(Value::parse_json_or_string(&raw))])
    }
}

/// `_from_<ext>_content`: parse the value as inline content of one format.
#[derive(Clone, Debug)]
pub struct ContentRule {
    suffix: String,
    loader: Arc<dyn FormatLoader>,
}

impl ContentRule {
    /// Rule triggered by `_from_<extension>_content` and parsed by `loader`.
    #[must_use]
    pub fn new(extension: &str, loader: Arc<dyn FormatLoader>) -> Self {
        Self {
            suffix: format!("_from_{extension}_content"),
            loader,
        }
    }
}

impl SubstitutionRule for ContentRule {
    fn suffix(&self) -> &str {
        &self.suffix
    }

    fn transform(&self, value: &Value, path: &FragmentPath) -> ClimateResult<Vec<Replacement>> {
        let Value::String(content) = value else {
            return Ok(Vec::new());
        };
        Ok(self.loader.from_content(content).map_or_else(
            |err| {
                info!(path = %path, format = self.loader.name(), error = %err, "failed to parse content, skipping");
                Vec::new()
            },
            |parsed| vec![Replacement::Value(parsed)],
        ))
    }
}
