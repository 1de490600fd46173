//! Temporary directories holding settings files.
//!
//! # Examples
//!
//! ```
//! use climate_config_test_helpers::settings_dir::SettingsDir;
//!
//! # fn main() -> anyhow::Result<()> {
//! let dir = SettingsDir::new()?;
//! let path = dir.write("conf/app.json", r#"{"debug": true}"#)?;
//! assert!(path.starts_with(dir.path()));
//! assert_eq!(std::fs::read_to_string(&path)?, r#"{"debug": true}"#);
//! # Ok(())
//! # }
//! ```

use std::fs;

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use tempfile::TempDir;

/// A temporary directory with a UTF-8 root, removed on drop.
#[derive(Debug)]
pub struct SettingsDir {
    root: Utf8PathBuf,
    _dir: TempDir,
}

impl SettingsDir {
    /// Create an empty directory under the system temp location.
    ///
    /// # Errors
    ///
    /// Returns an error when the directory cannot be created or its path is
    /// not valid UTF-8.
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir().context("create settings directory")?;
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf())
            .map_err(|path| anyhow::anyhow!("non UTF-8 temp dir: {}", path.display()))?;
        Ok(Self { root, _dir: dir })
    }

    /// Root of the directory.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.root
    }

    /// `name` resolved against the root; the file need not exist.
    #[must_use]
    pub fn join(&self, name: &str) -> Utf8PathBuf {
        self.root.join(name)
    }

    /// Write `contents` to `name`, creating parent directories, and return
    /// the absolute path.
    ///
    /// # Errors
    ///
    /// Returns an error when a directory or the file cannot be written.
    pub fn write(&self, name: &str, contents: &str) -> Result<Utf8PathBuf> {
        let path = self.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("create {parent}"))?;
        }
        fs::write(&path, contents).with_context(|| format!("write {path}"))?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_creates_nested_files() -> Result<()> {
        let dir = SettingsDir::new()?;
        let path = dir.write("a/b/c.toml", "x = 1")?;
        anyhow::ensure!(path == dir.join("a/b/c.toml"));
        anyhow::ensure!(fs::read_to_string(&path)? == "x = 1");
        Ok(())
    }

    #[test]
    fn directory_is_removed_on_drop() -> Result<()> {
        let dir = SettingsDir::new()?;
        let root = dir.path().to_path_buf();
        drop(dir);
        anyhow::ensure!(!root.exists(), "{root} still exists");
        Ok(())
    }
}
