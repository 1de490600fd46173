//! Filesystem access for settings files.

use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8::Dir};

/// Return the parent directory of `path`, falling back to `"."` when the path
/// has no parent or the parent is empty.
fn parent_or_dot(path: &Utf8Path) -> &Utf8Path {
    path.parent()
        .filter(|parent| !parent.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."))
}

/// Read `path` through a `cap-std` handle on its parent directory.
pub(crate) fn read_to_string(path: &Utf8Path) -> io::Result<String> {
    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::other("cannot determine file name for settings file path"))?;
    let dir = Dir::open_ambient_dir(parent_or_dot(path), ambient_authority())?;
    dir.read_to_string(file_name)
}

/// Returns `true` when `input` contains a glob metacharacter.
pub(crate) fn has_glob_magic(input: &str) -> bool {
    input.contains(['*', '?', '['])
}

/// Regular files matching `pattern`, sorted.
///
/// Without glob metacharacters the pattern is a literal path. Invalid
/// patterns and non UTF-8 matches are treated as no match.
pub(crate) fn glob_files(pattern: &str) -> Vec<Utf8PathBuf> {
    if !has_glob_magic(pattern) {
        let path = Utf8Path::new(pattern);
        return if path.is_file() {
            vec![path.to_path_buf()]
        } else {
            Vec::new()
        };
    }
    let Ok(paths) = glob::glob(pattern) else {
        return Vec::new();
    };
    let mut files: Vec<Utf8PathBuf> = paths
        .filter_map(Result::ok)
        .filter(|path| path.is_file())
        .filter_map(|path| Utf8PathBuf::from_path_buf(path).ok())
        .collect();
    files.sort();
    files
}
