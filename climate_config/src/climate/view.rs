//! Read-only navigation of loaded JSON settings.

use std::fmt;

use serde::de::DeserializeOwned;

use crate::path::{FragmentPath, PathSegment};
use crate::result_ext::ClimateResultExt;
use crate::ClimateResult;

/// A borrowed node of the settings tree together with its path.
///
/// The view borrows the [`Climate`](crate::Climate) it came from, so the
/// settings cannot change while it is alive.
///
/// # Examples
///
/// ```
/// use climate_config::Climate;
/// use serde_json::json;
///
/// # fn main() -> climate_config::ClimateResult<()> {
/// let mut climate = Climate::builder().prefix("CLIMATE_DOC_VIEW").build()?;
/// climate.update(json!({"servers": [{"host": "a"}, {"host": "b"}]}))?;
///
/// let root = climate.item()?;
/// let host = root.at("servers.1.host").expect("host is set");
/// assert_eq!(host.value(), &json!("b"));
/// assert_eq!(host.path().to_string(), "servers.1.host");
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct SettingsItem<'a> {
    value: &'a serde_json::Value,
    path: FragmentPath,
}

impl<'a> SettingsItem<'a> {
    pub(crate) const fn root(value: &'a serde_json::Value) -> Self {
        Self {
            value,
            path: FragmentPath::root(),
        }
    }

    /// Child stored under `key` when this node is an object.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Self> {
        self.child(&PathSegment::Key(key.to_owned()))
    }

    /// Element at `index` when this node is an array.
    #[must_use]
    pub fn index(&self, index: usize) -> Option<Self> {
        self.child(&PathSegment::Index(index))
    }

    /// Descendant at `path`, relative to this node.
    #[must_use]
    pub fn at(&self, path: impl Into<FragmentPath>) -> Option<Self> {
        let relative: FragmentPath = path.into();
        relative
            .iter()
            .try_fold(self.clone(), |node, segment| node.child(segment))
    }

    /// Location of this node relative to the settings root.
    #[must_use]
    pub const fn path(&self) -> &FragmentPath {
        &self.path
    }

    /// The borrowed value.
    #[must_use]
    pub const fn value(&self) -> &'a serde_json::Value {
        self.value
    }

    /// Deserialize a copy of this node.
    ///
    /// # Errors
    ///
    /// Returns [`ClimateError::Deserialize`](crate::ClimateError::Deserialize)
    /// when the node does not match `U`.
    pub fn deserialize<U: DeserializeOwned>(&self) -> ClimateResult<U> {
        serde_json::from_value(self.value.clone()).into_climate()
    }

    fn child(&self, segment: &PathSegment) -> Option<Self> {
        let value = match (self.value, segment) {
            (serde_json::Value::Object(map), PathSegment::Key(key)) => map.get(key),
            (serde_json::Value::Array(items), PathSegment::Index(index)) => items.get(*index),
            _ => None,
        }?;
        Some(Self {
            value,
            path: self.path.join(segment.clone()),
        })
    }
}

impl fmt::Display for SettingsItem<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.value, f)
    }
}
