//! Settings values tagged with their provenance and tree position.

use crate::merge::merge_nested;
use crate::path::{FragmentPath, PathSegment};
use crate::value::Value;

/// A partial settings value together with where it came from and where it
/// belongs in the final tree.
///
/// Fragments are never mutated in place: [`Fragment::merge`] and the builder
/// methods return new instances.
///
/// # Examples
///
/// ```
/// use climate_config::{Fragment, FragmentPath};
/// use serde_json::json;
///
/// let fragment = Fragment::new(json!("bla"))
///     .with_source("test")
///     .with_path(FragmentPath::from_spec("a.b"));
/// assert_eq!(
///     fragment.expand_value_with_path().into_json(),
///     json!({"a": {"b": "bla"}})
/// );
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Fragment {
    value: Value,
    source: String,
    path: FragmentPath,
}

impl Fragment {
    /// Create a root-level fragment with no source label.
    #[must_use]
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            source: String::new(),
            path: FragmentPath::root(),
        }
    }

    /// Replace the source label.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Replace the tree position.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<FragmentPath>) -> Self {
        self.path = path.into();
        self
    }

    /// Replace the value, keeping source and path.
    #[must_use]
    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = value.into();
        self
    }

    /// The carried value.
    #[must_use]
    pub const fn value(&self) -> &Value {
        &self.value
    }

    /// Free-form provenance label; may be empty.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Location of [`Fragment::value`] relative to the settings root.
    #[must_use]
    pub const fn path(&self) -> &FragmentPath {
        &self.path
    }

    /// Consume the fragment, returning its value.
    #[must_use]
    pub fn into_value(self) -> Value {
        self.value
    }

    /// Walk the value depth first and yield one fragment per leaf.
    ///
    /// Objects and arrays are descended into; everything else, strings and
    /// sentinels included, is a leaf. Each yielded fragment keeps this
    /// fragment's source and extends its path with the traversed keys and
    /// indices. Empty containers yield nothing.
    ///
    /// # Examples
    ///
    /// ```
    /// use climate_config::{Fragment, FragmentPath};
    /// use serde_json::json;
    ///
    /// let leaves: Vec<_> = Fragment::new(json!({"a": [1, "x"]})).iter_leaves().collect();
    /// assert_eq!(leaves.len(), 2);
    /// assert_eq!(leaves[1].path(), &FragmentPath::from_spec("a.1"));
    /// ```
    pub fn iter_leaves(&self) -> impl Iterator<Item = Self> + use<> {
        let mut leaves = Vec::new();
        self.collect_leaves(&self.value, self.path.clone(), &mut leaves);
        leaves.into_iter()
    }

    fn collect_leaves(&self, value: &Value, path: FragmentPath, out: &mut Vec<Self>) {
        match value {
            Value::Object(map) => {
                for (key, child) in map {
                    self.collect_leaves(child, path.join(PathSegment::Key(key.clone())), out);
                }
            }
            Value::Array(items) => {
                for (index, child) in items.iter().enumerate() {
                    self.collect_leaves(child, path.join(index), out);
                }
            }
            leaf => out.push(Self {
                value: leaf.clone(),
                source: self.source.clone(),
                path,
            }),
        }
    }

    /// Build the full tree holding this fragment's value at its path.
    #[must_use]
    pub fn expand_value_with_path(&self) -> Value {
        self.path.expand(self.value.clone())
    }

    /// Merge `other` over `self`.
    ///
    /// Both fragments are expanded to full trees and merged with
    /// [`merge_nested`]. The result is localised to the common prefix of the
    /// two paths, and the non-empty source labels are joined with `", "`.
    ///
    /// # Examples
    ///
    /// ```
    /// use climate_config::{Fragment, FragmentPath};
    /// use serde_json::json;
    ///
    /// let base = Fragment::new(json!({"a": 4, "b": ["c", "d", "e"]})).with_path("root");
    /// let patch = Fragment::new(json!({"bla": 2})).with_path("root.b.1");
    /// let merged = base.merge(&patch);
    /// assert_eq!(merged.path(), &FragmentPath::from_spec("root"));
    /// assert_eq!(
    ///     merged.value().clone().into_json(),
    ///     json!({"a": 4, "b": ["c", {"bla": 2}, "e"]})
    /// );
    /// ```
    #[must_use]
    pub fn merge(&self, other: &Self) -> Self {
        let merged = merge_nested(
            &self.expand_value_with_path(),
            &other.expand_value_with_path(),
        );
        let path = self.path.common(&other.path);
        let value = merged.take_nested(&path).unwrap_or_default();
        let source = [self.source.as_str(), other.source.as_str()]
            .into_iter()
            .filter(|label| !label.is_empty())
            .collect::<Vec<_>>()
            .join(", ");
        Self { value, source, path }
    }
}
