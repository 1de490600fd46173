//! Settings values with merge sentinels.
//!
//! [`Value`] mirrors the shape of [`serde_json::Value`] and adds a
//! [`Sentinel`] variant used only while fragments are being merged. The
//! sentinels never survive into the tree handed to a parser: `Removed` entries
//! are pruned and leftover `Empty` slots become `null`.

use std::collections::BTreeMap;
use std::fmt;

use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use serde_json::Number;

use crate::path::{FragmentPath, PathSegment};

/// Ordered map used for object values.
pub type Map = BTreeMap<String, Value>;

/// Markers that only exist inside intermediate merge structures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Sentinel {
    /// No value was provided at this slot; merging keeps the left-hand side.
    Empty,
    /// The key holding this marker is deleted when the tree is finalised.
    Removed,
}

impl fmt::Display for Sentinel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("<EMPTY>"),
            Self::Removed => f.write_str("<REMOVED>"),
        }
    }
}

/// A nested configuration value.
///
/// # Examples
///
/// ```
/// use climate_config::Value;
/// use serde_json::json;
///
/// let value = Value::from(json!({"a": [1, 2]}));
/// assert_ne!(Value::EMPTY, Value::Null);
/// assert_eq!(value.into_json(), json!({"a": [1, 2]}));
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    /// JSON `null`.
    #[default]
    Null,
    /// Boolean value.
    Bool(bool),
    /// Numeric value.
    Number(Number),
    /// String value.
    String(String),
    /// Sequence of values.
    Array(Vec<Value>),
    /// Map of string keys to values.
    Object(Map),
    /// Merge marker; see [`Sentinel`].
    Sentinel(Sentinel),
}

impl Value {
    /// The [`Sentinel::Empty`] marker as a value.
    pub const EMPTY: Self = Self::Sentinel(Sentinel::Empty);

    /// The [`Sentinel::Removed`] marker as a value.
    pub const REMOVED: Self = Self::Sentinel(Sentinel::Removed);

    /// Returns `true` for the [`Sentinel::Empty`] marker.
    #[must_use]
    pub const fn is_empty_slot(&self) -> bool {
        matches!(self, Self::Sentinel(Sentinel::Empty))
    }

    /// Returns `true` for the [`Sentinel::Removed`] marker.
    #[must_use]
    pub const fn is_removed(&self) -> bool {
        matches!(self, Self::Sentinel(Sentinel::Removed))
    }

    /// Returns the string slice if this is a string value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Returns the map if this is an object value.
    #[must_use]
    pub const fn as_object(&self) -> Option<&Map> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Returns the items if this is an array value.
    #[must_use]
    pub const fn as_array(&self) -> Option<&Vec<Self>> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Returns `true` for values that carry no settings: `null`, an empty
    /// map, an empty array or an empty string.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Object(map) => map.is_empty(),
            Self::Array(items) => items.is_empty(),
            Self::String(s) => s.is_empty(),
            Self::Bool(_) | Self::Number(_) | Self::Sentinel(_) => false,
        }
    }

    /// Parse `raw` as JSON, falling back to the raw string.
    ///
    /// # Examples
    ///
    /// ```
    /// use climate_config::Value;
    /// use serde_json::json;
    ///
    /// assert_eq!(Value::parse_json_or_string("[4, 5]"), Value::from(json!([4, 5])));
    /// assert_eq!(Value::parse_json_or_string("al//x"), Value::from("al//x"));
    /// ```
    #[must_use]
    pub fn parse_json_or_string(raw: &str) -> Self {
        serde_json::from_str::<serde_json::Value>(raw)
            .map_or_else(|_| Self::String(raw.to_owned()), Self::from)
    }

    /// Borrow the value found by walking `path`.
    ///
    /// # Examples
    ///
    /// ```
    /// use climate_config::{FragmentPath, Value};
    /// use serde_json::json;
    ///
    /// let value = Value::from(json!({"a": {"b": [1, 2]}}));
    /// let found = value.get_nested(&FragmentPath::from_spec("a.b.0"));
    /// assert_eq!(found, Some(&Value::from(1)));
    /// ```
    #[must_use]
    pub fn get_nested(&self, path: &FragmentPath) -> Option<&Self> {
        path.iter()
            .try_fold(self, |current, segment| match (current, segment) {
                (Self::Object(map), PathSegment::Key(key)) => map.get(key),
                (Self::Array(items), PathSegment::Index(index)) => items.get(*index),
                _ => None,
            })
    }

    /// Consume the value and return the part found by walking `path`.
    #[must_use]
    pub fn take_nested(self, path: &FragmentPath) -> Option<Self> {
        path.iter()
            .try_fold(self, |current, segment| match (current, segment) {
                (Self::Object(mut map), PathSegment::Key(key)) => map.remove(key),
                (Self::Array(items), PathSegment::Index(index)) => items.into_iter().nth(*index),
                _ => None,
            })
    }

    /// Delete every entry holding [`Sentinel::Removed`], recursively.
    ///
    /// Map entries are removed by key and sequence entries by position.
    /// Pruning an already pruned tree is a no-op.
    ///
    /// # Examples
    ///
    /// ```
    /// use climate_config::Value;
    /// use serde_json::json;
    ///
    /// let mut value = Value::from(json!({"keep": 1, "nested": {}}));
    /// if let Value::Object(map) = &mut value {
    ///     map.insert("drop".into(), Value::REMOVED);
    /// }
    /// value.prune_removed();
    /// assert_eq!(value.into_json(), json!({"keep": 1, "nested": {}}));
    /// ```
    pub fn prune_removed(&mut self) {
        match self {
            Self::Object(map) => {
                map.retain(|_, value| !value.is_removed());
                map.values_mut().for_each(Self::prune_removed);
            }
            Self::Array(items) => {
                items.retain(|value| !value.is_removed());
                items.iter_mut().for_each(Self::prune_removed);
            }
            Self::Null | Self::Bool(_) | Self::Number(_) | Self::String(_) | Self::Sentinel(_) => {}
        }
    }

    /// Convert into a [`serde_json::Value`].
    ///
    /// Sentinels have no JSON representation and become `null`; callers prune
    /// `Removed` entries first so only unfilled `Empty` slots are affected.
    #[must_use]
    pub fn into_json(self) -> serde_json::Value {
        match self {
            Self::Null | Self::Sentinel(_) => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(b),
            Self::Number(n) => serde_json::Value::Number(n),
            Self::String(s) => serde_json::Value::String(s),
            Self::Array(items) => {
                serde_json::Value::Array(items.into_iter().map(Self::into_json).collect())
            }
            Self::Object(map) => serde_json::Value::Object(
                map.into_iter()
                    .map(|(key, value)| (key, value.into_json()))
                    .collect(),
            ),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => Self::Number(n),
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::Array(items.into_iter().map(Self::from).collect())
            }
            serde_json::Value::Object(map) => Self::Object(
                map.into_iter()
                    .map(|(key, value)| (key, Self::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<Sentinel> for Value {
    fn from(sentinel: Sentinel) -> Self {
        Self::Sentinel(sentinel)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Number(n.into())
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Self::Number(n.into())
    }
}

impl From<Vec<Self>> for Value {
    fn from(items: Vec<Self>) -> Self {
        Self::Array(items)
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Self::Object(map)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null | Self::Sentinel(_) => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Number(n) => n.serialize(serializer),
            Self::String(s) => serializer.serialize_str(s),
            Self::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Object(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (key, value) in map {
                    out.serialize_entry(key, value)?;
                }
                out.end()
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sentinel(sentinel) => sentinel.fmt(f),
            other => {
                let rendered = serde_json::to_string(other).map_err(|_| fmt::Error)?;
                f.write_str(&rendered)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    fn sentinels_only_equal_themselves() {
        assert_eq!(Value::EMPTY, Value::EMPTY);
        assert_eq!(Value::REMOVED, Value::REMOVED);
        assert_ne!(Value::EMPTY, Value::REMOVED);
        assert_ne!(Value::EMPTY, Value::Null);
        assert_ne!(Value::REMOVED, Value::Null);
    }

    #[rstest]
    #[case(json!(null), true)]
    #[case(json!({}), true)]
    #[case(json!([]), true)]
    #[case(json!(""), true)]
    #[case(json!(0), false)]
    #[case(json!(false), false)]
    #[case(json!({"a": 1}), false)]
    fn blank_values(#[case] input: serde_json::Value, #[case] expected: bool) {
        assert_eq!(Value::from(input).is_blank(), expected);
    }

    #[rstest]
    fn prune_removes_nested_markers_and_is_idempotent() {
        let mut value = Value::Object(Map::from([
            ("a".to_owned(), Value::REMOVED),
            (
                "b".to_owned(),
                Value::Array(vec![Value::from(1), Value::REMOVED, Value::from(3)]),
            ),
            (
                "c".to_owned(),
                Value::Object(Map::from([
                    ("d".to_owned(), Value::REMOVED),
                    ("e".to_owned(), Value::from("kept")),
                ])),
            ),
        ]));
        value.prune_removed();
        let once = value.clone();
        value.prune_removed();
        assert_eq!(value, once);
        assert_eq!(value.into_json(), json!({"b": [1, 3], "c": {"e": "kept"}}));
    }

    #[rstest]
    fn empty_slots_become_null_in_json() {
        let value = Value::Array(vec![Value::EMPTY, Value::from("x")]);
        assert_eq!(value.into_json(), json!([null, "x"]));
    }

    #[rstest]
    fn take_nested_extracts_sub_value() {
        let value = Value::from(json!({"a": [{"b": 1}, {"c": 2}]}));
        let taken = value.take_nested(&FragmentPath::from_spec("a.1"));
        assert_eq!(taken, Some(Value::from(json!({"c": 2}))));
    }

    #[rstest]
    fn get_nested_rejects_mismatched_segments() {
        let value = Value::from(json!({"a": [1]}));
        assert!(value.get_nested(&FragmentPath::from_spec("a.b")).is_none());
        assert!(value.get_nested(&FragmentPath::from_spec("a.3")).is_none());
    }

    #[rstest]
    fn display_renders_json_and_markers() {
        assert_eq!(Value::from(json!({"a": 1})).to_string(), r#"{"a":1}"#);
        assert_eq!(Value::REMOVED.to_string(), "<REMOVED>");
    }
}
