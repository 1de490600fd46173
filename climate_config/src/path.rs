//! Paths locating a fragment value inside the settings tree.

use std::fmt;

use crate::value::{Map, Value};
use crate::{ClimateError, ClimateResult};

/// Largest sequence index accepted by [`FragmentPath::validate`].
///
/// [`FragmentPath::expand`] fills every position before an index, so paths
/// read from callers or environment variables are checked against this
/// bound before they are expanded.
pub const MAX_SEQUENCE_INDEX: usize = 65_535;

/// One step of a [`FragmentPath`]: a map key or a sequence index.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathSegment {
    /// Key into a map.
    Key(String),
    /// Position in a sequence.
    Index(usize),
}

impl PathSegment {
    /// Returns the key if this segment addresses a map entry.
    #[must_use]
    pub fn as_key(&self) -> Option<&str> {
        match self {
            Self::Key(key) => Some(key.as_str()),
            Self::Index(_) => None,
        }
    }

    /// Parse a single path component; all-digit components are indices.
    ///
    /// Digits that overflow `usize` saturate, so the component still fails
    /// [`FragmentPath::validate`] rather than turning into a key.
    pub(crate) fn parse(component: &str) -> Self {
        let numeric = !component.is_empty() && component.bytes().all(|b| b.is_ascii_digit());
        if numeric {
            Self::Index(component.parse().unwrap_or(usize::MAX))
        } else {
            Self::Key(component.to_owned())
        }
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => f.write_str(key),
            Self::Index(index) => write!(f, "{index}"),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        Self::Key(key.to_owned())
    }
}

impl From<String> for PathSegment {
    fn from(key: String) -> Self {
        Self::Key(key)
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

/// Immutable, ordered sequence of [`PathSegment`]s.
///
/// Every derivation (`join`, `common`, `parent`) returns a new path.
///
/// # Examples
///
/// ```
/// use climate_config::{FragmentPath, PathSegment};
///
/// let path = FragmentPath::from_spec("a.b.0.c");
/// assert_eq!(path.len(), 4);
/// assert_eq!(path.get(2), Some(&PathSegment::Index(0)));
/// assert_eq!(path.to_string(), "a.b.0.c");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct FragmentPath(Vec<PathSegment>);

impl FragmentPath {
    /// The empty path, addressing the whole settings tree.
    #[must_use]
    pub const fn root() -> Self {
        Self(Vec::new())
    }

    /// Build a path from any sequence of segment-like items.
    #[must_use]
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<PathSegment>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// Parse a dotted path such as `"a.b.0.c"`.
    ///
    /// Components made only of ASCII digits become sequence indices. The
    /// empty string yields the root path.
    #[must_use]
    pub fn from_spec(spec: &str) -> Self {
        if spec.is_empty() {
            return Self::root();
        }
        Self(spec.split('.').map(PathSegment::parse).collect())
    }

    /// Number of segments.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` for the root path.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the segments.
    pub fn iter(&self) -> std::slice::Iter<'_, PathSegment> {
        self.0.iter()
    }

    /// Segment at `index`, if any.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&PathSegment> {
        self.0.get(index)
    }

    /// Final segment, if any.
    #[must_use]
    pub fn last(&self) -> Option<&PathSegment> {
        self.0.last()
    }

    /// Borrow the segments as a slice.
    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    /// Path extended by `segment`.
    #[must_use]
    pub fn join(&self, segment: impl Into<PathSegment>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    /// Path without its final segment; `None` for the root path.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        self.0
            .split_last()
            .map(|(_, init)| Self(init.to_vec()))
    }

    /// Longest shared leading subsequence of `self` and `other`.
    ///
    /// # Examples
    ///
    /// ```
    /// use climate_config::FragmentPath;
    ///
    /// let a = FragmentPath::from_spec("a.b.c");
    /// assert_eq!(a.common(&FragmentPath::from_spec("a.b.d")), FragmentPath::from_spec("a.b"));
    /// assert_eq!(a.common(&FragmentPath::from_spec("x.b.c")), FragmentPath::root());
    /// ```
    #[must_use]
    pub fn common<P>(&self, other: &P) -> Self
    where
        P: AsRef<[PathSegment]> + ?Sized,
    {
        Self(
            self.0
                .iter()
                .zip(other.as_ref())
                .take_while(|(left, right)| left == right)
                .map(|(left, _)| left.clone())
                .collect(),
        )
    }

    /// Check that no index exceeds [`MAX_SEQUENCE_INDEX`].
    ///
    /// # Errors
    ///
    /// Returns [`ClimateError::InvalidOption`] naming the offending path.
    ///
    /// # Examples
    ///
    /// ```
    /// use climate_config::FragmentPath;
    ///
    /// assert!(FragmentPath::from_spec("hosts.3").validate().is_ok());
    /// assert!(FragmentPath::from_spec("hosts.18446744073709551615").validate().is_err());
    /// ```
    pub fn validate(&self) -> ClimateResult<()> {
        let oversized = self.0.iter().find_map(|segment| match segment {
            PathSegment::Index(index) if *index > MAX_SEQUENCE_INDEX => Some(*index),
            PathSegment::Index(_) | PathSegment::Key(_) => None,
        });
        oversized.map_or(Ok(()), |index| {
            Err(ClimateError::invalid_option(
                "path",
                format!("index {index} in '{self}' exceeds the maximum of {MAX_SEQUENCE_INDEX}"),
            ))
        })
    }

    /// Build a skeleton tree that holds `value` at this path.
    ///
    /// A segment that is a key produces a map holding only that key; an index
    /// produces a sequence whose earlier positions are [`Value::EMPTY`]. The
    /// skeleton can therefore be merged over any tree without clobbering
    /// positions the path does not describe. Paths taken from untrusted input
    /// should pass [`FragmentPath::validate`] first.
    ///
    /// # Examples
    ///
    /// ```
    /// use climate_config::{FragmentPath, Value};
    /// use serde_json::json;
    ///
    /// let expanded = FragmentPath::from_spec("a.1.b").expand(Value::from("x"));
    /// assert_eq!(expanded.into_json(), json!({"a": [null, {"b": "x"}]}));
    /// ```
    #[must_use]
    pub fn expand(&self, value: Value) -> Value {
        self.0.iter().rev().fold(value, |inner, segment| match segment {
            PathSegment::Key(key) => Value::Object(Map::from([(key.clone(), inner)])),
            PathSegment::Index(index) => {
                let mut items = vec![Value::EMPTY; *index];
                items.push(inner);
                Value::Array(items)
            }
        })
    }
}

impl AsRef<[PathSegment]> for FragmentPath {
    fn as_ref(&self) -> &[PathSegment] {
        &self.0
    }
}

impl fmt::Display for FragmentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (position, segment) in self.0.iter().enumerate() {
            if position > 0 {
                f.write_str(".")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl From<&str> for FragmentPath {
    fn from(spec: &str) -> Self {
        Self::from_spec(spec)
    }
}

impl From<Vec<PathSegment>> for FragmentPath {
    fn from(segments: Vec<PathSegment>) -> Self {
        Self(segments)
    }
}

impl FromIterator<PathSegment> for FragmentPath {
    fn from_iter<I: IntoIterator<Item = PathSegment>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a FragmentPath {
    type Item = &'a PathSegment;
    type IntoIter = std::slice::Iter<'a, PathSegment>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn path(spec: &str) -> FragmentPath {
        FragmentPath::from_spec(spec)
    }

    #[rstest]
    fn structural_equality_is_order_sensitive() {
        assert_eq!(FragmentPath::root(), FragmentPath::new(Vec::<PathSegment>::new()));
        assert_eq!(path("a.stuff.1"), FragmentPath::new([
            PathSegment::from("a"),
            PathSegment::from("stuff"),
            PathSegment::from(1_usize),
        ]));
        assert_ne!(path("a.stuff.1"), path("a.wrong.1"));
        assert_ne!(path("a.b"), path("b.a"));
    }

    #[rstest]
    #[case("a", "b", "")]
    #[case("", "", "")]
    #[case("1.2.3", "1.2.4.5", "1.2")]
    #[case("a.b.c", "a.b", "a.b")]
    #[case("a.b.c", "a.b.d", "a.b")]
    #[case("a.b.c", "wrong.b.c", "")]
    fn common_prefix(#[case] left: &str, #[case] right: &str, #[case] expected: &str) {
        assert_eq!(path(left).common(&path(right)), path(expected));
    }

    #[rstest]
    fn common_accepts_plain_slices() {
        let other = [PathSegment::from("a"), PathSegment::from(0_usize)];
        assert_eq!(path("a.0.b").common(&other[..]), path("a.0"));
    }

    #[rstest]
    fn expand_fills_unnamed_positions_with_empty() {
        let expanded = path("a.stuff.1.bla").expand(Value::EMPTY);
        let expected = Value::Object(Map::from([(
            "a".to_owned(),
            Value::Object(Map::from([(
                "stuff".to_owned(),
                Value::Array(vec![
                    Value::EMPTY,
                    Value::Object(Map::from([("bla".to_owned(), Value::EMPTY)])),
                ]),
            )])),
        )]));
        assert_eq!(expanded, expected);
    }

    #[rstest]
    fn expand_starts_with_list_for_leading_index() {
        let expanded = path("2").expand(Value::from("x"));
        assert_eq!(
            expanded,
            Value::Array(vec![Value::EMPTY, Value::EMPTY, Value::from("x")])
        );
    }

    #[rstest]
    #[case("list.65535", true)]
    #[case("list.65536", false)]
    #[case("a.18446744073709551615", false)]
    #[case("a.99999999999999999999999", false)]
    #[case("plain.keys", true)]
    fn validate_bounds_indices(#[case] spec: &str, #[case] valid: bool) {
        assert_eq!(path(spec).validate().is_ok(), valid);
    }

    #[rstest]
    fn oversized_indices_stay_indices() {
        assert_eq!(
            path("a.99999999999999999999999").last(),
            Some(&PathSegment::Index(usize::MAX))
        );
    }

    #[rstest]
    fn expand_root_returns_value() {
        assert_eq!(FragmentPath::root().expand(Value::from(3)), Value::from(3));
    }

    #[rstest]
    #[case("a", json!("v"))]
    #[case("a.b.0.c", json!({"deep": [1, 2]}))]
    #[case("3.x", json!(null))]
    #[case("", json!({"whole": true}))]
    fn expand_then_get_returns_value(#[case] spec: &str, #[case] raw: serde_json::Value) {
        let value = Value::from(raw);
        let expanded = path(spec).expand(value.clone());
        assert_eq!(expanded.get_nested(&path(spec)), Some(&value));
    }

    #[rstest]
    fn digit_components_become_indices() {
        assert_eq!(path("a.10.b").get(1), Some(&PathSegment::Index(10)));
        assert_eq!(path("a.1x").get(1), Some(&PathSegment::from("1x")));
    }

    #[rstest]
    fn parent_and_join_derive_new_paths() {
        let base = path("a.b");
        assert_eq!(base.join(0_usize), path("a.b.0"));
        assert_eq!(base.parent(), Some(path("a")));
        assert_eq!(FragmentPath::root().parent(), None);
        assert_eq!(base, path("a.b"));
    }
}
