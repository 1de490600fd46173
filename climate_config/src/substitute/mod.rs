//! Rewriting of trigger-suffixed keys before fragments are merged.
//!
//! A key such as `password_from_file` marks a value that should be looked up
//! elsewhere. For each trigger the pipeline emits a tombstone removing the
//! trigger key and one fragment per looked-up value placed at the key with
//! the suffix stripped. Derived fragments are scanned again, so a file pulled
//! in by `_from_file` may itself contain `_from_env` keys.

use std::fmt;
use std::sync::Arc;

use tracing::trace;

use crate::fragment::Fragment;
use crate::loader::FormatRegistry;
use crate::path::{FragmentPath, PathSegment};
use crate::value::Value;
use crate::{ClimateError, ClimateResult};

mod rules;

pub use rules::{ContentRule, EnvRule, FileRule};

/// Maximum number of nested derivations from a single source fragment.
///
/// Self-referencing inputs, such as a file whose `_from_file` key points at
/// itself, fail with [`ClimateError::SubstitutionDepth`] once this is hit.
pub const MAX_SUBSTITUTION_DEPTH: usize = 64;

/// A value produced by a [`SubstitutionRule`].
#[derive(Clone, Debug, PartialEq)]
pub enum Replacement {
    /// Plain value; inherits the trigger's source label.
    Value(Value),
    /// Value with its own source label, appended to the trigger's label as
    /// `<trigger source>:<own source>`.
    Fragment(Fragment),
}

/// A lookup keyed by a key suffix.
pub trait SubstitutionRule: fmt::Debug + Send + Sync {
    /// Key suffix that triggers this rule, e.g. `"_from_env"`.
    fn suffix(&self) -> &str;

    /// Returns `true` when `value` can be handled by [`Self::transform`].
    ///
    /// Values that are not accepted are walked like any other value.
    fn accepts(&self, value: &Value) -> bool {
        matches!(value, Value::String(_))
    }

    /// Look up the replacements for a trigger `value` found at `path`.
    ///
    /// An empty result is an expected failure, such as a missing variable;
    /// implementations log it and the trigger key is simply removed.
    ///
    /// # Errors
    ///
    /// Returns an error for failures that should abort loading, such as a
    /// malformed file.
    fn transform(&self, value: &Value, path: &FragmentPath) -> ClimateResult<Vec<Replacement>>;
}

/// Ordered set of [`SubstitutionRule`]s applied to every fragment.
#[derive(Clone, Debug)]
pub struct SubstitutionPipeline {
    rules: Vec<Arc<dyn SubstitutionRule>>,
}

impl Default for SubstitutionPipeline {
    fn default() -> Self {
        Self::new(&FormatRegistry::builtin())
    }
}

impl SubstitutionPipeline {
    /// Pipeline with the `_from_file`, `_from_env` and
    /// `_from_<ext>_content` rules, in that order. Files and content are
    /// parsed with `formats`.
    #[must_use]
    pub fn new(formats: &FormatRegistry) -> Self {
        let mut rules: Vec<Arc<dyn SubstitutionRule>> = vec![
            Arc::new(FileRule::new(formats.clone())),
            Arc::new(EnvRule),
        ];
        rules.extend(
            formats
                .content_triggers()
                .into_iter()
                .map(|(ext, loader)| Arc::new(ContentRule::new(ext, loader)) as Arc<dyn SubstitutionRule>),
        );
        Self { rules }
    }

    /// Pipeline without rules; fragments pass through unchanged.
    #[must_use]
    pub const fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Append `rule` after the existing rules.
    #[must_use]
    pub fn with_rule(mut self, rule: impl SubstitutionRule + 'static) -> Self {
        self.rules.push(Arc::new(rule));
        self
    }

    /// Suffixes of the configured rules in application order.
    pub fn suffixes(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|rule| rule.suffix())
    }

    /// Fragments derived from `fragment` by a single pass of every rule.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by a rule.
    pub fn derive(&self, fragment: &Fragment) -> ClimateResult<Vec<Fragment>> {
        let mut derived = Vec::new();
        for rule in &self.rules {
            derived.extend(apply_rule(rule.as_ref(), fragment)?);
        }
        Ok(derived)
    }

    /// `fragment` followed by everything derived from it, depth first.
    ///
    /// Each fragment is immediately followed by its own derivations, so a
    /// later fragment always overrides what an earlier one contributed.
    ///
    /// # Errors
    ///
    /// Returns [`ClimateError::SubstitutionDepth`] when derivations nest
    /// deeper than [`MAX_SUBSTITUTION_DEPTH`], or any rule error.
    pub fn process(&self, fragment: Fragment) -> ClimateResult<Vec<Fragment>> {
        let mut processed = Vec::new();
        let mut pending = vec![(fragment, 0_usize)];
        while let Some((current, depth)) = pending.pop() {
            let derived = self.derive(&current)?;
            if !derived.is_empty() && depth >= MAX_SUBSTITUTION_DEPTH {
                return Err(Arc::new(ClimateError::SubstitutionDepth {
                    path: current.path().to_string(),
                    limit: MAX_SUBSTITUTION_DEPTH,
                }));
            }
            processed.push(current);
            pending.extend(derived.into_iter().rev().map(|next| (next, depth + 1)));
        }
        Ok(processed)
    }

    /// [`Self::process`] applied to each fragment in turn.
    ///
    /// # Errors
    ///
    /// Returns the first error from [`Self::process`].
    pub fn process_all<I>(&self, fragments: I) -> ClimateResult<Vec<Fragment>>
    where
        I: IntoIterator<Item = Fragment>,
    {
        let mut processed = Vec::new();
        for fragment in fragments {
            processed.extend(self.process(fragment)?);
        }
        Ok(processed)
    }
}

/// Tombstones and replacements for every trigger of `rule` in `fragment`.
fn apply_rule(rule: &dyn SubstitutionRule, fragment: &Fragment) -> ClimateResult<Vec<Fragment>> {
    let mut derived = Vec::new();
    for trigger in find_triggers(rule, fragment) {
        let Some(target) = target_path(rule.suffix(), trigger.path()) else {
            continue;
        };
        trace!(
            path = %trigger.path(),
            suffix = rule.suffix(),
            "substituting trigger key"
        );
        derived.push(trigger.clone().with_value(Value::REMOVED));
        for replacement in rule.transform(trigger.value(), trigger.path())? {
            let replaced = match replacement {
                Replacement::Value(value) => trigger.clone().with_value(value),
                Replacement::Fragment(found) => {
                    let source = if found.source().is_empty() {
                        trigger.source().to_owned()
                    } else {
                        format!("{}:{}", trigger.source(), found.source())
                    };
                    trigger.clone().with_value(found.into_value()).with_source(source)
                }
            };
            derived.push(replaced.with_path(target.clone()));
        }
    }
    Ok(derived)
}

/// Path of the trigger key with the suffix stripped; the parent path when
/// the key is the bare suffix.
fn target_path(suffix: &str, trigger: &FragmentPath) -> Option<FragmentPath> {
    let stripped = trigger.last()?.as_key()?.strip_suffix(suffix)?;
    let parent = trigger.parent()?;
    Some(if stripped.is_empty() {
        parent
    } else {
        parent.join(stripped)
    })
}

/// Leaves whose key ends in the rule's suffix and whose value the rule
/// accepts, starting with the fragment itself. Triggers are not descended
/// into; `Removed` never triggers.
fn find_triggers(rule: &dyn SubstitutionRule, fragment: &Fragment) -> Vec<Fragment> {
    if is_trigger(rule, fragment.path(), fragment.value()) {
        return vec![fragment.clone()];
    }
    let mut found = Vec::new();
    collect_triggers(rule, fragment, fragment.value(), fragment.path(), &mut found);
    found
}

fn is_trigger(rule: &dyn SubstitutionRule, path: &FragmentPath, value: &Value) -> bool {
    path.last()
        .and_then(PathSegment::as_key)
        .is_some_and(|key| key.ends_with(rule.suffix()))
        && !value.is_removed()
        && rule.accepts(value)
}

fn collect_triggers(
    rule: &dyn SubstitutionRule,
    origin: &Fragment,
    value: &Value,
    path: &FragmentPath,
    found: &mut Vec<Fragment>,
) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let child_path = path.join(PathSegment::Key(key.clone()));
                if is_trigger(rule, &child_path, child) {
                    found.push(
                        Fragment::new(child.clone())
                            .with_source(origin.source())
                            .with_path(child_path),
                    );
                } else {
                    collect_triggers(rule, origin, child, &child_path, found);
                }
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                collect_triggers(rule, origin, child, &path.join(index), found);
            }
        }
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) | Value::Sentinel(_) => {}
    }
}
