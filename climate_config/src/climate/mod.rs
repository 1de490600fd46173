//! The settings orchestrator.
//!
//! [`Climate`] gathers fragments from settings files, environment variables
//! and in-code updates, runs them through the substitution pipeline, folds
//! them into one combined fragment and hands the pruned tree to a parser.
//! Nothing is committed unless every step succeeds.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{Level, debug, enabled};

use crate::env::EnvParser;
use crate::fragment::Fragment;
use crate::loader::FormatRegistry;
use crate::path::FragmentPath;
use crate::substitute::SubstitutionPipeline;
use crate::value::{Map, Value};
use crate::{ClimateError, ClimateResult};

mod builder;
mod view;

pub use builder::ClimateBuilder;
pub use view::SettingsItem;

/// Source label given to fragments created by [`Climate::update`].
const UPDATE_SOURCE: &str = "external";

/// Converts the merged settings tree into the caller's settings type.
pub type SettingsParser<T> = Box<dyn Fn(serde_json::Value) -> ClimateResult<T> + Send + Sync>;

#[derive(Clone)]
struct State<T> {
    updates: Vec<Value>,
    fragments: Vec<Fragment>,
    combined: Fragment,
    data: Option<T>,
}

impl<T> Default for State<T> {
    fn default() -> Self {
        Self {
            updates: Vec::new(),
            fragments: Vec::new(),
            combined: Fragment::new(Value::Object(Map::new())),
            data: None,
        }
    }
}

/// Output of a full reload, not yet committed.
struct Loaded<T> {
    fragments: Vec<Fragment>,
    combined: Fragment,
    data: T,
}

/// Aggregates settings from files, the environment and in-code updates.
///
/// Sources are folded in a fixed order: each entry of
/// [`Climate::settings_files`], then the environment, then every update in
/// call order. Settings are loaded lazily on first access.
///
/// # Examples
///
/// ```
/// use climate_config::Climate;
/// use serde_json::json;
///
/// # fn main() -> climate_config::ClimateResult<()> {
/// let mut climate = Climate::builder().prefix("CLIMATE_DOC_MAIN").build()?;
/// climate.update(json!({"a": 1}))?;
/// climate.temporary_changes(|scoped| scoped.update(json!({"a": 2})))?;
/// assert_eq!(climate.settings()?, &json!({"a": 1}));
/// # Ok(())
/// # }
/// ```
pub struct Climate<T = serde_json::Value> {
    settings_files: Vec<String>,
    env_parser: EnvParser,
    formats: FormatRegistry,
    pipeline: SubstitutionPipeline,
    parser: SettingsParser<T>,
    state: State<T>,
}

impl Climate {
    /// Orchestrator with default options producing raw JSON settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start configuring an orchestrator.
    #[must_use]
    pub fn builder() -> ClimateBuilder {
        ClimateBuilder::new()
    }

    /// Read-only view of the settings tree, loading it first if needed.
    ///
    /// # Errors
    ///
    /// Returns any error from [`Climate::reload`].
    pub fn item(&mut self) -> ClimateResult<SettingsItem<'_>> {
        self.settings().map(SettingsItem::root)
    }
}

impl Default for Climate {
    fn default() -> Self {
        let formats = FormatRegistry::builtin();
        Self {
            settings_files: Vec::new(),
            env_parser: EnvParser::new(),
            pipeline: SubstitutionPipeline::new(&formats),
            formats,
            parser: Box::new(Ok::<serde_json::Value, Arc<ClimateError>>),
            state: State::default(),
        }
    }
}

impl<T> Climate<T> {
    pub(crate) fn from_parts(
        settings_files: Vec<String>,
        env_parser: EnvParser,
        formats: FormatRegistry,
        pipeline: SubstitutionPipeline,
        parser: SettingsParser<T>,
    ) -> Self {
        Self {
            settings_files,
            env_parser,
            formats,
            pipeline,
            parser,
            state: State::default(),
        }
    }

    /// The parsed settings, loading them first if needed.
    ///
    /// # Errors
    ///
    /// Returns any error from [`Climate::reload`].
    pub fn settings(&mut self) -> ClimateResult<&T> {
        if let Some(data) = self.state.data.take() {
            return Ok(self.state.data.insert(data));
        }
        let updates = self.state.updates.clone();
        let loaded = self.stateless_reload(&updates)?;
        Ok(self.commit(updates, loaded))
    }

    /// Returns `true` once settings have been loaded and not cleared since.
    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.state.data.is_some()
    }

    /// Load settings unless they are already loaded.
    ///
    /// # Errors
    ///
    /// Returns any error from [`Climate::reload`].
    pub fn ensure_initialized(&mut self) -> ClimateResult<()> {
        self.settings().map(|_| ())
    }

    /// Recompute the settings from every source.
    ///
    /// Files and the environment are read again; recorded updates are
    /// replayed. On failure the previously committed state is kept.
    ///
    /// # Errors
    ///
    /// Returns load and substitution errors, or the parser's error.
    pub fn reload(&mut self) -> ClimateResult<()> {
        let updates = self.state.updates.clone();
        let loaded = self.stateless_reload(&updates)?;
        self.commit(updates, loaded);
        Ok(())
    }

    /// Merge `patch` over the current settings.
    ///
    /// Before the first load this performs a full reload including `patch`.
    /// Afterwards only `patch` is processed and merged over the combined
    /// fragment; files and the environment are not read again. A blank
    /// patch (`null`, `{}`, `[]` or `""`) is not recorded.
    ///
    /// The update is transactional: if processing or parsing fails the
    /// error is returned and neither the settings nor the recorded updates
    /// change.
    ///
    /// # Errors
    ///
    /// Returns load and substitution errors, or the parser's error.
    pub fn update(&mut self, patch: impl Into<Value>) -> ClimateResult<()> {
        self.apply_update(patch.into())
    }

    /// Merge `patch` at `path` over the current settings.
    ///
    /// Equivalent to [`Climate::update`] with `patch` nested under `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ClimateError::InvalidOption`] when `path` holds an index
    /// above [`MAX_SEQUENCE_INDEX`](crate::MAX_SEQUENCE_INDEX); otherwise see
    /// [`Climate::update`].
    pub fn update_at(
        &mut self,
        patch: impl Into<Value>,
        path: impl Into<FragmentPath>,
    ) -> ClimateResult<()> {
        let target: FragmentPath = path.into();
        target.validate()?;
        self.apply_update(target.expand(patch.into()))
    }

    fn apply_update(&mut self, patch: Value) -> ClimateResult<()> {
        if !self.is_initialized() {
            let mut updates = self.state.updates.clone();
            if !patch.is_blank() {
                updates.push(patch);
            }
            let loaded = self.stateless_reload(&updates)?;
            self.commit(updates, loaded);
            return Ok(());
        }
        if patch.is_blank() {
            return Ok(());
        }
        let added = self.update_fragments(std::slice::from_ref(&patch))?;
        let combined = added
            .iter()
            .fold(self.state.combined.clone(), |acc, fragment| acc.merge(fragment));
        let data = self.finish(&combined)?;

        self.state.fragments.extend(added);
        self.state.updates.push(patch);
        self.state.combined = combined;
        self.state.data = Some(data);
        self.log_commit();
        Ok(())
    }

    /// Forget every update and loaded fragment. The next access reloads.
    pub fn clear(&mut self) {
        self.state = State::default();
    }

    /// Run `block` and then restore the settings, the settings files and the
    /// environment parser to their state before the call.
    ///
    /// Restoration also happens when `block` panics; the panic then
    /// continues.
    pub fn temporary_changes<R, F>(&mut self, block: F) -> R
    where
        F: FnOnce(&mut Self) -> R,
        T: Clone,
    {
        let settings_files = self.settings_files.clone();
        let env_parser = self.env_parser.clone();
        let state = self.state.clone();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| block(self)));
        self.settings_files = settings_files;
        self.env_parser = env_parser;
        self.state = state;
        outcome.unwrap_or_else(|payload| panic::resume_unwind(payload))
    }

    /// One line per leaf of every recorded fragment, in merge order:
    /// `"<loaded|removed> <path> from <source>"`.
    #[must_use]
    pub fn update_log(&self) -> String {
        self.state
            .fragments
            .iter()
            .flat_map(Fragment::iter_leaves)
            .map(|leaf| {
                let action = if leaf.value().is_removed() {
                    "removed"
                } else {
                    "loaded"
                };
                format!("{action} {} from {}", leaf.path(), leaf.source())
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Every fragment merged into the current settings, in merge order.
    #[must_use]
    pub fn fragments(&self) -> &[Fragment] {
        &self.state.fragments
    }

    /// Result of folding [`Climate::fragments`].
    #[must_use]
    pub const fn combined_fragment(&self) -> &Fragment {
        &self.state.combined
    }

    /// Patches recorded by [`Climate::update`], in call order.
    #[must_use]
    pub fn updates(&self) -> &[Value] {
        &self.state.updates
    }

    /// Paths, globs or inline content loaded before the environment.
    #[must_use]
    pub fn settings_files(&self) -> &[String] {
        &self.settings_files
    }

    /// Replace the settings files. Takes effect on the next reload.
    pub fn set_settings_files<I, S>(&mut self, files: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.settings_files = files.into_iter().map(Into::into).collect();
    }

    /// Parser for environment variables.
    #[must_use]
    pub const fn env_parser(&self) -> &EnvParser {
        &self.env_parser
    }

    /// Replace the environment parser. Takes effect on the next reload.
    pub fn set_env_parser(&mut self, env_parser: EnvParser) {
        self.env_parser = env_parser;
    }

    fn stateless_reload(&self, updates: &[Value]) -> ClimateResult<Loaded<T>> {
        let mut sources = Vec::new();
        for entry in &self.settings_files {
            sources.extend(self.formats.iter_load(entry)?);
        }
        sources.extend(self.env_parser.iter_load(&self.formats)?);
        let mut fragments = self.pipeline.process_all(sources)?;
        fragments.extend(self.update_fragments(updates)?);
        debug!(fragments = fragments.len(), "reloaded settings sources");

        let combined = combine_fragments(&fragments);
        let data = self.finish(&combined)?;
        Ok(Loaded {
            fragments,
            combined,
            data,
        })
    }

    fn update_fragments(&self, updates: &[Value]) -> ClimateResult<Vec<Fragment>> {
        self.pipeline.process_all(
            updates
                .iter()
                .filter(|patch| !patch.is_blank())
                .map(|patch| Fragment::new(patch.clone()).with_source(UPDATE_SOURCE)),
        )
    }

    fn finish(&self, combined: &Fragment) -> ClimateResult<T> {
        let mut tree = combined.expand_value_with_path();
        tree.prune_removed();
        (self.parser)(tree.into_json())
    }

    fn commit(&mut self, updates: Vec<Value>, loaded: Loaded<T>) -> &T {
        self.state.updates = updates;
        self.state.fragments = loaded.fragments;
        self.state.combined = loaded.combined;
        self.log_commit();
        self.state.data.insert(loaded.data)
    }

    fn log_commit(&self) {
        if enabled!(Level::DEBUG) {
            debug!(
                fragments = self.state.fragments.len(),
                updates = self.state.updates.len(),
                "committed settings\n{}",
                self.update_log()
            );
        }
    }
}

/// Left fold of `fragments` with [`Fragment::merge`]; an empty object when
/// there are none.
fn combine_fragments(fragments: &[Fragment]) -> Fragment {
    let mut rest = fragments.iter();
    let Some(first) = rest.next() else {
        return Fragment::new(Value::Object(Map::new()));
    };
    rest.fold(first.clone(), |acc, fragment| acc.merge(fragment))
}

impl<T> fmt::Debug for Climate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Climate")
            .field("initialized", &self.is_initialized())
            .field("settings_files", &self.settings_files)
            .field("env_prefix", &self.env_parser.prefix())
            .field("updates", &self.state.updates.len())
            .field("fragments", &self.state.fragments.len())
            .finish_non_exhaustive()
    }
}
