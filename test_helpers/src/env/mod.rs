//! Guards for mutating process environment variables in tests.
//!
//! Every mutation takes a global re-entrant mutex for the duration of the
//! write and returns an [`EnvGuard`] that puts the previous value back when
//! dropped, removing the variable if it was absent. Guards for the same key
//! restore in LIFO order.
//!
//! A settings loader reads the whole environment at once, so tests usually
//! want the lock held for their entire body. [`scope_with`] does that and
//! keeps the guards alive until the returned [`EnvScope`] is dropped.
//!
//! # Examples
//!
//! ```
//! use climate_config_test_helpers::env;
//!
//! let _scope = env::scope_with(|lock| {
//!     let mut guards = lock.clear_prefix("HELPERS_DOC_");
//!     guards.push(lock.set_var("HELPERS_DOC_PORT", "8080"));
//!     guards
//! });
//! assert_eq!(std::env::var("HELPERS_DOC_PORT").ok().as_deref(), Some("8080"));
//! ```

use std::env;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::sync::LazyLock;

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};

static ENV_MUTEX: LazyLock<ReentrantMutex<()>> = LazyLock::new(ReentrantMutex::default);

/// Set `key` to `value`.
///
/// # Safety
///
/// Callers must hold `ENV_MUTEX`.
unsafe fn env_set_var(key: &str, value: &OsStr) {
    unsafe { env::set_var(key, value) };
}

/// Remove `key`.
///
/// # Safety
///
/// Callers must hold `ENV_MUTEX`.
unsafe fn env_remove_var(key: &str) {
    unsafe { env::remove_var(key) };
}

fn record_and_mutate<F>(key: String, mutate: F, _held: &ReentrantMutexGuard<'static, ()>) -> EnvGuard
where
    F: FnOnce(&str),
{
    let original = env::var_os(&key);
    mutate(&key);
    EnvGuard { key, original }
}

/// Restores one environment variable to its prior state on drop.
#[must_use = "dropping restores the prior value"]
pub struct EnvGuard {
    key: String,
    original: Option<OsString>,
}

impl EnvGuard {
    /// Name of the guarded variable.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl fmt::Debug for EnvGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvGuard")
            .field("key", &self.key)
            .field("had_original", &self.original.is_some())
            .finish_non_exhaustive()
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        let _held = ENV_MUTEX.lock();
        match self.original.take() {
            // SAFETY: `ENV_MUTEX` is held.
            Some(value) => unsafe { env_set_var(&self.key, &value) },
            // SAFETY: `ENV_MUTEX` is held.
            None => unsafe { env_remove_var(&self.key) },
        }
    }
}

/// Holds the global environment lock.
///
/// Mutations made through the lock do not re-acquire it.
#[must_use = "dropping releases the environment lock"]
pub struct EnvLock {
    held: ReentrantMutexGuard<'static, ()>,
}

impl EnvLock {
    /// Set `key` to `value` under this lock.
    pub fn set_var<K, V>(&self, key: K, value: V) -> EnvGuard
    where
        K: Into<String>,
        V: AsRef<OsStr>,
    {
        record_and_mutate(
            key.into(),
            // SAFETY: `self.held` is the global lock.
            |name| unsafe { env_set_var(name, value.as_ref()) },
            &self.held,
        )
    }

    /// Remove `key` under this lock.
    pub fn remove_var<K>(&self, key: K) -> EnvGuard
    where
        K: Into<String>,
    {
        // SAFETY: `self.held` is the global lock.
        record_and_mutate(key.into(), |name| unsafe { env_remove_var(name) }, &self.held)
    }

    /// Remove every variable whose name starts with `prefix`, ignoring
    /// ASCII case.
    #[must_use = "dropping restores the cleared variables"]
    pub fn clear_prefix(&self, prefix: &str) -> Vec<EnvGuard> {
        let matching: Vec<String> = env::vars_os()
            .filter_map(|(name, _)| name.into_string().ok())
            .filter(|name| {
                name.get(..prefix.len())
                    .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
            })
            .collect();
        matching
            .into_iter()
            .map(|name| self.remove_var(name))
            .collect()
    }
}

/// Keeps the environment lock and a set of guards alive together.
///
/// Guards are restored before the lock is released.
#[must_use = "dropping restores the guards and releases the lock"]
pub struct EnvScope {
    guards: Vec<EnvGuard>,
    _lock: EnvLock,
}

impl EnvScope {
    /// Names of the variables guarded by this scope.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.guards.iter().map(EnvGuard::key)
    }
}

impl Drop for EnvScope {
    fn drop(&mut self) {
        // Newest first; repeated keys unwind to the oldest value.
        while let Some(guard) = self.guards.pop() {
            drop(guard);
        }
    }
}

/// Set `key` to `value`, returning a guard that restores it.
///
/// # Examples
///
/// ```
/// use climate_config_test_helpers::env;
///
/// let guard = env::set_var("HELPERS_DOC_SET", "on");
/// assert_eq!(std::env::var("HELPERS_DOC_SET").ok().as_deref(), Some("on"));
/// drop(guard);
/// ```
pub fn set_var<K, V>(key: K, value: V) -> EnvGuard
where
    K: Into<String>,
    V: AsRef<OsStr>,
{
    lock().set_var(key, value)
}

/// Remove `key`, returning a guard that restores it.
pub fn remove_var<K>(key: K) -> EnvGuard
where
    K: Into<String>,
{
    lock().remove_var(key)
}

/// Acquire the global environment lock.
pub fn lock() -> EnvLock {
    EnvLock {
        held: ENV_MUTEX.lock(),
    }
}

/// Run `builder` under the global lock and keep both the lock and the guards
/// it returns until the scope is dropped.
///
/// `builder` should mutate through the provided [`EnvLock`].
pub fn scope_with<F>(builder: F) -> EnvScope
where
    F: FnOnce(&EnvLock) -> Vec<EnvGuard>,
{
    let held = lock();
    let guards = builder(&held);
    EnvScope {
        guards,
        _lock: held,
    }
}
