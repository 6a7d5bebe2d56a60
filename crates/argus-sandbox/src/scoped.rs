//! Wrappers placed around shared collaborators before a plugin sees them.
//!
//! A plugin receives a [`ScopedLogger`] that prefixes its messages with the
//! plugin name and a [`GuardedCache`] that confines its keys to a per-plugin
//! namespace and enforces size ceilings.

use std::sync::Arc;

use argus_config::SandboxLimits;
use argus_plugins::{Cache, CacheError, LogLevel, Logger};
use tracing::warn;

const SCOPED_TARGET: &str = "argus_sandbox::scoped";

/// Logger that tags every message with the plugin that produced it.
pub struct ScopedLogger {
    plugin: String,
    inner: Arc<dyn Logger>,
}

impl ScopedLogger {
    /// Wraps `inner` for the named plugin.
    #[must_use]
    pub fn new(plugin: impl Into<String>, inner: Arc<dyn Logger>) -> Self {
        Self {
            plugin: plugin.into(),
            inner,
        }
    }
}

impl Logger for ScopedLogger {
    fn log(&self, level: LogLevel, message: &str) {
        self.inner.log(level, &format!("[{}] {message}", self.plugin));
    }
}

/// Cache view confined to one plugin.
///
/// Keys are stored as `<plugin>:<key>`. Writes with an empty key, a key longer
/// than the configured ceiling, or a value larger than the configured ceiling
/// are refused. `clear` is ignored because it would wipe entries belonging to
/// sibling plugins.
pub struct GuardedCache {
    plugin: String,
    inner: Arc<dyn Cache>,
    max_key_len: usize,
    max_value_bytes: usize,
}

impl GuardedCache {
    /// Wraps `inner` for the named plugin using the ceilings in `limits`.
    #[must_use]
    pub fn new(plugin: impl Into<String>, inner: Arc<dyn Cache>, limits: &SandboxLimits) -> Self {
        Self {
            plugin: plugin.into(),
            inner,
            max_key_len: limits.max_cache_key_len(),
            max_value_bytes: limits.max_cache_value_bytes(),
        }
    }

    fn scoped_key(&self, key: &str) -> Option<String> {
        let len = key.chars().count();
        (len > 0 && len <= self.max_key_len).then(|| format!("{}:{key}", self.plugin))
    }
}

impl Cache for GuardedCache {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.scoped_key(key).and_then(|scoped| self.inner.get(&scoped))
    }

    fn set(&self, key: &str, value: Vec<u8>) -> Result<(), CacheError> {
        let len = key.chars().count();
        if len == 0 {
            return Err(CacheError::EmptyKey);
        }
        if len > self.max_key_len {
            return Err(CacheError::KeyTooLong {
                len,
                max: self.max_key_len,
            });
        }
        if value.len() > self.max_value_bytes {
            return Err(CacheError::ValueTooLarge {
                size: value.len(),
                max: self.max_value_bytes,
            });
        }
        self.inner.set(&format!("{}:{key}", self.plugin), value)
    }

    fn delete(&self, key: &str) -> bool {
        self.scoped_key(key)
            .is_some_and(|scoped| self.inner.delete(&scoped))
    }

    fn has(&self, key: &str) -> bool {
        self.scoped_key(key)
            .is_some_and(|scoped| self.inner.has(&scoped))
    }

    fn clear(&self) {
        warn!(
            target: SCOPED_TARGET,
            plugin = %self.plugin,
            "ignoring cache clear requested by plugin"
        );
    }
}
