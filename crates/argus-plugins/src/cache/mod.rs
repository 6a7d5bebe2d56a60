//! Key/value cache handle shared with plugins.
//!
//! The [`Cache`] trait is the collaborator plugins see through the
//! [`ExecutionContext`](crate::ExecutionContext). Implementations must
//! tolerate concurrent access from sibling plugins running in the same
//! parallel group. [`MemoryCache`] is the in-process implementation.

use std::collections::HashMap;

use camino::Utf8Path;
use parking_lot::RwLock;
use sha2::{Digest, Sha256};

use crate::error::CacheError;

/// Concurrent key/value store keyed by string.
pub trait Cache: Send + Sync {
    /// Returns the value stored under `key`.
    fn get(&self, key: &str) -> Option<Vec<u8>>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns a [`CacheError`] when the implementation rejects the entry.
    fn set(&self, key: &str, value: Vec<u8>) -> Result<(), CacheError>;

    /// Removes `key`, returning whether it was present.
    fn delete(&self, key: &str) -> bool;

    /// Returns whether `key` is present.
    fn has(&self, key: &str) -> bool;

    /// Removes every entry.
    fn clear(&self);
}

/// In-memory cache guarded by a read/write lock.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns `true` when the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl Cache for MemoryCache {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.entries.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: Vec<u8>) -> Result<(), CacheError> {
        if key.is_empty() {
            return Err(CacheError::EmptyKey);
        }
        self.entries.write().insert(key.to_owned(), value);
        Ok(())
    }

    fn delete(&self, key: &str) -> bool {
        self.entries.write().remove(key).is_some()
    }

    fn has(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    fn clear(&self) {
        self.entries.write().clear();
    }
}

/// Computes a content fingerprint over a set of files.
///
/// The digest covers each path and its content in the order given, so
/// callers that want order-independent keys should sort first. Returns a
/// lowercase hex SHA-256 string suitable as a cache key.
///
/// # Example
///
/// ```
/// use camino::Utf8Path;
/// use argus_plugins::cache::fingerprint;
///
/// let a = fingerprint([(Utf8Path::new("src/lib.rs"), b"fn main() {}".as_slice())]);
/// let b = fingerprint([(Utf8Path::new("src/lib.rs"), b"fn main() {}".as_slice())]);
/// assert_eq!(a, b);
/// assert_eq!(a.len(), 64);
/// ```
#[must_use]
pub fn fingerprint<'a, I>(files: I) -> String
where
    I: IntoIterator<Item = (&'a Utf8Path, &'a [u8])>,
{
    let mut hasher = Sha256::new();
    for (path, content) in files {
        hasher.update(path.as_str().as_bytes());
        hasher.update([0_u8]);
        hasher.update(content.len().to_string().as_bytes());
        hasher.update([0_u8]);
        hasher.update(content);
    }
    hasher
        .finalize()
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}
