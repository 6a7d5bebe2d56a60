//! Default values shared by the configuration types.

/// Default per-plugin execution timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Default number of retries for transient plugin failures.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Delay before the first retry, in milliseconds.
pub const DEFAULT_INITIAL_BACKOFF_MS: u64 = 250;

/// Factor applied to the backoff delay after each retry.
pub const DEFAULT_BACKOFF_MULTIPLIER: u32 = 2;

/// Upper bound on any single backoff delay, in milliseconds.
pub const DEFAULT_MAX_BACKOFF_MS: u64 = 5_000;

/// Memory ceiling enforced while a plugin runs (512 MiB).
pub const DEFAULT_MEMORY_CEILING_BYTES: u64 = 512 * 1024 * 1024;

/// Interval between resource samples in milliseconds.
pub const DEFAULT_SAMPLE_INTERVAL_MS: u64 = 500;

/// Longest cache key a plugin may use.
pub const DEFAULT_MAX_CACHE_KEY_LEN: usize = 250;

/// Largest cache value a plugin may store (1 MiB).
pub const DEFAULT_MAX_CACHE_VALUE_BYTES: usize = 1024 * 1024;

/// Default log filter expression.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format.
#[must_use]
pub const fn default_log_format() -> crate::logging::LogFormat {
    crate::logging::LogFormat::Json
}

pub(crate) const fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

pub(crate) const fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

pub(crate) const fn default_initial_backoff_ms() -> u64 {
    DEFAULT_INITIAL_BACKOFF_MS
}

pub(crate) const fn default_backoff_multiplier() -> u32 {
    DEFAULT_BACKOFF_MULTIPLIER
}

pub(crate) const fn default_max_backoff_ms() -> u64 {
    DEFAULT_MAX_BACKOFF_MS
}

pub(crate) const fn default_memory_ceiling_bytes() -> u64 {
    DEFAULT_MEMORY_CEILING_BYTES
}

pub(crate) const fn default_sample_interval_ms() -> u64 {
    DEFAULT_SAMPLE_INTERVAL_MS
}

pub(crate) const fn default_max_cache_key_len() -> usize {
    DEFAULT_MAX_CACHE_KEY_LEN
}

pub(crate) const fn default_max_cache_value_bytes() -> usize {
    DEFAULT_MAX_CACHE_VALUE_BYTES
}
