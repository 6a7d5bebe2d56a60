//! Plugin descriptor types describing identity, dependencies, and
//! capabilities.
//!
//! A [`PluginDescriptor`] is the immutable record the registry stores for
//! each plugin. It is validated on registration to reject obviously invalid
//! declarations early.

use std::collections::HashSet;

use camino::Utf8Path;
use serde::{Deserialize, Serialize};

use crate::error::RegistrationError;

/// Optional behaviours a plugin may advertise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Capabilities {
    #[serde(default)]
    incremental: bool,
    #[serde(default)]
    cache: bool,
}

impl Capabilities {
    /// No optional behaviours.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            incremental: false,
            cache: false,
        }
    }

    /// Marks the plugin as able to analyse only changed files.
    #[must_use]
    pub const fn with_incremental(mut self) -> Self {
        self.incremental = true;
        self
    }

    /// Marks the plugin as able to reuse cached results.
    #[must_use]
    pub const fn with_cache(mut self) -> Self {
        self.cache = true;
        self
    }

    /// Whether incremental analysis is supported.
    #[must_use]
    pub const fn supports_incremental(self) -> bool {
        self.incremental
    }

    /// Whether result caching is supported.
    #[must_use]
    pub const fn supports_cache(self) -> bool {
        self.cache
    }
}

/// Identity and declared relationships of a plugin.
///
/// # Example
///
/// ```
/// use argus_plugins::{Capabilities, PluginDescriptor};
///
/// let descriptor = PluginDescriptor::new("tsc", "5.4.0")
///     .with_dependencies(["prettier"])
///     .with_capabilities(Capabilities::none().with_incremental())
///     .with_file_extensions(["ts", "tsx"]);
///
/// assert_eq!(descriptor.name(), "tsc");
/// assert_eq!(descriptor.dependencies(), ["prettier"]);
/// assert!(descriptor.capabilities().supports_incremental());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginDescriptor {
    name: String,
    version: String,
    #[serde(default)]
    dependencies: Vec<String>,
    #[serde(default)]
    capabilities: Capabilities,
    #[serde(default)]
    file_extensions: Vec<String>,
}

impl PluginDescriptor {
    /// Creates a descriptor with no dependencies or capabilities.
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            dependencies: Vec::new(),
            capabilities: Capabilities::none(),
            file_extensions: Vec::new(),
        }
    }

    /// Declares the plugins that must complete before this one runs.
    #[must_use]
    pub fn with_dependencies<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = dependencies.into_iter().map(Into::into).collect();
        self
    }

    /// Declares optional behaviours.
    #[must_use]
    pub const fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Restricts incremental relevance to files with these extensions.
    ///
    /// Extensions are compared case-insensitively and may be given with or
    /// without the leading dot.
    #[must_use]
    pub fn with_file_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.file_extensions = extensions
            .into_iter()
            .map(|ext| {
                let raw: String = ext.into();
                raw.trim_start_matches('.').to_ascii_lowercase()
            })
            .collect();
        self
    }

    /// Validates the descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::InvalidDescriptor`] when the name is blank,
    /// a dependency name is blank, or a dependency is listed twice.
    pub fn validate(&self) -> Result<(), RegistrationError> {
        if self.name.trim().is_empty() {
            return Err(RegistrationError::InvalidDescriptor {
                message: String::from("plugin name must not be empty"),
            });
        }
        let mut seen = HashSet::new();
        for dependency in &self.dependencies {
            if dependency.trim().is_empty() {
                return Err(RegistrationError::InvalidDescriptor {
                    message: format!("plugin '{}' declares an empty dependency name", self.name),
                });
            }
            if !seen.insert(dependency.as_str()) {
                return Err(RegistrationError::InvalidDescriptor {
                    message: format!(
                        "plugin '{}' lists dependency '{dependency}' more than once",
                        self.name
                    ),
                });
            }
        }
        Ok(())
    }

    /// Returns the unique plugin name.
    #[must_use]
    pub const fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the plugin version.
    #[must_use]
    pub const fn version(&self) -> &str {
        self.version.as_str()
    }

    /// Returns the declared dependency names.
    #[must_use]
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    /// Returns `true` when `name` is a declared dependency.
    #[must_use]
    pub fn depends_on(&self, name: &str) -> bool {
        self.dependencies.iter().any(|dep| dep == name)
    }

    /// Returns the capability flags.
    #[must_use]
    pub const fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Returns the normalised file extensions.
    #[must_use]
    pub fn file_extensions(&self) -> &[String] {
        &self.file_extensions
    }

    /// Returns `true` when a change to `path` concerns this plugin.
    ///
    /// A descriptor without extensions considers every file relevant.
    #[must_use]
    pub fn handles_file(&self, path: &Utf8Path) -> bool {
        if self.file_extensions.is_empty() {
            return true;
        }
        path.extension().is_some_and(|ext| {
            self.file_extensions
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
    }
}
