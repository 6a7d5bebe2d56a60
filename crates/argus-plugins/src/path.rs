//! Lexical path handling shared by the sandbox and the normaliser.

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};

/// Resolves `.` and `..` components without consulting the filesystem.
///
/// Leading `..` components of a relative path are kept; `..` directly under
/// the root is dropped. Symlinks are not followed.
///
/// # Examples
///
/// ```
/// use camino::Utf8Path;
/// use argus_plugins::path::normalize_lexically;
///
/// let resolved = normalize_lexically(Utf8Path::new("/srv/app/../lib"));
/// assert_eq!(resolved.as_str(), "/srv/lib");
/// let relative = normalize_lexically(Utf8Path::new("../app/./src"));
/// assert_eq!(relative.as_str(), "../app/src");
/// ```
#[must_use]
pub fn normalize_lexically(path: &Utf8Path) -> Utf8PathBuf {
    let mut normalised = Utf8PathBuf::new();
    for component in path.components() {
        match component {
            Utf8Component::CurDir => {}
            Utf8Component::ParentDir => {
                if normalised.file_name().is_some() {
                    normalised.pop();
                } else if !normalised.has_root() {
                    normalised.push("..");
                }
            }
            other => normalised.push(other.as_str()),
        }
    }
    normalised
}
