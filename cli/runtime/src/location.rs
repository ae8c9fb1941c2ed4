use mcjs_path_util::{from_file_url, parent_slashes, to_file_url};
use std::fmt;
use std::path::{Path, PathBuf};

/// A canonical, comparable module location such as `file:///srv/app/a.js`.
///
/// Two specifiers that resolve to the same file produce equal locations, so
/// this is the module cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Location(String);

impl Location {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    /// Location of a filesystem path (not canonicalized)
    pub fn from_path(path: &Path) -> Self {
        Self(to_file_url(path))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The filesystem path for `file://` locations
    pub fn to_file_path(&self) -> Option<PathBuf> {
        from_file_url(&self.0)
    }

    /// Text a script sees as `__filename`: a path for files, the URL otherwise
    pub fn display_name(&self) -> String {
        match self.to_file_path() {
            Some(path) => path.display().to_string(),
            None => self.0.clone(),
        }
    }

    /// The enclosing directory, as a location
    pub fn parent(&self) -> Location {
        let (scheme, path) = self.split_scheme();
        Location(format!("{scheme}{}", parent_slashes(path)))
    }

    /// A child of this location, which is taken to be a directory
    pub fn join(&self, name: &str) -> Location {
        let (scheme, path) = self.split_scheme();
        let dir = path.strip_suffix('/').unwrap_or(path);
        Location(format!("{scheme}{dir}/{name}"))
    }

    /// `scheme://` and the path after it
    fn split_scheme(&self) -> (&str, &str) {
        match self.0.find("://") {
            Some(index) => self.0.split_at(index + 3),
            None => ("", self.0.as_str()),
        }
    }

    /// Whether the location names a JSON document
    pub fn is_json(&self) -> bool {
        Path::new(&self.0)
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&Path> for Location {
    fn from(path: &Path) -> Self {
        Self::from_path(path)
    }
}
