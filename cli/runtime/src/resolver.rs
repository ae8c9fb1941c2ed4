//! Location resolution: mapping a specifier plus a base location to a
//! canonical location, and fetching the source stored there.

use crate::location::Location;
use mcjs_path_util::{from_file_url, is_relative_specifier, strip_unc_prefix};
use serde::Deserialize;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Empty module specifier")]
    EmptySpecifier,

    #[error("Module not found")]
    NotFound,

    #[error("Unsupported location '{0}'")]
    UnsupportedLocation(String),

    #[error("Invalid package manifest '{path}': {source}")]
    Manifest {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0}")]
    Io(#[from] std::io::Error),
}

/// The pluggable resolution/fetch strategy an environment delegates to.
///
/// `base` is either a module location (resolve next to it) or a directory
/// location such as the environment root.
pub trait Resolver {
    /// # Errors
    /// Returns an error if the specifier does not name a loadable module
    fn resolve(&self, base: &Location, specifier: &str) -> Result<Location, ResolveError>;

    /// # Errors
    /// Returns an error if the source cannot be read
    fn load(&self, location: &Location) -> Result<String, ResolveError>;
}

/// Package-root lookup policy shared by the bundled resolvers
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct ResolverOptions {
    /// Suffixes tried when the specifier does not name a file exactly
    pub extensions: Vec<String>,
    /// Files tried when the specifier names a directory
    pub index_files: Vec<String>,
    /// Directories searched, from the base upward, for bare specifiers
    pub package_dirs: Vec<String>,
    /// Manifest whose `main` field names a package entry point
    pub manifest: String,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            extensions: vec![".js".to_string(), ".json".to_string()],
            index_files: vec!["index.js".to_string(), "index.json".to_string()],
            package_dirs: vec!["node_modules".to_string()],
            manifest: "package.json".to_string(),
        }
    }
}

#[derive(Deserialize)]
pub(crate) struct PackageManifest {
    pub(crate) main: Option<String>,
}

/// Resolves `file://` locations against the local filesystem
#[derive(Debug, Clone, Default)]
pub struct FsResolver {
    options: ResolverOptions,
}

impl FsResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ResolverOptions) -> Self {
        Self { options }
    }

    fn base_dir(base: &Location) -> Result<PathBuf, ResolveError> {
        let base_path = base
            .to_file_path()
            .ok_or_else(|| ResolveError::UnsupportedLocation(base.to_string()))?;
        if base_path.is_file() {
            Ok(base_path
                .parent()
                .map_or_else(|| PathBuf::from("."), Path::to_path_buf))
        } else {
            Ok(base_path)
        }
    }

    fn try_resolve(&self, path: &Path) -> Result<Option<PathBuf>, ResolveError> {
        if let Some(found) = self.try_file(path) {
            return Ok(Some(found));
        }
        if path.is_dir() {
            return self.resolve_directory(path);
        }
        Ok(None)
    }

    fn try_file(&self, path: &Path) -> Option<PathBuf> {
        if path.is_file() {
            return Some(path.to_path_buf());
        }
        self.options
            .extensions
            .iter()
            .map(|ext| with_suffix(path, ext))
            .find(|candidate| candidate.is_file())
    }

    fn try_index(&self, dir: &Path) -> Option<PathBuf> {
        self.options
            .index_files
            .iter()
            .map(|name| dir.join(name))
            .find(|candidate| candidate.is_file())
    }

    fn resolve_directory(&self, dir: &Path) -> Result<Option<PathBuf>, ResolveError> {
        let manifest_path = dir.join(&self.options.manifest);
        if manifest_path.is_file() {
            let text = fs::read_to_string(&manifest_path)?;
            let manifest: PackageManifest =
                serde_json::from_str(&text).map_err(|source| ResolveError::Manifest {
                    path: manifest_path.display().to_string(),
                    source,
                })?;
            if let Some(main) = manifest.main {
                let target = dir.join(main);
                if let Some(found) = self.try_file(&target) {
                    return Ok(Some(found));
                }
                if target.is_dir() {
                    if let Some(found) = self.try_index(&target) {
                        return Ok(Some(found));
                    }
                }
            }
        }
        Ok(self.try_index(dir))
    }

    fn resolve_package(
        &self,
        base_dir: &Path,
        specifier: &str,
    ) -> Result<Option<PathBuf>, ResolveError> {
        for ancestor in base_dir.ancestors() {
            for package_dir in &self.options.package_dirs {
                let candidate = ancestor.join(package_dir).join(specifier);
                if let Some(found) = self.try_resolve(&candidate)? {
                    return Ok(Some(found));
                }
            }
        }
        Ok(None)
    }
}

impl Resolver for FsResolver {
    fn resolve(&self, base: &Location, specifier: &str) -> Result<Location, ResolveError> {
        let base_dir = Self::base_dir(base)?;

        let found = if let Some(path) = from_file_url(specifier) {
            self.try_resolve(&path)?
        } else if is_relative_specifier(specifier) || Path::new(specifier).is_absolute() {
            self.try_resolve(&base_dir.join(specifier))?
        } else {
            self.resolve_package(&base_dir, specifier)?
        };

        let path = found.ok_or(ResolveError::NotFound)?;
        let canonical = strip_unc_prefix(fs::canonicalize(&path)?);
        tracing::trace!(specifier, base = %base, resolved = %canonical.display(), "resolved");
        Ok(Location::from_path(&canonical))
    }

    fn load(&self, location: &Location) -> Result<String, ResolveError> {
        let path = location
            .to_file_path()
            .ok_or_else(|| ResolveError::UnsupportedLocation(location.to_string()))?;
        Ok(fs::read_to_string(path)?)
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut raw: OsString = path.as_os_str().to_owned();
    raw.push(suffix);
    PathBuf::from(raw)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code: unwrap is acceptable
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, relative: &str, contents: &str) -> PathBuf {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, contents).unwrap();
        path
    }

    fn canonical(path: &Path) -> Location {
        Location::from_path(&strip_unc_prefix(fs::canonicalize(path).unwrap()))
    }

    #[test]
    fn test_relative_with_extension_probe() {
        let dir = TempDir::new().unwrap();
        let a = write(dir.path(), "a.js", "");
        let root = Location::from_path(dir.path());

        let resolver = FsResolver::new();
        assert_eq!(resolver.resolve(&root, "./a").unwrap(), canonical(&a));
        assert_eq!(resolver.resolve(&root, "./a.js").unwrap(), canonical(&a));
    }

    #[test]
    fn test_equivalent_specifiers_share_a_location() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "lib/a.js", "");
        let b = write(dir.path(), "lib/b.js", "");
        let root = Location::from_path(dir.path());

        let resolver = FsResolver::new();
        let from_root = resolver.resolve(&root, "./lib/b").unwrap();
        let caller = resolver.resolve(&root, "./lib/a").unwrap();
        let from_sibling = resolver.resolve(&caller, "./b.js").unwrap();
        let roundabout = resolver.resolve(&caller, "../lib/./b").unwrap();

        assert_eq!(from_root, canonical(&b));
        assert_eq!(from_root, from_sibling);
        assert_eq!(from_root, roundabout);
    }

    #[test]
    fn test_directory_index_and_manifest_main() {
        let dir = TempDir::new().unwrap();
        let index = write(dir.path(), "widgets/index.js", "");
        write(dir.path(), "pkg/package.json", r#"{ "main": "lib/entry" }"#);
        let entry = write(dir.path(), "pkg/lib/entry.js", "");
        let root = Location::from_path(dir.path());

        let resolver = FsResolver::new();
        assert_eq!(resolver.resolve(&root, "./widgets").unwrap(), canonical(&index));
        assert_eq!(resolver.resolve(&root, "./pkg").unwrap(), canonical(&entry));
    }

    #[test]
    fn test_bare_specifier_walks_package_dirs_upward() {
        let dir = TempDir::new().unwrap();
        let lodash = write(dir.path(), "node_modules/lodash/index.js", "");
        let caller = write(dir.path(), "src/deep/main.js", "");

        let resolver = FsResolver::new();
        let resolved = resolver
            .resolve(&canonical(&caller), "lodash")
            .unwrap();
        assert_eq!(resolved, canonical(&lodash));
    }

    #[test]
    fn test_custom_package_dirs() {
        let dir = TempDir::new().unwrap();
        let helper = write(dir.path(), "vendor/helper.js", "");
        let root = Location::from_path(dir.path());

        let resolver = FsResolver::with_options(ResolverOptions {
            package_dirs: vec!["vendor".to_string()],
            ..ResolverOptions::default()
        });
        assert_eq!(resolver.resolve(&root, "helper").unwrap(), canonical(&helper));
        assert!(matches!(
            FsResolver::new().resolve(&root, "helper"),
            Err(ResolveError::NotFound)
        ));
    }

    #[test]
    fn test_broken_manifest_is_reported() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "pkg/package.json", "{ not json");
        let root = Location::from_path(dir.path());

        let err = FsResolver::new().resolve(&root, "./pkg").unwrap_err();
        assert!(matches!(err, ResolveError::Manifest { .. }));
    }

    #[test]
    fn test_missing_and_unsupported() {
        let dir = TempDir::new().unwrap();
        let root = Location::from_path(dir.path());
        let resolver = FsResolver::new();

        assert!(matches!(
            resolver.resolve(&root, "./nope"),
            Err(ResolveError::NotFound)
        ));
        assert!(matches!(
            resolver.resolve(&Location::new("memory:///"), "./a"),
            Err(ResolveError::UnsupportedLocation(_))
        ));
    }

    #[test]
    fn test_load_reads_source() {
        let dir = TempDir::new().unwrap();
        let a = write(dir.path(), "a.js", "module.exports = 1;");
        let resolver = FsResolver::new();
        assert_eq!(
            resolver.load(&canonical(&a)).unwrap(),
            "module.exports = 1;"
        );
    }
}
