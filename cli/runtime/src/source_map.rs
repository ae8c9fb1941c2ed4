use crate::location::Location;
use crate::resolver::{PackageManifest, ResolveError, Resolver, ResolverOptions};
use mcjs_path_util::{is_relative_specifier, join_slashes, normalize_slashes, parent_slashes};
use std::collections::HashMap;

const SCHEME: &str = "memory://";

/// Serves module sources from an in-memory map of absolute `/`-separated
/// paths. Locations look like `memory:///lib/a.js`.
#[derive(Debug, Clone, Default)]
pub struct SourceMapResolver {
    options: ResolverOptions,
    source_map: HashMap<String, String>,
}

impl SourceMapResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ResolverOptions) -> Self {
        Self {
            options,
            source_map: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_module(mut self, path: &str, source: impl Into<String>) -> Self {
        self.insert(path, source);
        self
    }

    pub fn insert(&mut self, path: &str, source: impl Into<String>) {
        self.source_map.insert(normalize_slashes(path), source.into());
    }

    /// The root directory location, suitable as an environment root
    pub fn root() -> Location {
        Location::new(format!("{SCHEME}/"))
    }

    fn path_of(location: &Location) -> Result<&str, ResolveError> {
        location
            .as_str()
            .strip_prefix(SCHEME)
            .ok_or_else(|| ResolveError::UnsupportedLocation(location.to_string()))
    }

    fn try_resolve(&self, path: &str) -> Result<Option<String>, ResolveError> {
        if let Some(found) = self.try_file(path) {
            return Ok(Some(found));
        }

        let manifest_path = join_slashes(path, &self.options.manifest);
        if let Some(text) = self.source_map.get(&manifest_path) {
            let manifest: PackageManifest =
                serde_json::from_str(text).map_err(|source| ResolveError::Manifest {
                    path: manifest_path.clone(),
                    source,
                })?;
            if let Some(main) = manifest.main {
                let target = join_slashes(path, &main);
                if let Some(found) = self.try_file(&target).or_else(|| self.try_index(&target)) {
                    return Ok(Some(found));
                }
            }
        }
        Ok(self.try_index(path))
    }

    fn try_file(&self, path: &str) -> Option<String> {
        if self.source_map.contains_key(path) {
            return Some(path.to_string());
        }
        self.options
            .extensions
            .iter()
            .map(|ext| format!("{path}{ext}"))
            .find(|candidate| self.source_map.contains_key(candidate))
    }

    fn try_index(&self, dir: &str) -> Option<String> {
        self.options
            .index_files
            .iter()
            .map(|name| join_slashes(dir, name))
            .find(|candidate| self.source_map.contains_key(candidate))
    }

    fn resolve_package(
        &self,
        base_dir: &str,
        specifier: &str,
    ) -> Result<Option<String>, ResolveError> {
        let mut dir = base_dir.to_string();
        loop {
            for package_dir in &self.options.package_dirs {
                let candidate = join_slashes(&dir, &format!("{package_dir}/{specifier}"));
                if let Some(found) = self.try_resolve(&candidate)? {
                    return Ok(Some(found));
                }
            }
            if dir == "/" {
                return Ok(None);
            }
            dir = parent_slashes(&dir).to_string();
        }
    }
}

impl Resolver for SourceMapResolver {
    fn resolve(&self, base: &Location, specifier: &str) -> Result<Location, ResolveError> {
        let base_path = normalize_slashes(Self::path_of(base)?);
        let base_dir = if self.source_map.contains_key(&base_path) {
            parent_slashes(&base_path).to_string()
        } else {
            base_path
        };

        let found = if let Some(path) = specifier.strip_prefix(SCHEME) {
            self.try_resolve(&normalize_slashes(path))?
        } else if is_relative_specifier(specifier) || specifier.starts_with('/') {
            self.try_resolve(&join_slashes(&base_dir, specifier))?
        } else {
            self.resolve_package(&base_dir, specifier)?
        };

        found
            .map(|path| Location::new(format!("{SCHEME}{path}")))
            .ok_or(ResolveError::NotFound)
    }

    fn load(&self, location: &Location) -> Result<String, ResolveError> {
        let path = normalize_slashes(Self::path_of(location)?);
        self.source_map
            .get(&path)
            .cloned()
            .ok_or(ResolveError::NotFound)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code: unwrap is acceptable
mod tests {
    use super::*;

    fn location(path: &str) -> Location {
        Location::new(format!("{SCHEME}{path}"))
    }

    #[test]
    fn test_relative_and_absolute() {
        let resolver = SourceMapResolver::new()
            .with_module("/app/main.js", "")
            .with_module("/app/util.js", "")
            .with_module("/shared/data.json", "{}");
        let main = location("/app/main.js");

        assert_eq!(resolver.resolve(&main, "./util").unwrap(), location("/app/util.js"));
        assert_eq!(
            resolver.resolve(&main, "../shared/data").unwrap(),
            location("/shared/data.json")
        );
        assert_eq!(
            resolver.resolve(&SourceMapResolver::root(), "/app/main").unwrap(),
            main
        );
        assert!(matches!(
            resolver.resolve(&main, "./missing"),
            Err(ResolveError::NotFound)
        ));
    }

    #[test]
    fn test_package_lookup() {
        let resolver = SourceMapResolver::new()
            .with_module("/app/src/main.js", "")
            .with_module("/app/node_modules/left-pad/package.json", r#"{"main":"lib/pad.js"}"#)
            .with_module("/app/node_modules/left-pad/lib/pad.js", "")
            .with_module("/node_modules/tiny/index.js", "");
        let main = location("/app/src/main.js");

        assert_eq!(
            resolver.resolve(&main, "left-pad").unwrap(),
            location("/app/node_modules/left-pad/lib/pad.js")
        );
        assert_eq!(
            resolver.resolve(&main, "tiny").unwrap(),
            location("/node_modules/tiny/index.js")
        );
    }

    #[test]
    fn test_load() {
        let resolver = SourceMapResolver::new().with_module("/a.js", "exports.a = 1;");
        assert_eq!(resolver.load(&location("/a.js")).unwrap(), "exports.a = 1;");
        assert!(resolver.load(&location("/b.js")).is_err());
        assert!(matches!(
            resolver.load(&Location::new("file:///a.js")),
            Err(ResolveError::UnsupportedLocation(_))
        ));
    }
}
