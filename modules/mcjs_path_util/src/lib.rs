#![deny(clippy::print_stderr)]
#![deny(clippy::print_stdout)]

use std::path::{Path, PathBuf};

const FILE_SCHEME: &str = "file://";

/// Convert a file path to a file:// URL string.
///
/// # Examples
///
/// ```
/// # use std::path::PathBuf;
/// # use mcjs_path_util::to_file_url;
/// # #[cfg(unix)]
/// # {
/// let url = to_file_url(&PathBuf::from("/srv/app/main.js"));
/// assert_eq!(url, "file:///srv/app/main.js");
/// # }
/// ```
pub fn to_file_url(path: &Path) -> String {
    let path = strip_unc_prefix(path.to_path_buf());
    let path_str = path.display().to_string().replace('\\', "/");

    // Windows paths start with a drive letter (C:/...), Unix ones with /
    if cfg!(windows) {
        format!("{FILE_SCHEME}/{path_str}")
    } else {
        format!("{FILE_SCHEME}{path_str}")
    }
}

/// Convert a file:// URL back into a filesystem path.
///
/// Returns `None` for any other scheme.
pub fn from_file_url(url: &str) -> Option<PathBuf> {
    let rest = url.strip_prefix(FILE_SCHEME)?;
    if cfg!(windows) {
        let rest = rest.strip_prefix('/').unwrap_or(rest);
        Some(PathBuf::from(rest.replace('/', "\\")))
    } else {
        Some(PathBuf::from(rest))
    }
}

/// Returns true for specifiers that are resolved against a base location
/// rather than looked up as a package.
pub fn is_relative_specifier(specifier: &str) -> bool {
    specifier == "."
        || specifier == ".."
        || specifier.starts_with("./")
        || specifier.starts_with("../")
}

/// Lexically normalize a `/`-separated absolute path, collapsing `.` and
/// `..` segments. Leading `..` segments above the root are dropped.
pub fn normalize_slashes(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    format!("/{}", segments.join("/"))
}

/// Parent directory of a `/`-separated absolute path. The root is its own
/// parent.
pub fn parent_slashes(path: &str) -> &str {
    match path.trim_end_matches('/').rfind('/') {
        Some(0) | None => "/",
        Some(index) => &path[..index],
    }
}

/// Join a `/`-separated specifier onto a base directory and normalize.
pub fn join_slashes(base_dir: &str, specifier: &str) -> String {
    if specifier.starts_with('/') {
        normalize_slashes(specifier)
    } else {
        normalize_slashes(&format!("{base_dir}/{specifier}"))
    }
}

/// Strips the UNC prefix from a Windows path.
///
/// On non-Windows platforms, this function returns the path unchanged.
#[cfg(not(windows))]
#[inline]
pub fn strip_unc_prefix(path: PathBuf) -> PathBuf {
    path
}

/// Strips the unc prefix (ex. \\?\) from canonicalized Windows paths.
#[cfg(windows)]
pub fn strip_unc_prefix(path: PathBuf) -> PathBuf {
    use std::path::{Component, Prefix};

    let mut components = path.components();
    match components.next() {
        Some(Component::Prefix(prefix)) => match prefix.kind() {
            // \\?\c:\path
            Prefix::VerbatimDisk(_) => {
                let mut stripped = PathBuf::new();
                stripped.push(prefix.as_os_str().to_string_lossy().replace(r"\\?\", ""));
                stripped.extend(components);
                stripped
            }
            // \\?\UNC\hostname\share_name\path
            Prefix::VerbatimUNC(hostname, share_name) => {
                let mut stripped = PathBuf::new();
                stripped.push(format!(
                    r"\\{}\{}\",
                    hostname.to_string_lossy(),
                    share_name.to_string_lossy()
                ));
                stripped.extend(components.filter(|c| !matches!(c, Component::RootDir)));
                stripped
            }
            _ => path,
        },
        _ => path,
    }
}
