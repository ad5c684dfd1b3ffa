// Cache path utilities.
// Resolves the on-disk location of cache namespaces and entry files.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;

/// Namespace used by the stale repository report.
pub const DEFAULT_NAMESPACE: &str = "close-stale-repos";

/// Get the base cache directory (~/.cache/stale-repos on Linux).
pub fn cache_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "stale-repos").map(|dirs| dirs.cache_dir().to_path_buf())
}

/// Base directory to use when none is configured.
/// Falls back to `./.cache` when the platform has no cache directory.
pub fn default_base_dir() -> PathBuf {
    cache_dir().unwrap_or_else(|| PathBuf::from(".cache"))
}

/// Path to a namespace's directory.
pub fn namespace_dir(base: &Path, namespace: &str) -> PathBuf {
    base.join(sanitize_name(namespace))
}

/// Path to an entry file within a namespace directory.
pub fn entry_path(namespace_dir: &Path, digest: &str) -> PathBuf {
    namespace_dir.join(format!("{}.json", digest))
}

/// Sanitize a name for use in filesystem paths.
/// Replaces problematic characters with underscores.
fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            _ => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("simple"), "simple");
        assert_eq!(sanitize_name("with/slash"), "with_slash");
        assert_eq!(sanitize_name("ns:dev"), "ns_dev");
    }

    #[test]
    fn test_cache_paths() {
        let base = Path::new("/tmp/cache-root");
        let ns = namespace_dir(base, DEFAULT_NAMESPACE);
        assert!(ns.ends_with("cache-root/close-stale-repos"));

        let entry = entry_path(&ns, "abc123");
        assert!(entry.ends_with("close-stale-repos/abc123.json"));
    }
}
