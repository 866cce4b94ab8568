use std::path::{Path, PathBuf};

/// Resolve the project root directory.
///
/// Priority:
/// 1. `--root` flag / `ROLLOUT_ROOT` env var (passed in as `explicit`)
/// 2. Walk upward from `cwd` looking for `.rollout/`
/// 3. Walk upward from `cwd` looking for `.git/`
/// 4. Fall back to `cwd`
pub fn resolve_root(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    find_marker(&cwd, ".rollout")
        .or_else(|| find_marker(&cwd, ".git"))
        .unwrap_or(cwd)
}

/// Nearest ancestor of `start` (inclusive) containing a `marker` directory.
fn find_marker(start: &Path, marker: &str) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(marker).is_dir())
        .map(Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn explicit_root_wins() {
        let dir = TempDir::new().unwrap();
        let result = resolve_root(Some(dir.path()));
        assert_eq!(result, dir.path());
    }

    #[test]
    fn finds_rollout_dir_above_subdir() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".rollout")).unwrap();
        let subdir = dir.path().join("force-app/main");
        std::fs::create_dir_all(&subdir).unwrap();

        assert_eq!(find_marker(&subdir, ".rollout").as_deref(), Some(dir.path()));
    }

    #[test]
    fn rollout_marker_is_nearest_ancestor() {
        let dir = TempDir::new().unwrap();
        let inner = dir.path().join("packages/app");
        std::fs::create_dir_all(dir.path().join(".rollout")).unwrap();
        std::fs::create_dir_all(inner.join(".rollout")).unwrap();

        assert_eq!(find_marker(&inner, ".rollout"), Some(inner.clone()));
        assert_eq!(find_marker(&inner, ".no-such-marker"), None);
    }
}
