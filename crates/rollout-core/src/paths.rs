use crate::error::{Result, RolloutError};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const ROLLOUT_DIR: &str = ".rollout";
pub const CONFIG_FILE: &str = ".rollout/config.yaml";

/// Per-user cache file, relative to the home directory.
pub const USER_CACHE_FILE: &str = ".rollout/cache.redb";

pub const CACHE_FILE_ENV: &str = "ROLLOUT_CACHE_FILE";
pub const NO_CACHE_ENV: &str = "ROLLOUT_NO_CACHE";
pub const TARGET_ORG_ENV: &str = "ROLLOUT_TARGET_ORG";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn rollout_dir(root: &Path) -> PathBuf {
    root.join(ROLLOUT_DIR)
}

pub fn data_workspace_dir(root: &Path, data_dir: &str, name: &str) -> PathBuf {
    root.join(data_dir).join(name)
}

/// Resolve the per-user cache file.
///
/// `ROLLOUT_CACHE_FILE` wins when set and non-empty; otherwise
/// `~/.rollout/cache.redb`.
pub fn user_cache_path() -> Result<PathBuf> {
    if let Ok(explicit) = std::env::var(CACHE_FILE_ENV) {
        if !explicit.trim().is_empty() {
            return Ok(PathBuf::from(explicit));
        }
    }
    let home = home::home_dir().ok_or(RolloutError::HomeNotFound)?;
    Ok(home.join(USER_CACHE_FILE))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_helpers() {
        let root = Path::new("/tmp/proj");
        assert_eq!(
            config_path(root),
            PathBuf::from("/tmp/proj/.rollout/config.yaml")
        );
        assert_eq!(rollout_dir(root), PathBuf::from("/tmp/proj/.rollout"));
        assert_eq!(
            data_workspace_dir(root, "scripts/data", "accounts"),
            PathBuf::from("/tmp/proj/scripts/data/accounts")
        );
    }
}
