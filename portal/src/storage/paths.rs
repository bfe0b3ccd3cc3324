use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{PortalError, PortalResult};

/// Manages filesystem paths used by the portal client.
#[derive(Debug, Clone)]
pub struct PortalPaths {
    /// Root directory for client data.
    root_dir: PathBuf,
    /// Persisted client-side key/value state (credential pair).
    local_state_file: PathBuf,
    /// Path to persisted portal configuration.
    config_file: PathBuf,
}

impl PortalPaths {
    /// Default file name of the key/value state file.
    pub const LOCAL_STATE_FILENAME: &'static str = "local_state.json";
    /// Default file name of the configuration file.
    pub const CONFIG_FILENAME: &'static str = "portal.config";

    /// Create a new path manager rooted at the provided directory.
    pub fn new(root: impl AsRef<Path>) -> PortalResult<Self> {
        let root_dir = root.as_ref().to_path_buf();
        if root_dir.as_os_str().is_empty() {
            return Err(PortalError::StorageError(
                "Portal root directory cannot be empty".to_string(),
            ));
        }

        Ok(Self {
            local_state_file: root_dir.join(Self::LOCAL_STATE_FILENAME),
            config_file: root_dir.join(Self::CONFIG_FILENAME),
            root_dir,
        })
    }

    /// Ensure the directory structure exists, creating missing folders.
    pub fn ensure_directories(&self) -> PortalResult<()> {
        fs::create_dir_all(&self.root_dir)?;
        Ok(())
    }

    pub fn local_state_file(&self) -> &Path {
        &self.local_state_file
    }

    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn empty_root_is_rejected() {
        let err = PortalPaths::new("").unwrap_err();
        assert!(matches!(err, PortalError::StorageError(_)));
    }

    #[test]
    fn files_live_under_root() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("portal");
        let paths = PortalPaths::new(&root).unwrap();
        paths.ensure_directories().unwrap();

        assert!(root.is_dir());
        assert_eq!(paths.config_file(), root.join("portal.config"));
        assert_eq!(paths.local_state_file(), root.join("local_state.json"));
    }
}
