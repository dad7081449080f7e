use crate::{Error, Result};
use std::path::{Path, PathBuf};

/// Chrome user-data directory for one run.
///
/// Persistent profiles keep logins and manually installed extensions between
/// runs. Temporary profiles are removed on drop.
pub struct ProfileManager {
    path: PathBuf,
    is_temporary: bool,
}

impl ProfileManager {
    /// Create a throwaway profile
    pub fn temporary() -> Result<Self> {
        let path = tempfile::Builder::new()
            .prefix("soldlist-profile-")
            .tempdir()?
            .keep();

        Ok(Self {
            path,
            is_temporary: true,
        })
    }

    /// Use (and create if needed) the profile directory at `path`
    pub fn persistent(path: PathBuf) -> Result<Self> {
        if !path.exists() {
            std::fs::create_dir_all(&path)?;
        }

        Ok(Self {
            path,
            is_temporary: false,
        })
    }

    /// Persistent profile stored under `~/.soldlist/profiles/<name>`
    pub fn named(name: &str) -> Result<Self> {
        if name.is_empty() || name.contains(['/', '\\']) || name == ".." {
            return Err(Error::Profile(format!("invalid profile name: {:?}", name)));
        }

        let home = dirs::home_dir()
            .ok_or_else(|| Error::Profile("could not determine home directory".to_string()))?;
        Self::persistent(home.join(".soldlist").join("profiles").join(name))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_temporary(&self) -> bool {
        self.is_temporary
    }

    /// Stop tracking the directory so it outlives this manager
    pub fn keep(mut self) -> PathBuf {
        self.is_temporary = false;
        std::mem::take(&mut self.path)
    }
}

impl Drop for ProfileManager {
    fn drop(&mut self) {
        if self.is_temporary && self.path.exists() {
            let _ = std::fs::remove_dir_all(&self.path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temporary_profile_is_removed_on_drop() {
        let profile = ProfileManager::temporary().unwrap();
        let path = profile.path().to_path_buf();

        assert!(path.is_dir());
        assert!(profile.is_temporary());

        drop(profile);
        assert!(!path.exists());
    }

    #[test]
    fn test_kept_temporary_profile_survives_drop() {
        let profile = ProfileManager::temporary().unwrap();
        let path = profile.keep();

        assert!(path.is_dir());
        std::fs::remove_dir_all(&path).unwrap();
    }

    #[test]
    fn test_persistent_profile_survives_drop() {
        let temp_dir = tempfile::tempdir().unwrap();
        let profile_path = temp_dir.path().join("chrome-profile");

        let profile = ProfileManager::persistent(profile_path.clone()).unwrap();
        assert!(profile_path.is_dir());
        assert!(!profile.is_temporary());

        drop(profile);
        assert!(profile_path.exists());
    }

    #[test]
    fn test_named_profile_rejects_path_segments() {
        assert!(ProfileManager::named("../escape").is_err());
        assert!(ProfileManager::named("").is_err());
    }
}
