//! Run configuration, read from TOML.
//!
//! ```toml
//! prune_external_ids = true
//!
//! [remote]
//! url = "https://review.example.com/"
//! rate_per_second = 8
//! burst = 4
//!
//! [identity]
//! name = "aus"
//! email = "aus@invalid"
//! ```

use std::path::{Path, PathBuf};

use aus_remote::{DEFAULT_BURST, DEFAULT_RATE_PER_SECOND};
use serde::{Deserialize, Serialize};

use crate::error::{SyncError, SyncResult};

/// File name looked up at the repository root when no explicit config is
/// given.
pub const CONFIG_FILE_NAME: &str = "aus.toml";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub remote: RemoteConfig,
    pub identity: Identity,
    /// Drop ledger entries that a fetched account no longer owns.
    pub prune_external_ids: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub url: String,
    pub rate_per_second: u32,
    pub burst: u32,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8080/".to_string(),
            rate_per_second: DEFAULT_RATE_PER_SECOND,
            burst: DEFAULT_BURST,
        }
    }
}

/// Author and committer of every commit the sync writes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Identity {
    pub name: String,
    pub email: String,
}

impl Default for Identity {
    fn default() -> Self {
        Self {
            name: "aus".to_string(),
            email: "aus@invalid".to_string(),
        }
    }
}

impl SyncConfig {
    pub fn from_toml_str(text: &str, origin: &Path) -> SyncResult<Self> {
        toml::from_str(text).map_err(|e| SyncError::Config {
            path: origin.to_path_buf(),
            reason: e.to_string(),
        })
    }

    pub fn load(path: &Path) -> SyncResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| SyncError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let config = Self::from_toml_str(&text, path)?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Load `explicit` if given, else `<repo_root>/aus.toml` if it exists,
    /// else the defaults.
    pub fn discover(repo_root: Option<&Path>, explicit: Option<&Path>) -> SyncResult<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let candidate: Option<PathBuf> = repo_root.map(|root| root.join(CONFIG_FILE_NAME));
        match candidate {
            Some(path) if path.is_file() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = SyncConfig::default();
        assert_eq!(c.remote.url, "http://localhost:8080/");
        assert_eq!(c.remote.rate_per_second, 8);
        assert_eq!(c.remote.burst, 4);
        assert_eq!(c.identity.name, "aus");
        assert!(!c.prune_external_ids);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let c = SyncConfig::from_toml_str(
            "prune_external_ids = true\n[remote]\nurl = \"https://r.example/\"\n",
            Path::new("aus.toml"),
        )
        .unwrap();
        assert!(c.prune_external_ids);
        assert_eq!(c.remote.url, "https://r.example/");
        assert_eq!(c.remote.burst, 4);
        assert_eq!(c.identity, Identity::default());
    }

    #[test]
    fn rejects_bad_toml() {
        let err = SyncConfig::from_toml_str("[remote]\nburst = \"four\"\n", Path::new("x.toml"))
            .unwrap_err();
        assert!(matches!(err, SyncError::Config { .. }));
    }

    #[test]
    fn discover_prefers_explicit_then_repo_file() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            SyncConfig::discover(Some(dir.path()), None).unwrap(),
            SyncConfig::default()
        );

        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[identity]\nname = \"bot\"\n",
        )
        .unwrap();
        let c = SyncConfig::discover(Some(dir.path()), None).unwrap();
        assert_eq!(c.identity.name, "bot");

        let explicit = dir.path().join("other.toml");
        std::fs::write(&explicit, "[remote]\nrate_per_second = 2\n").unwrap();
        let c = SyncConfig::discover(Some(dir.path()), Some(&explicit)).unwrap();
        assert_eq!(c.remote.rate_per_second, 2);
        assert_eq!(c.identity.name, "aus");

        assert!(SyncConfig::discover(None, Some(&dir.path().join("missing.toml"))).is_err());
    }
}
