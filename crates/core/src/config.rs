//! Application configuration (`rollcall.toml`)

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::roster::{DEFAULT_PAGE_SIZE, PAGE_SIZE_OPTIONS};

pub const CONFIG_FILE_NAME: &str = "rollcall.toml";

/// Default hub port
pub const DEFAULT_HUB_PORT: u16 = 7341;

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("dev", "onyx", "rollcall").ok_or_else(|| {
        Error::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Could not determine data directory",
        ))
    })
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RollcallConfig {
    pub storage: StorageConfig,
    pub hub: HubConfig,
    pub roster: RosterConfig,
    pub admin: AdminConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Database file; the platform data directory when unset
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    pub enabled: bool,
    pub port: u16,
    /// Shared secret kiosks present in their handshake
    pub token: Option<String>,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: DEFAULT_HUB_PORT,
            token: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RosterConfig {
    pub page_size: usize,
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    pub bootstrap_email: Option<String>,
    pub bootstrap_password: Option<String>,
}

impl AdminConfig {
    pub fn bootstrap_credentials(&self) -> Option<(&str, &str)> {
        match (&self.bootstrap_email, &self.bootstrap_password) {
            (Some(email), Some(password)) if !email.trim().is_empty() => {
                Some((email.as_str(), password.as_str()))
            }
            _ => None,
        }
    }
}

impl RollcallConfig {
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: RollcallConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from an explicit file, which must exist
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&content)?;
        info!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    /// Load from the platform config directory, falling back to defaults
    pub fn load() -> Result<Self> {
        let path = Self::default_path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            debug!(path = %path.display(), "No configuration file, using defaults");
            Ok(Self::default())
        }
    }

    pub fn default_path() -> Result<PathBuf> {
        Ok(project_dirs()?.config_dir().join(CONFIG_FILE_NAME))
    }

    pub fn validate(&self) -> Result<()> {
        if !PAGE_SIZE_OPTIONS.contains(&self.roster.page_size) {
            return Err(Error::Config(format!(
                "roster.page_size must be one of {:?}, got {}",
                PAGE_SIZE_OPTIONS, self.roster.page_size
            )));
        }
        if self.hub.enabled && self.hub.port == 0 {
            return Err(Error::Config("hub.port must not be 0".into()));
        }
        Ok(())
    }

    /// Database path, defaulting to the platform data directory
    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.storage.path {
            Some(path) => Ok(path.clone()),
            None => Ok(project_dirs()?.data_dir().join("rollcall.db")),
        }
    }

    pub fn export_dir(&self) -> Result<PathBuf> {
        let dirs = directories::UserDirs::new();
        match dirs.as_ref().and_then(|d| d.download_dir()) {
            Some(dir) => Ok(dir.to_path_buf()),
            None => Ok(project_dirs()?.data_dir().join("exports")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RollcallConfig::from_toml("").unwrap();
        assert_eq!(config, RollcallConfig::default());
        assert_eq!(config.roster.page_size, 20);
        assert!(!config.hub.enabled);
        assert!(config.admin.bootstrap_credentials().is_none());
    }

    #[test]
    fn test_partial_sections() {
        let config = RollcallConfig::from_toml(
            r#"
            [storage]
            path = "/tmp/asistencia.db"

            [hub]
            enabled = true
            token = "kiosco"

            [admin]
            bootstrap_email = "admin@colegio.cl"
            bootstrap_password = "secreto123"
            "#,
        )
        .unwrap();
        assert_eq!(config.database_path().unwrap(), PathBuf::from("/tmp/asistencia.db"));
        assert_eq!(config.hub.port, DEFAULT_HUB_PORT);
        assert_eq!(config.hub.token.as_deref(), Some("kiosco"));
        assert_eq!(
            config.admin.bootstrap_credentials(),
            Some(("admin@colegio.cl", "secreto123"))
        );
    }

    #[test]
    fn test_rejects_unknown_page_size() {
        let result = RollcallConfig::from_toml("[roster]\npage_size = 15\n");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[roster]\npage_size = 50\n").unwrap();
        assert_eq!(RollcallConfig::load_from(&path).unwrap().roster.page_size, 50);

        let bad = dir.path().join("bad.toml");
        std::fs::write(&bad, "[roster\n").unwrap();
        assert!(matches!(RollcallConfig::load_from(&bad), Err(Error::Config(_))));
    }
}
