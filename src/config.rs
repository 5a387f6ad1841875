use anyhow::{Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::github::DEFAULT_API_HOST;

/// Main configuration structure for repodex
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    /// GitHub users and organizations to sync
    #[serde(default)]
    pub identities: Vec<Identity>,

    /// Override for the snapshot cache file location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_file: Option<String>,
}

/// One configured GitHub user or organization
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct Identity {
    /// User or organization login
    pub name: String,

    /// Bearer token attached to every request for this identity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// True when the name is an organization rather than a user
    #[serde(default)]
    pub is_org: bool,

    /// API base URL override, e.g. for GitHub Enterprise on-prem
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
}

impl Identity {
    /// Resolved API base URL for this identity, without a trailing slash
    pub fn api_host(&self) -> &str {
        self.host
            .as_deref()
            .map(|h| h.trim_end_matches('/'))
            .filter(|h| !h.is_empty())
            .unwrap_or(DEFAULT_API_HOST)
    }
}

impl Config {
    /// Load configuration from the default location or fall back to an empty config
    pub fn load_or_default() -> Result<Self> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load(&config_path)
        } else {
            tracing::info!(
                "No configuration found at {:?}, starting with an empty identity list",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self).context("Failed to serialize configuration")?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;

        Ok(())
    }

    /// Get the default configuration file path (XDG compliant)
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = config_dir().context("Failed to get user config directory")?;

        Ok(config_dir.join("repodex").join("config.yml"))
    }

    /// Get the default snapshot cache file path (XDG compliant)
    pub fn default_cache_path() -> Result<PathBuf> {
        let config_dir = config_dir().context("Failed to get user config directory")?;

        Ok(config_dir.join("repodex").join("cache.json"))
    }

    /// Resolve the snapshot cache file path, honoring the config override
    pub fn cache_path(&self) -> Result<PathBuf> {
        match &self.cache_file {
            Some(raw) => {
                let expanded = shellexpand::full(raw)
                    .with_context(|| format!("Failed to expand cache_file path: {}", raw))?;
                Ok(PathBuf::from(expanded.into_owned()))
            }
            None => Self::default_cache_path(),
        }
    }

    /// Identities eligible for pull request search (users only)
    pub fn user_identities(&self) -> impl Iterator<Item = &Identity> {
        self.identities.iter().filter(|i| !i.is_org)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use tempfile::TempDir;

    fn identity(name: &str) -> Identity {
        Identity {
            name: name.to_string(),
            token: None,
            is_org: false,
            host: None,
        }
    }

    #[test]
    fn test_config_default_values() {
        let config = Config::default();

        assert!(config.identities.is_empty());
        assert!(config.cache_file.is_none());
    }

    #[test]
    fn test_api_host_default() {
        let id = identity("hay-kot");
        assert_eq!(id.api_host(), "https://api.github.com");
    }

    #[test]
    fn test_api_host_override_trims_trailing_slash() {
        let mut id = identity("acme");
        id.host = Some("https://ghe.example.com/api/v3/".to_string());
        assert_eq!(id.api_host(), "https://ghe.example.com/api/v3");

        id.host = Some(String::new());
        assert_eq!(id.api_host(), "https://api.github.com");
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml_content = r#"
identities:
  - name: hay-kot
    token: ghp_testtoken
  - name: acme-corp
    is_org: true
    host: https://ghe.example.com/api/v3
cache_file: "/tmp/repodex/cache.json"
"#;

        let config: Config = serde_yaml::from_str(yaml_content).expect("Failed to parse YAML");

        assert_eq!(config.identities.len(), 2);
        assert_eq!(config.identities[0].name, "hay-kot");
        assert_eq!(config.identities[0].token, Some("ghp_testtoken".to_string()));
        assert!(!config.identities[0].is_org);
        assert!(config.identities[1].is_org);
        assert_eq!(
            config.identities[1].host.as_deref(),
            Some("https://ghe.example.com/api/v3")
        );
        assert_eq!(config.cache_file.as_deref(), Some("/tmp/repodex/cache.json"));
    }

    #[test]
    fn test_config_save_and_load() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("repodex").join("config.yml");

        let mut config = Config::default();
        config.identities.push(Identity {
            name: "hay-kot".to_string(),
            token: Some("ghp_secret".to_string()),
            is_org: false,
            host: None,
        });
        config.cache_file = Some("/custom/cache.json".to_string());

        config.save(&config_path).expect("Failed to save config");

        let loaded = Config::load(&config_path).expect("Failed to load config");
        assert_eq!(loaded.identities, config.identities);
        assert_eq!(loaded.cache_file, config.cache_file);
    }

    #[test]
    fn test_config_load_nonexistent_file() {
        let result = Config::load(Path::new("/nonexistent/path/config.yml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_cache_path_expansion() {
        env::set_var("TEST_REPODEX_HOME", "/test/home");

        let config = Config {
            identities: Vec::new(),
            cache_file: Some("${TEST_REPODEX_HOME}/cache.json".to_string()),
        };

        let path = config.cache_path().expect("Failed to resolve cache path");
        assert_eq!(path, PathBuf::from("/test/home/cache.json"));

        env::remove_var("TEST_REPODEX_HOME");
    }

    #[test]
    fn test_default_cache_path_xdg() {
        let path = Config::default_cache_path().expect("Failed to get default cache path");
        assert!(path.to_string_lossy().contains("repodex"));
        assert!(path.to_string_lossy().ends_with("cache.json"));
    }

    #[test]
    fn test_user_identities_skips_orgs() {
        let mut config = Config::default();
        config.identities.push(identity("alice"));
        config.identities.push(Identity {
            name: "acme-corp".to_string(),
            token: None,
            is_org: true,
            host: None,
        });
        config.identities.push(identity("bob"));

        let users: Vec<&str> = config.user_identities().map(|i| i.name.as_str()).collect();
        assert_eq!(users, vec!["alice", "bob"]);
    }
}
