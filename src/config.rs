use anyhow::{Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::ignore::IgnoreList;
use crate::rewrite::{RewriteRule, Rewriter};

/// Main configuration structure for MirrorSync.
///
/// Read once at run start; every run treats it as immutable.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    /// Local mirror settings
    #[serde(default)]
    pub mirror: MirrorConfig,

    /// Upstream repository being tracked
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Repository-relative paths exempt from all sync operations
    #[serde(default)]
    pub ignore: Vec<String>,

    /// Ordered literal substitutions applied to fetched text content
    #[serde(default)]
    pub rewrite: Vec<RewriteRule>,

    /// Paths deleted unconditionally after every sync
    #[serde(default)]
    pub cleanup: Vec<String>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Local mirror tree settings
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MirrorConfig {
    /// Root directory of the mirrored tree
    #[serde(default = "default_root")]
    pub root: String,
}

/// Upstream repository coordinates
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct UpstreamConfig {
    #[serde(default = "default_owner")]
    pub owner: String,

    #[serde(default = "default_repo")]
    pub repo: String,

    /// API base URL; overridable for testing against a local server
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default value functions
fn default_root() -> String {
    ".".to_string()
}
fn default_owner() -> String {
    "filebrowser".to_string()
}
fn default_repo() -> String {
    "filebrowser".to_string()
}
fn default_api_base() -> String {
    "https://api.github.com".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            owner: default_owner(),
            repo: default_repo(),
            api_base: default_api_base(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mirror: MirrorConfig::default(),
            upstream: UpstreamConfig::default(),
            ignore: Vec::new(),
            rewrite: Vec::new(),
            cleanup: Vec::new(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location or create a default config
    pub fn load_or_default() -> Result<Self> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load(&config_path)
        } else {
            let config = Self::default();

            if let Some(parent) = config_path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
            }

            config.save(&config_path)?;

            tracing::info!("Created default configuration at: {:?}", config_path);
            Ok(config)
        }
    }

    /// Load configuration from a specific file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let mut config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        // Expand environment variables in paths
        config.expand_paths()?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self).context("Failed to serialize configuration")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;

        Ok(())
    }

    /// Get the default configuration file path (XDG compliant)
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = config_dir().context("Failed to get user config directory")?;

        Ok(config_dir.join("mirrorsync").join("config.yml"))
    }

    /// Expand environment variables in configuration paths
    pub fn expand_paths(&mut self) -> Result<()> {
        self.mirror.root = shellexpand::full(&self.mirror.root)
            .context("Failed to expand mirror root path")?
            .into_owned();

        Ok(())
    }

    /// The mirror root as a path
    pub fn root_path(&self) -> PathBuf {
        PathBuf::from(&self.mirror.root)
    }

    /// Build the ignore-list configured for this run
    pub fn ignore_list(&self) -> IgnoreList {
        IgnoreList::new(self.ignore.iter().cloned())
    }

    /// Build the content rewriter configured for this run
    pub fn rewriter(&self) -> Rewriter {
        Rewriter::new(self.rewrite.clone())
    }
}
