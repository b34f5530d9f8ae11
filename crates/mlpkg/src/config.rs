//! Configuration
//!
//! Settings are layered, later layers winning:
//! 1. built-in defaults (workspace = current directory)
//! 2. user file `<config dir>/mlpkg/config.toml`
//! 3. workspace file `<root>/mlpkg.toml` (cannot move the root)
//! 4. environment: `MLPKG_ROOT`, `MLPKG_REGISTRY`
//! 5. command line overrides

use crate::registry::DEFAULT_REGISTRY;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Workspace configuration file name
pub const WORKSPACE_CONFIG: &str = "mlpkg.toml";

/// Environment variable overriding the workspace root
pub const ENV_ROOT: &str = "MLPKG_ROOT";

/// Environment variable overriding the registry URL
pub const ENV_REGISTRY: &str = "MLPKG_REGISTRY";

/// Errors that can occur while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a configuration file
    #[error("Failed to read {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse {path}: {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Current directory unavailable
    #[error("Cannot determine the current directory: {0}")]
    NoWorkingDir(std::io::Error),
}

/// One configuration file; every key optional
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Workspace root
    pub root: Option<PathBuf>,

    /// Registry base URL
    pub registry_url: Option<String>,

    /// Whole-request timeout in seconds
    pub timeout_secs: Option<u64>,

    /// Connect timeout in seconds
    pub connect_timeout_secs: Option<u64>,
}

impl ConfigFile {
    /// Read a file; a missing file is an empty layer
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::IoError {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        toml::from_str(&content).map_err(|source| ConfigError::ParseError {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub root: Option<PathBuf>,
    pub registry_url: Option<String>,
}

/// Effective configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Workspace root holding `code/`, `data/`, `model/`
    pub root: PathBuf,

    /// Registry base URL
    pub registry_url: String,

    /// Whole-request timeout in seconds
    pub timeout_secs: u64,

    /// Connect timeout in seconds
    pub connect_timeout_secs: u64,
}

impl Config {
    /// Defaults for a workspace rooted at `root`
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            registry_url: DEFAULT_REGISTRY.to_string(),
            timeout_secs: 30,
            connect_timeout_secs: 10,
        }
    }

    /// Load from the process environment and the user's config directory
    pub fn load(overrides: &Overrides) -> Result<Self, ConfigError> {
        let cwd = std::env::current_dir().map_err(ConfigError::NoWorkingDir)?;
        let user_file = dirs::config_dir().map(|dir| dir.join("mlpkg").join("config.toml"));

        Self::from_layers(&cwd, user_file.as_deref(), |key| std::env::var(key).ok(), overrides)
    }

    /// Combine every layer explicitly
    pub fn from_layers<F>(
        cwd: &Path,
        user_file: Option<&Path>,
        env: F,
        overrides: &Overrides,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::with_root(cwd);

        if let Some(path) = user_file {
            let user = ConfigFile::load(path)?;
            if let Some(root) = &user.root {
                config.root = root.clone();
            }
            config.apply(user);
        }

        if let Some(root) = env(ENV_ROOT).filter(|v| !v.is_empty()) {
            config.root = PathBuf::from(root);
        }
        if let Some(root) = &overrides.root {
            config.root = root.clone();
        }
        if config.root.is_relative() {
            config.root = cwd.join(&config.root);
        }

        let workspace_path = config.root.join(WORKSPACE_CONFIG);
        let workspace = ConfigFile::load(&workspace_path)?;
        if workspace.root.is_some() {
            warn!(path = %workspace_path.display(), "ignoring `root` in workspace configuration");
        }
        config.apply(workspace);

        if let Some(url) = env(ENV_REGISTRY).filter(|v| !v.is_empty()) {
            config.registry_url = url;
        }
        if let Some(url) = &overrides.registry_url {
            config.registry_url = url.clone();
        }

        Ok(config)
    }

    fn apply(&mut self, file: ConfigFile) {
        if let Some(url) = file.registry_url {
            self.registry_url = url;
        }
        if let Some(secs) = file.timeout_secs {
            self.timeout_secs = secs;
        }
        if let Some(secs) = file.connect_timeout_secs {
            self.connect_timeout_secs = secs;
        }
    }

    /// Whole-request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Connect timeout
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}
