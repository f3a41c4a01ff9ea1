use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Home directory used when neither the CLI nor a config file names one.
pub const DEFAULT_HOME: &str = "/var/lib/zerotier";

/// Top-level configuration, optionally loaded from a TOML file.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    pub service: ServiceSection,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServiceSection {
    /// Base path holding the identity file and node state.
    pub home: PathBuf,
}

impl Default for ServiceSection {
    fn default() -> Self {
        Self {
            home: PathBuf::from(DEFAULT_HOME),
        }
    }
}

impl ServiceConfig {
    /// Load from `path`. Unlike a missing optional file, an explicitly named file that
    /// cannot be read or parsed is an error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        toml::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Resolve the effective home: CLI override first, then the config file value.
    pub fn resolve_home(&self, cli_home: Option<&Path>) -> PathBuf {
        cli_home
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.service.home.clone())
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Read { path, source } => {
                write!(f, "failed to read config {}: {source}", path.display())
            }
            ConfigError::Parse { path, source } => {
                write!(f, "failed to parse config {}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Read { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
        }
    }
}
