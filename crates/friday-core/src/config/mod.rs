//! Configuration system for the sidecar.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{SidecarError, SidecarResult};

/// Environment variable naming a config file to load before env overrides.
pub const CONFIG_FILE_ENV: &str = "FRIDAY_CONFIG";

/// Sidecar configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SidecarConfig {
    /// Root directory holding one sub-directory per resource.
    pub library_path: PathBuf,
    /// SQLite file for resource records. Persistence is off when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,
    /// Default log filter when `RUST_LOG` is not set.
    pub log_level: String,
    /// Built-in plugins that should not be registered.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub disabled_plugins: Vec<String>,
}

impl Default for SidecarConfig {
    fn default() -> Self {
        Self {
            library_path: PathBuf::from("library"),
            database_path: None,
            log_level: "info".to_string(),
            disabled_plugins: Vec::new(),
        }
    }
}

impl SidecarConfig {
    /// Load configuration from a file (TOML, JSON, or YAML).
    pub fn from_file(path: impl AsRef<Path>) -> SidecarResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let ext = path.as_ref().extension().and_then(|e| e.to_str());

        match ext {
            Some("toml") => {
                toml::from_str(&content).map_err(|e| SidecarError::Configuration(e.to_string()))
            }
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| SidecarError::Configuration(e.to_string())),
            Some("yaml" | "yml") => serde_yaml::from_str(&content)
                .map_err(|e| SidecarError::Configuration(e.to_string())),
            _ => Err(SidecarError::Configuration(
                "Unsupported config file format. Use .toml, .json, or .yaml".to_string(),
            )),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Load `FRIDAY_CONFIG` if set, then apply environment overrides.
    pub fn load() -> SidecarResult<Self> {
        let base = match std::env::var(CONFIG_FILE_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::from_file(path.trim())?,
            _ => Self::default(),
        };
        Ok(base.with_env_overrides())
    }

    /// Apply `FRIDAY_*` environment variables on top of this config.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(path) = std::env::var("FRIDAY_LIBRARY_PATH") {
            if !path.trim().is_empty() {
                self.library_path = PathBuf::from(path);
            }
        }
        if let Ok(path) = std::env::var("FRIDAY_DATABASE_PATH") {
            if !path.trim().is_empty() {
                self.database_path = Some(PathBuf::from(path));
            }
        }
        if let Ok(level) = std::env::var("FRIDAY_LOG_LEVEL") {
            if !level.trim().is_empty() {
                self.log_level = level.trim().to_lowercase();
            }
        }
        if let Ok(list) = std::env::var("FRIDAY_DISABLED_PLUGINS") {
            self.disabled_plugins = parse_list(&list);
        }
        self
    }

    /// Library root as an absolute path.
    pub fn library_root(&self) -> SidecarResult<PathBuf> {
        absolutize(&self.library_path)
    }

    /// Build configuration using builder pattern.
    pub fn builder() -> SidecarConfigBuilder {
        SidecarConfigBuilder::default()
    }
}

/// Resolve `path` against the current directory without touching the filesystem.
pub fn absolutize(path: &Path) -> SidecarResult<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Builder for SidecarConfig.
#[derive(Default)]
pub struct SidecarConfigBuilder {
    config: SidecarConfig,
}

impl SidecarConfigBuilder {
    /// Set the library root.
    pub fn library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.library_path = path.into();
        self
    }

    /// Enable resource persistence at the given SQLite path.
    pub fn database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.database_path = Some(path.into());
        self
    }

    /// Set the default log level.
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.log_level = level.into();
        self
    }

    /// Disable a built-in plugin.
    pub fn disable_plugin(mut self, name: impl Into<String>) -> Self {
        self.config.disabled_plugins.push(name.into());
        self
    }

    /// Build the configuration.
    pub fn build(self) -> SidecarConfig {
        self.config
    }
}
