use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{Result, TypeLensError};

/// Name of the configuration file.
pub const CONFIG_FILENAME: &str = "config.json";

/// Directory under the user's config dir holding TypeLens settings.
pub const TYPELENS_DIR: &str = "typelens";

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[allow(clippy::should_implement_trait)]
impl LogFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "pretty" | "human" => Some(Self::Pretty),
            _ => None,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Level for the `typelens` target (trace, debug, info, warn, error).
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Configuration for a TypeLens server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Schema version of the configuration.
    pub version: u32,
    /// Interface the HTTP transport binds to.
    pub host: String,
    /// Port the HTTP transport binds to; `0` picks an ephemeral port.
    pub port: u16,
    /// Name reported by `/health` and `initialize`.
    pub service_name: String,
    /// Path of the metadata catalog; an empty catalog is served when unset.
    pub catalog_path: Option<String>,
    /// Page size used when a request carries no cursor.
    pub default_page_size: usize,
    /// Depth bound for path searches when the caller gives none.
    pub default_max_depth: usize,
    pub logging: LoggingConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            version: 1,
            host: "127.0.0.1".to_string(),
            port: 8765,
            service_name: "typelens".to_string(),
            catalog_path: None,
            default_page_size: 50,
            default_max_depth: 5,
            logging: LoggingConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Checks values that would make the server misbehave at runtime.
    pub fn validate(&self) -> Result<()> {
        if self.default_page_size == 0 {
            return Err(TypeLensError::Config {
                message: "default_page_size must be positive".to_string(),
            });
        }
        if self.service_name.trim().is_empty() {
            return Err(TypeLensError::Config {
                message: "service_name must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// The `host:port` string the HTTP transport binds to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Returns the default configuration file location,
/// `<config dir>/typelens/config.json`.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(TYPELENS_DIR)
        .join(CONFIG_FILENAME)
}

/// Loads the configuration from disk.
///
/// If the file does not exist, returns the default configuration.
pub fn load_config(path: &Path) -> Result<ServerConfig> {
    if !path.exists() {
        return Ok(ServerConfig::default());
    }

    let contents = fs::read_to_string(path).map_err(|e| TypeLensError::Config {
        message: format!("failed to read config file '{}': {}", path.display(), e),
    })?;

    let config: ServerConfig =
        serde_json::from_str(&contents).map_err(|e| TypeLensError::Config {
            message: format!("failed to parse config file '{}': {}", path.display(), e),
        })?;

    config.validate()?;
    Ok(config)
}

/// Saves the configuration to disk using an atomic write.
///
/// Writes to a temporary file first and then renames it to the final location,
/// ensuring that a partial write never corrupts the configuration.
pub fn save_config(path: &Path, config: &ServerConfig) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| TypeLensError::Config {
            message: format!(
                "failed to create config directory '{}': {}",
                parent.display(),
                e
            ),
        })?;
    }

    let tmp_path = path.with_extension("tmp");

    let json = serde_json::to_string_pretty(config).map_err(|e| TypeLensError::Config {
        message: format!("failed to serialize config: {}", e),
    })?;

    fs::write(&tmp_path, &json).map_err(|e| TypeLensError::Config {
        message: format!(
            "failed to write temporary config file '{}': {}",
            tmp_path.display(),
            e
        ),
    })?;

    fs::rename(&tmp_path, path).map_err(|e| TypeLensError::Config {
        message: format!(
            "failed to rename temporary config file '{}' to '{}': {}",
            tmp_path.display(),
            path.display(),
            e
        ),
    })?;

    Ok(())
}
