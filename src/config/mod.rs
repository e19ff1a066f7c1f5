//! Configuration management
//!
//! This module handles loading and parsing configuration for Vitrine.
//! Configuration can be loaded from:
//! - config.yml file
//! - Environment variables (override file settings)
//!
//! Missing optional values are filled with sensible defaults.

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Upload limits
    #[serde(default)]
    pub upload: UploadConfig,
    /// Remote asset host
    #[serde(default)]
    pub asset_host: AssetHostConfig,
    /// Media dialog sessions
    #[serde(default)]
    pub media_dialog: MediaDialogConfig,
    /// Login sessions
    #[serde(default)]
    pub session: SessionConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origin (for cookie-based auth)
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cors_origin() -> String {
    "http://localhost:3000".to_string()
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite connection URL or file path
    #[serde(default = "default_database_url")]
    pub url: String,
    /// Upper bound on pooled connections for file databases
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// How long a writer waits on a locked database before failing
    #[serde(default = "default_busy_timeout_secs")]
    pub busy_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
            busy_timeout_secs: default_busy_timeout_secs(),
        }
    }
}

fn default_database_url() -> String {
    "data/vitrine.db".to_string()
}

fn default_max_connections() -> u32 {
    8
}

fn default_busy_timeout_secs() -> u64 {
    5
}

/// Upload configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Maximum image size in bytes (default: 10MB)
    #[serde(default = "default_max_image_size")]
    pub max_image_size: u64,
    /// Maximum video size in bytes (default: 100MB)
    #[serde(default = "default_max_video_size")]
    pub max_video_size: u64,
    /// Allowed MIME types
    #[serde(default = "default_allowed_types")]
    pub allowed_types: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_image_size: default_max_image_size(),
            max_video_size: default_max_video_size(),
            allowed_types: default_allowed_types(),
        }
    }
}

fn default_max_image_size() -> u64 {
    10 * 1024 * 1024 // 10MB
}

fn default_max_video_size() -> u64 {
    100 * 1024 * 1024 // 100MB
}

fn default_allowed_types() -> Vec<String> {
    vec![
        "image/jpeg".to_string(),
        "image/png".to_string(),
        "image/gif".to_string(),
        "image/webp".to_string(),
        "video/mp4".to_string(),
        "video/webm".to_string(),
        "video/quicktime".to_string(),
    ]
}

impl UploadConfig {
    /// Check if a MIME type is allowed
    pub fn is_type_allowed(&self, mime_type: &str) -> bool {
        self.allowed_types.iter().any(|t| t == mime_type)
    }

    /// Size limit for a MIME type; videos get the larger limit
    pub fn limit_for(&self, mime_type: &str) -> u64 {
        if mime_type.starts_with("video/") {
            self.max_video_size
        } else {
            self.max_image_size
        }
    }
}

/// Asset host driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AssetHostDriver {
    /// Cloudinary (default)
    #[default]
    Cloudinary,
    /// Process-local store, for development and tests
    Memory,
}

/// Remote asset host configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetHostConfig {
    #[serde(default)]
    pub driver: AssetHostDriver,
    #[serde(default)]
    pub cloud_name: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub api_secret: String,
    /// Folder new uploads land in
    #[serde(default = "default_folder")]
    pub folder: String,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for AssetHostConfig {
    fn default() -> Self {
        Self {
            driver: AssetHostDriver::default(),
            cloud_name: String::new(),
            api_key: String::new(),
            api_secret: String::new(),
            folder: default_folder(),
            api_base_url: default_api_base_url(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_folder() -> String {
    "vitrine".to_string()
}

fn default_api_base_url() -> String {
    "https://api.cloudinary.com/v1_1".to_string()
}

fn default_timeout() -> u64 {
    60
}

/// Media dialog configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaDialogConfig {
    /// Idle lifetime of a dialog session in seconds
    #[serde(default = "default_dialog_ttl")]
    pub ttl_seconds: u64,
    /// Assets requested per "load more"
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Upper bound for page sizes requested by clients
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,
}

impl Default for MediaDialogConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_dialog_ttl(),
            page_size: default_page_size(),
            max_page_size: default_max_page_size(),
        }
    }
}

fn default_dialog_ttl() -> u64 {
    1800
}

fn default_page_size() -> u32 {
    30
}

fn default_max_page_size() -> u32 {
    100
}

/// Login session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_expiration_days")]
    pub expiration_days: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            expiration_days: default_expiration_days(),
        }
    }
}

fn default_expiration_days() -> i64 {
    7
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError {
        path: String,
        message: String,
    },
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

impl Config {
    /// Load configuration from file
    ///
    /// If the file doesn't exist, returns default configuration.
    /// If the file exists but is invalid YAML, returns an error with details.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(&content).map_err(|e| {
            ConfigError::ParseError {
                path: path.display().to_string(),
                message: format_yaml_error(&e),
            }
        })?;

        Ok(config)
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Environment variables follow the pattern:
    /// - VITRINE_SERVER_HOST
    /// - VITRINE_SERVER_PORT
    /// - VITRINE_SERVER_CORS_ORIGIN
    /// - VITRINE_DATABASE_URL
    /// - VITRINE_DATABASE_MAX_CONNECTIONS
    /// - VITRINE_ASSET_HOST_DRIVER
    /// - VITRINE_ASSET_HOST_CLOUD_NAME
    /// - VITRINE_ASSET_HOST_API_KEY
    /// - VITRINE_ASSET_HOST_API_SECRET
    /// - VITRINE_ASSET_HOST_FOLDER
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration
    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("VITRINE_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("VITRINE_SERVER_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.server.port = port;
            }
        }
        if let Ok(cors_origin) = std::env::var("VITRINE_SERVER_CORS_ORIGIN") {
            self.server.cors_origin = cors_origin;
        }

        if let Ok(url) = std::env::var("VITRINE_DATABASE_URL") {
            self.database.url = url;
        }
        if let Ok(max) = std::env::var("VITRINE_DATABASE_MAX_CONNECTIONS") {
            if let Ok(max) = max.parse::<u32>() {
                self.database.max_connections = max.max(1);
            }
        }

        if let Ok(driver) = std::env::var("VITRINE_ASSET_HOST_DRIVER") {
            match driver.to_lowercase().as_str() {
                "cloudinary" => self.asset_host.driver = AssetHostDriver::Cloudinary,
                "memory" => self.asset_host.driver = AssetHostDriver::Memory,
                _ => {} // Ignore invalid values
            }
        }
        if let Ok(cloud_name) = std::env::var("VITRINE_ASSET_HOST_CLOUD_NAME") {
            self.asset_host.cloud_name = cloud_name;
        }
        if let Ok(api_key) = std::env::var("VITRINE_ASSET_HOST_API_KEY") {
            self.asset_host.api_key = api_key;
        }
        if let Ok(api_secret) = std::env::var("VITRINE_ASSET_HOST_API_SECRET") {
            self.asset_host.api_secret = api_secret;
        }
        if let Ok(folder) = std::env::var("VITRINE_ASSET_HOST_FOLDER") {
            self.asset_host.folder = folder;
        }
    }

    /// Reject combinations that cannot work at runtime
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.asset_host.driver == AssetHostDriver::Cloudinary {
            let host = &self.asset_host;
            if host.cloud_name.is_empty() || host.api_key.is_empty() || host.api_secret.is_empty() {
                return Err(ConfigError::ValidationError(
                    "asset_host.cloud_name, api_key and api_secret are required for the cloudinary driver"
                        .to_string(),
                ));
            }
        }
        if self.media_dialog.page_size == 0 || self.media_dialog.page_size > self.media_dialog.max_page_size {
            return Err(ConfigError::ValidationError(
                "media_dialog.page_size must be between 1 and max_page_size".to_string(),
            ));
        }
        Ok(())
    }
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const ENV_VARS: &[&str] = &[
        "VITRINE_SERVER_HOST",
        "VITRINE_SERVER_PORT",
        "VITRINE_SERVER_CORS_ORIGIN",
        "VITRINE_DATABASE_URL",
        "VITRINE_DATABASE_MAX_CONNECTIONS",
        "VITRINE_ASSET_HOST_DRIVER",
        "VITRINE_ASSET_HOST_CLOUD_NAME",
        "VITRINE_ASSET_HOST_API_KEY",
        "VITRINE_ASSET_HOST_API_SECRET",
        "VITRINE_ASSET_HOST_FOLDER",
    ];

    fn lock_env() -> std::sync::MutexGuard<'static, ()> {
        let guard = super::CONFIG_ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        for var in ENV_VARS {
            std::env::remove_var(var);
        }
        guard
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let path = std::path::Path::new("nonexistent_config.yml");
        let config = Config::load(path).unwrap();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.url, "data/vitrine.db");
        assert_eq!(config.asset_host.driver, AssetHostDriver::Cloudinary);
        assert_eq!(config.asset_host.folder, "vitrine");
        assert_eq!(config.media_dialog.page_size, 30);
        assert_eq!(config.upload.max_image_size, 10 * 1024 * 1024);
    }

    #[test]
    fn test_load_empty_file_returns_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_load_partial_config_fills_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "asset_host:\n  driver: memory\nmedia_dialog:\n  page_size: 12\n").unwrap();

        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.asset_host.driver, AssetHostDriver::Memory);
        assert_eq!(config.media_dialog.page_size, 12);
        assert_eq!(config.media_dialog.ttl_seconds, 1800);
        assert_eq!(config.server.host, "0.0.0.0");
    }

    #[test]
    fn test_load_invalid_yaml_returns_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "server:\n  port: not_a_number\n").unwrap();

        let err = Config::load(file.path()).unwrap_err().to_string();
        assert!(err.contains("parse"));
    }

    #[test]
    fn test_validate_requires_cloudinary_credentials() {
        let config = Config::default();
        assert!(matches!(config.validate(), Err(ConfigError::ValidationError(_))));

        let mut config = Config::default();
        config.asset_host.driver = AssetHostDriver::Memory;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_oversized_page() {
        let mut config = Config::default();
        config.asset_host.driver = AssetHostDriver::Memory;
        config.media_dialog.page_size = 500;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_upload_limits_by_type() {
        let upload = UploadConfig::default();
        assert_eq!(upload.limit_for("image/png"), upload.max_image_size);
        assert_eq!(upload.limit_for("video/mp4"), upload.max_video_size);
        assert!(upload.is_type_allowed("image/webp"));
        assert!(!upload.is_type_allowed("application/pdf"));
    }

    #[test]
    fn test_env_override_asset_host() {
        let _guard = lock_env();

        let mut file = NamedTempFile::new().unwrap();
        write!(file, "server:\n  port: 8080\n").unwrap();

        std::env::set_var("VITRINE_ASSET_HOST_CLOUD_NAME", "demo");
        std::env::set_var("VITRINE_ASSET_HOST_API_KEY", "key");
        std::env::set_var("VITRINE_ASSET_HOST_API_SECRET", "secret");
        std::env::set_var("VITRINE_SERVER_PORT", "4000");

        let config = Config::load_with_env(file.path()).unwrap();

        assert_eq!(config.asset_host.cloud_name, "demo");
        assert_eq!(config.asset_host.api_secret, "secret");
        assert_eq!(config.server.port, 4000);

        for var in ENV_VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn test_env_override_invalid_values_ignored() {
        let _guard = lock_env();

        let mut file = NamedTempFile::new().unwrap();
        write!(file, "server:\n  port: 9000\nasset_host:\n  driver: memory\n").unwrap();

        std::env::set_var("VITRINE_SERVER_PORT", "not_a_number");
        std::env::set_var("VITRINE_ASSET_HOST_DRIVER", "s3");

        let config = Config::load_with_env(file.path()).unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.asset_host.driver, AssetHostDriver::Memory);

        for var in ENV_VARS {
            std::env::remove_var(var);
        }
    }
}
