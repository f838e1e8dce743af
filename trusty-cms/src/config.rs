//! Configuration management using Figment
//!
//! Configuration is loaded from multiple sources with the following precedence (highest to lowest):
//! 1. Environment variables (prefix: TRUSTY_, nested keys separated by `__`)
//! 2. Current working directory: ./config.toml
//! 3. XDG config directory: ~/.config/trusty-cms/config.toml
//! 4. System directory: /etc/trusty-cms/config.toml
//! 5. Default values
//!
//! ```toml
//! [service]
//! port = 5000
//! environment = "production"
//!
//! [store]
//! data_dir = "/var/lib/trusty-cms"
//!
//! [media]
//! backend = "cloudinary"
//!
//! [media.cloudinary]
//! cloud_name = "trusty"
//! api_key = "..."
//! api_secret = "..."
//! ```

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::Result;

const APP_NAME: &str = "trusty-cms";
const ENV_PREFIX: &str = "TRUSTY_";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Service configuration
    pub service: ServiceConfig,

    /// Middleware configuration
    #[serde(default)]
    pub middleware: MiddlewareConfig,

    /// Document store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Media storage configuration
    #[serde(default)]
    pub media: MediaConfig,

    /// Outbound mail configuration (optional)
    #[serde(default)]
    pub mail: Option<MailConfig>,

    /// List endpoint defaults
    #[serde(default)]
    pub listing: ListingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Service name
    pub name: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Environment (development, staging, production)
    #[serde(default = "default_environment")]
    pub environment: String,
}

impl ServiceConfig {
    /// Production hides error detail and switches logs to JSON
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// Request timeout as a duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Middleware configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MiddlewareConfig {
    /// Request body size limit in MB
    #[serde(default = "default_body_limit_mb")]
    pub body_limit_mb: usize,

    /// Enable panic recovery middleware
    #[serde(default = "default_true")]
    pub catch_panic: bool,

    /// Enable compression
    #[serde(default = "default_true")]
    pub compression: bool,

    /// CORS configuration (permissive, restrictive, disabled)
    #[serde(default = "default_cors_mode")]
    pub cors_mode: String,

    /// Request ID header name
    #[serde(default = "default_request_id_header")]
    pub request_id_header: String,
}

impl Default for MiddlewareConfig {
    fn default() -> Self {
        Self {
            body_limit_mb: default_body_limit_mb(),
            catch_panic: true,
            compression: true,
            cors_mode: default_cors_mode(),
            request_id_header: default_request_id_header(),
        }
    }
}

impl MiddlewareConfig {
    /// Body limit in bytes
    pub fn body_limit_bytes(&self) -> usize {
        self.body_limit_mb.saturating_mul(1024 * 1024)
    }
}

/// Document store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory holding one JSON snapshot per collection
    ///
    /// When absent the store lives purely in memory.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

/// Where uploaded files end up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaBackend {
    /// Files are written under `upload_dir` and served from `public_path`
    #[default]
    Local,
    /// Files are pushed to the Cloudinary upload API
    Cloudinary,
}

/// Media storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Storage backend
    #[serde(default)]
    pub backend: MediaBackend,

    /// Local upload directory
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,

    /// URL prefix under which local uploads are served
    #[serde(default = "default_public_path")]
    pub public_path: String,

    /// Largest accepted upload in MB
    #[serde(default = "default_max_file_size_mb")]
    pub max_file_size_mb: usize,

    /// Cloudinary credentials (required for the cloudinary backend)
    #[serde(default)]
    pub cloudinary: Option<CloudinaryConfig>,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            backend: MediaBackend::default(),
            upload_dir: default_upload_dir(),
            public_path: default_public_path(),
            max_file_size_mb: default_max_file_size_mb(),
            cloudinary: None,
        }
    }
}

impl MediaConfig {
    /// Largest accepted upload in bytes
    pub fn max_file_size_bytes(&self) -> usize {
        self.max_file_size_mb.saturating_mul(1024 * 1024)
    }
}

/// Cloudinary credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudinaryConfig {
    /// Cloud name
    pub cloud_name: String,

    /// API key
    pub api_key: String,

    /// API secret used to sign uploads
    pub api_secret: String,

    /// Upload API base URL
    #[serde(default = "default_cloudinary_api_base")]
    pub api_base: String,
}

/// SMTP configuration for contact notifications
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    /// SMTP relay host
    pub host: String,

    /// SMTP port (STARTTLS)
    #[serde(default = "default_mail_port")]
    pub port: u16,

    /// SMTP username
    pub username: String,

    /// SMTP password
    pub password: String,

    /// Display name on outgoing mail
    #[serde(default = "default_from_name")]
    pub from_name: String,

    /// Sender address
    pub from_address: String,

    /// Recipient of contact notifications
    pub notify_address: String,
}

/// List endpoint defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingConfig {
    /// Page size when `limit` is absent or unusable
    #[serde(default = "default_limit")]
    pub default_limit: u64,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
        }
    }
}

fn default_port() -> u16 {
    5000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_true() -> bool {
    true
}

fn default_body_limit_mb() -> usize {
    10
}

fn default_cors_mode() -> String {
    "permissive".to_string()
}

fn default_request_id_header() -> String {
    "x-request-id".to_string()
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_public_path() -> String {
    "/uploads".to_string()
}

fn default_max_file_size_mb() -> usize {
    10
}

fn default_cloudinary_api_base() -> String {
    "https://api.cloudinary.com/v1_1".to_string()
}

fn default_mail_port() -> u16 {
    587
}

fn default_from_name() -> String {
    "Trusty Group Website".to_string()
}

fn default_limit() -> u64 {
    10
}

impl Config {
    /// Load configuration from all sources
    ///
    /// Searches for config files in this order (first found wins):
    /// 1. Current working directory: ./config.toml
    /// 2. XDG config directory: ~/.config/trusty-cms/config.toml
    /// 3. System directory: /etc/trusty-cms/config.toml
    ///
    /// Environment variables (TRUSTY_ prefix) override all file-based configs.
    pub fn load() -> Result<Self> {
        let config_paths = Self::find_config_paths();

        tracing::debug!("Searching for config files in order:");
        for path in &config_paths {
            tracing::debug!("  - {}", path.display());
        }

        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        // lowest priority first so later merges win
        for path in config_paths.iter().rev() {
            if path.exists() {
                tracing::info!("Loading configuration from: {}", path.display());
                figment = figment.merge(Toml::file(path));
            }
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config = figment.extract()?;
        Ok(config)
    }

    /// Load configuration from a specific file
    ///
    /// Bypasses the search path. Environment variables still apply.
    pub fn load_from(path: &str) -> Result<Self> {
        let config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;

        Ok(config)
    }

    fn find_config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        let xdg_dirs = xdg::BaseDirectories::with_prefix(APP_NAME);
        if let Ok(path) = xdg_dirs.place_config_file("config.toml") {
            paths.push(path);
        }

        paths.push(PathBuf::from("/etc").join(APP_NAME).join("config.toml"));
        paths
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                name: APP_NAME.to_string(),
                port: default_port(),
                log_level: default_log_level(),
                timeout_secs: default_timeout(),
                environment: default_environment(),
            },
            middleware: MiddlewareConfig::default(),
            store: StoreConfig::default(),
            media: MediaConfig::default(),
            mail: None,
            listing: ListingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.service.port, 5000);
        assert_eq!(config.service.log_level, "info");
        assert_eq!(config.listing.default_limit, 10);
        assert_eq!(config.media.backend, MediaBackend::Local);
        assert_eq!(config.media.max_file_size_bytes(), 10 * 1024 * 1024);
        assert!(config.mail.is_none());
        assert!(!config.service.is_production());
    }

    #[test]
    fn test_file_and_env_layering() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "trusty.toml",
                r#"
                [service]
                name = "trusty-cms"
                port = 7000
                environment = "production"

                [media]
                backend = "cloudinary"

                [media.cloudinary]
                cloud_name = "demo"
                api_key = "key"
                api_secret = "secret"
                "#,
            )?;
            jail.set_env("TRUSTY_SERVICE__PORT", "7100");
            jail.set_env("TRUSTY_LISTING__DEFAULT_LIMIT", "25");

            let config = Config::load_from("trusty.toml").map_err(|e| e.to_string())?;
            assert_eq!(config.service.port, 7100);
            assert_eq!(config.listing.default_limit, 25);
            assert!(config.service.is_production());
            assert_eq!(config.media.backend, MediaBackend::Cloudinary);
            let cloudinary = config.media.cloudinary.expect("cloudinary section");
            assert_eq!(cloudinary.api_base, "https://api.cloudinary.com/v1_1");
            Ok(())
        });
    }
}
