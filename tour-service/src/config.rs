//! Configuration management using Figment
//!
//! Configuration is loaded from multiple sources with the following precedence (highest to lowest):
//! 1. Environment variables (prefix: TOURS_, nested keys split on `__`)
//! 2. Current working directory: ./config.toml
//! 3. XDG config directory: ~/.config/tour-service/{service_name}/config.toml
//! 4. System directory: /etc/tour-service/{service_name}/config.toml
//! 5. Default values

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;

/// Placeholder in `database.url` replaced by `database.password`
pub const PASSWORD_PLACEHOLDER: &str = "<PASSWORD>";

const ENV_PREFIX: &str = "TOURS_";
const CONFIG_PREFIX: &str = "tour-service";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Service configuration
    pub service: ServiceConfig,

    /// Document store configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Middleware configuration
    #[serde(default)]
    pub middleware: MiddlewareConfig,

    /// List endpoint behaviour
    #[serde(default)]
    pub features: FeaturesConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Service name
    pub name: String,

    /// HTTP port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Log level
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
    /// Request timeout as a `Duration`
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

/// Document store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Connection URL, may contain `<PASSWORD>`
    #[serde(default = "default_database_url")]
    pub url: String,

    /// Substituted into `url` at startup
    #[serde(default)]
    pub password: Option<String>,

    /// Database name used in log output
    #[serde(default = "default_database_name")]
    pub name: String,
}

impl DatabaseConfig {
    /// URL with the password placeholder filled in
    ///
    /// A URL without the placeholder is returned unchanged. A missing
    /// password leaves the placeholder in place so the store rejects it.
    pub fn connection_string(&self) -> String {
        match &self.password {
            Some(password) => self.url.replace(PASSWORD_PLACEHOLDER, password),
            None => self.url.clone(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            password: None,
            name: default_database_name(),
        }
    }
}

/// Middleware configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MiddlewareConfig {
    /// Maximum request body size in megabytes
    #[serde(default = "default_body_limit_mb")]
    pub body_limit_mb: usize,

    /// CORS mode: "permissive", "restrictive" or "disabled"
    #[serde(default = "default_cors_mode")]
    pub cors_mode: String,

    /// Enable response compression
    #[serde(default = "default_true")]
    pub compression: bool,

    /// Enable panic recovery
    #[serde(default = "default_true")]
    pub catch_panic: bool,
}

impl MiddlewareConfig {
    pub fn body_limit_bytes(&self) -> usize {
        self.body_limit_mb * 1024 * 1024
    }
}

impl Default for MiddlewareConfig {
    fn default() -> Self {
        Self {
            body_limit_mb: default_body_limit_mb(),
            cors_mode: default_cors_mode(),
            compression: default_true(),
            catch_panic: default_true(),
        }
    }
}

/// List endpoint behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeaturesConfig {
    /// Page size when the request has no `limit`
    #[serde(default = "default_page_size")]
    pub default_page_size: u64,

    /// Answer 404 when an explicit page lies past the last document
    #[serde(default = "default_true")]
    pub reject_out_of_range_pages: bool,
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            reject_out_of_range_pages: default_true(),
        }
    }
}

// Default value functions
fn default_port() -> u16 {
    3000
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

fn default_database_url() -> String {
    "memory://natours".to_string()
}

fn default_database_name() -> String {
    "natours".to_string()
}

fn default_body_limit_mb() -> usize {
    1
}

fn default_cors_mode() -> String {
    "permissive".to_string()
}

fn default_page_size() -> u64 {
    crate::features::DEFAULT_LIMIT
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from all sources
    ///
    /// The service name is inferred from the binary name.
    pub fn load() -> Result<Self> {
        let service_name = std::env::current_exe()
            .ok()
            .and_then(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .unwrap_or_else(|| CONFIG_PREFIX.to_string());

        Self::load_for_service(&service_name)
    }

    /// Load configuration for a specific service name
    pub fn load_for_service(service_name: &str) -> Result<Self> {
        let config_paths = Self::find_config_paths(service_name);

        tracing::debug!("Searching for config files in order:");
        for path in &config_paths {
            tracing::debug!("  - {}", path.display());
        }

        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        // Lowest priority first so later merges win
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
    /// Bypasses the search path. Environment variables still override the file.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;

        Ok(config)
    }

    /// Config file locations, highest priority first
    fn find_config_paths(service_name: &str) -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        let xdg_dirs = xdg::BaseDirectories::with_prefix(CONFIG_PREFIX);
        let config_file_path = Path::new(service_name).join("config.toml");
        if let Ok(path) = xdg_dirs.place_config_file(&config_file_path) {
            paths.push(path);
        }

        paths.push(
            PathBuf::from("/etc")
                .join(CONFIG_PREFIX)
                .join(service_name)
                .join("config.toml"),
        );

        paths
    }

    /// Socket address the server binds to
    pub fn bind_address(&self) -> String {
        format!("0.0.0.0:{}", self.service.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                name: CONFIG_PREFIX.to_string(),
                port: default_port(),
                log_level: default_log_level(),
                timeout_secs: default_timeout(),
                environment: default_environment(),
            },
            database: DatabaseConfig::default(),
            middleware: MiddlewareConfig::default(),
            features: FeaturesConfig::default(),
        }
    }
}
