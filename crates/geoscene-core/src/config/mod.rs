//! Application configuration with layered loading.
//!
//! Configuration is loaded in this order (later overrides earlier):
//!
//! 1. **Compiled defaults**: hardcoded in struct `Default` implementations
//! 2. **Config file**: TOML file specified by `GEOSCENE_CONFIG` env var
//! 3. **Environment variables**: `GEOSCENE__*` vars override specific fields
//!
//! Invalid configurations (zero ports, unknown logging formats, missing
//! assembler endpoint) are rejected by [`AppConfig::validate`] at startup
//! rather than failing later mid-request.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::{path::Path, path::PathBuf, time::Duration};

/// HTTP server configuration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// IP address to bind the server to. Defaults to `127.0.0.1`.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Port number to listen on. Must be greater than 0. Defaults to `4040`.
    #[serde(default = "default_bind_port")]
    pub bind_port: u16,

    /// Maximum number of concurrent requests. Defaults to `100`.
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,

    /// Request body size limit in bytes. Defaults to `65536`.
    #[serde(default = "default_body_limit_bytes")]
    pub body_limit_bytes: usize,
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_bind_port() -> u16 {
    4040
}

fn default_max_concurrent_requests() -> usize {
    100
}

fn default_body_limit_bytes() -> usize {
    65536
}

/// Cache store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Root directory for the persistent store. Defaults to `cache`.
    #[serde(default = "default_cache_directory")]
    pub directory: PathBuf,
}

fn default_cache_directory() -> PathBuf {
    PathBuf::from("cache")
}

/// Provider catalog configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Path to the TOML provider catalog listing models and their
    /// conversion-parameter files. Defaults to `config/providers.toml`.
    #[serde(default = "default_providers_file")]
    pub providers_file: PathBuf,
}

fn default_providers_file() -> PathBuf {
    PathBuf::from("config/providers.toml")
}

/// Upstream feature-listing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingConfig {
    /// Maximum number of records fetched per listing call. Defaults to `10000`.
    #[serde(default = "default_max_records")]
    pub max_records: usize,

    /// Hard timeout for a listing call in seconds. Defaults to `30`.
    #[serde(default = "default_listing_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_max_records() -> usize {
    10000
}

fn default_listing_timeout_seconds() -> u64 {
    30
}

/// Scene assembler endpoint configuration.
///
/// The assembler is the external collaborator producing the raw two-part
/// scene payload for one borehole record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssemblerConfig {
    /// HTTP endpoint of the scene assembler.
    #[serde(default = "default_assembler_url")]
    pub url: String,

    /// Timeout for one assembly call in seconds. Defaults to `60`.
    #[serde(default = "default_assembler_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_assembler_url() -> String {
    "http://127.0.0.1:8610/assemble".to_string()
}

fn default_assembler_timeout_seconds() -> u64 {
    60
}

/// Feature-attribute store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributesConfig {
    /// `SQLite` database URL for borehole attributes.
    /// Defaults to `sqlite://./db/attributes.db`.
    #[serde(default = "default_attributes_database_url")]
    pub database_url: String,
}

fn default_attributes_database_url() -> String {
    "sqlite://./db/attributes.db".to_string()
}

/// Application logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (e.g., "trace", "debug", "info", "warn", "error"). Defaults to `"info"`.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: `"json"` or `"pretty"`. Defaults to `"pretty"`.
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

/// Root application configuration containing all subsystem settings.
///
/// Loaded from TOML with `GEOSCENE__`-prefixed environment overrides using
/// `__` as the nesting separator (e.g. `GEOSCENE__SERVER__BIND_PORT=8080`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Deployment environment (e.g., "development", "production").
    #[serde(default = "default_environment")]
    pub environment: String,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub catalog: CatalogConfig,

    #[serde(default)]
    pub listing: ListingConfig,

    #[serde(default)]
    pub assembler: AssemblerConfig,

    #[serde(default)]
    pub attributes: AttributesConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_environment() -> String {
    "development".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            bind_port: default_bind_port(),
            max_concurrent_requests: default_max_concurrent_requests(),
            body_limit_bytes: default_body_limit_bytes(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { directory: default_cache_directory() }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self { providers_file: default_providers_file() }
    }
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            max_records: default_max_records(),
            timeout_seconds: default_listing_timeout_seconds(),
        }
    }
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self { url: default_assembler_url(), timeout_seconds: default_assembler_timeout_seconds() }
    }
}

impl Default for AttributesConfig {
    fn default() -> Self {
        Self { database_url: default_attributes_database_url() }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), format: default_log_format() }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            server: ServerConfig::default(),
            cache: CacheConfig::default(),
            catalog: CatalogConfig::default(),
            listing: ListingConfig::default(),
            assembler: AssemblerConfig::default(),
            attributes: AttributesConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file with environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read, parsed, or
    /// deserialized. A missing file is not an error; defaults apply.
    pub fn from_file<P: AsRef<Path>>(config_path: P) -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::with_name(&config_path.as_ref().to_string_lossy()).required(false))
            .add_source(Environment::with_prefix("GEOSCENE").separator("__"));

        let loaded: AppConfig = builder.build()?.try_deserialize()?;
        Ok(loaded)
    }

    /// Loads configuration from `config/config.toml` with fallback to defaults.
    ///
    /// The config file path can be overridden with the `GEOSCENE_CONFIG`
    /// environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration cannot be loaded.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("GEOSCENE_CONFIG").unwrap_or_else(|_| "config/config.toml".to_string());
        Self::from_file(&config_path)
    }

    /// Hard timeout for one upstream listing call.
    #[must_use]
    pub fn listing_timeout(&self) -> Duration {
        Duration::from_secs(self.listing.timeout_seconds)
    }

    /// Timeout for one scene assembly call.
    #[must_use]
    pub fn assembler_timeout(&self) -> Duration {
        Duration::from_secs(self.assembler.timeout_seconds)
    }

    /// Returns the parsed socket address for the HTTP server.
    ///
    /// # Errors
    ///
    /// Returns an error string if the address cannot be parsed.
    pub fn socket_addr(&self) -> Result<std::net::SocketAddr, String> {
        format!("{}:{}", self.server.bind_address, self.server.bind_port).parse().map_err(|_| {
            format!("Invalid socket address: {}:{}", self.server.bind_address, self.server.bind_port)
        })
    }

    /// Validates the configuration for correctness and consistency.
    ///
    /// # Errors
    ///
    /// Returns a descriptive error string if validation fails.
    pub fn validate(&self) -> Result<(), String> {
        if self.server.bind_port == 0 {
            return Err("Bind port must be greater than 0".to_string());
        }
        if self.server.max_concurrent_requests == 0 {
            return Err("Max concurrent requests must be greater than 0".to_string());
        }
        if self.listing.max_records == 0 {
            return Err("Listing max_records must be greater than 0".to_string());
        }
        if self.listing.timeout_seconds == 0 {
            return Err("Listing timeout must be greater than 0".to_string());
        }
        if !self.assembler.url.starts_with("http") {
            return Err(format!("Invalid assembler URL: {}", self.assembler.url));
        }
        if self.attributes.database_url.is_empty() {
            return Err("Attributes database URL must not be empty".to_string());
        }
        if !["json", "pretty"].contains(&self.logging.format.as_str()) {
            return Err("Logging format must be 'json' or 'pretty'".to_string());
        }
        Ok(())
    }
}
