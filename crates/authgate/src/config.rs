//! Configuration loading

use anyhow::{Context, Result};
use authgate_auth::{DEFAULT_TOKEN_TTL_MINUTES, HashCost};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Signing secret used when none is configured
pub const DEFAULT_JWT_SECRET: &str = "change-me-in-production";

/// Upper bound for minute-valued settings (one year)
pub const MAX_MINUTES: i64 = 525_600;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Token and hashing configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    #[serde(default = "default_token_ttl_minutes")]
    pub token_ttl_minutes: i64,
    /// Argon2 memory cost in KiB
    #[serde(default = "default_argon2_memory_kib")]
    pub argon2_memory_kib: u32,
    #[serde(default = "default_argon2_iterations")]
    pub argon2_iterations: u32,
    #[serde(default = "default_argon2_parallelism")]
    pub argon2_parallelism: u32,
    /// How often expired revocation entries are deleted; 0 disables the task
    #[serde(default = "default_purge_interval_minutes")]
    pub revocation_purge_interval_minutes: u64,
}

impl AuthConfig {
    pub fn hash_cost(&self) -> HashCost {
        HashCost {
            memory_kib: self.argon2_memory_kib,
            iterations: self.argon2_iterations,
            parallelism: self.argon2_parallelism,
        }
    }

    pub fn uses_default_secret(&self) -> bool {
        self.jwt_secret == DEFAULT_JWT_SECRET
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            token_ttl_minutes: default_token_ttl_minutes(),
            argon2_memory_kib: default_argon2_memory_kib(),
            argon2_iterations: default_argon2_iterations(),
            argon2_parallelism: default_argon2_parallelism(),
            revocation_purge_interval_minutes: default_purge_interval_minutes(),
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("token_ttl_minutes", &self.token_ttl_minutes)
            .field("hash_cost", &self.hash_cost())
            .field(
                "revocation_purge_interval_minutes",
                &self.revocation_purge_interval_minutes,
            )
            .finish()
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// "pretty" or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Metrics configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
        }
    }
}

// Default value functions
fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_db_path() -> String {
    "./data/authgate.db".to_string()
}

fn default_jwt_secret() -> String {
    DEFAULT_JWT_SECRET.to_string()
}

fn default_token_ttl_minutes() -> i64 {
    DEFAULT_TOKEN_TTL_MINUTES
}

fn default_argon2_memory_kib() -> u32 {
    HashCost::default().memory_kib
}

fn default_argon2_iterations() -> u32 {
    HashCost::default().iterations
}

fn default_argon2_parallelism() -> u32 {
    HashCost::default().parallelism
}

fn default_purge_interval_minutes() -> u64 {
    60
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_metrics_enabled() -> bool {
    true
}

impl Config {
    /// Load configuration from a TOML file; a missing file yields defaults
    pub fn load(path: &str) -> Result<Self> {
        let config_path = Path::new(path);

        if !config_path.exists() {
            info!("Config file not found at {}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config = Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path))?;

        info!("Loaded configuration from {}", path);
        Ok(config)
    }

    fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        let auth = &config.auth;
        if auth.token_ttl_minutes <= 0 || auth.token_ttl_minutes > MAX_MINUTES {
            anyhow::bail!(
                "auth.token_ttl_minutes must be between 1 and {}, got {}",
                MAX_MINUTES,
                auth.token_ttl_minutes
            );
        }
        if auth.revocation_purge_interval_minutes > MAX_MINUTES as u64 {
            anyhow::bail!(
                "auth.revocation_purge_interval_minutes must be at most {}, got {}",
                MAX_MINUTES,
                auth.revocation_purge_interval_minutes
            );
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();

        assert_eq!(config.server.port, 8000);
        assert_eq!(config.auth.token_ttl_minutes, 30);
        assert_eq!(config.auth.revocation_purge_interval_minutes, 60);
        assert_eq!(config.auth.hash_cost(), HashCost::default());
        assert!(config.auth.uses_default_secret());
        assert!(config.metrics.enabled);
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = Config::parse(
            r#"
            [server]
            port = 9100

            [auth]
            jwt_secret = "from-file"
            argon2_memory_kib = 8192

            [logging]
            format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.bind_address, "0.0.0.0");
        assert_eq!(config.auth.jwt_secret, "from-file");
        assert!(!config.auth.uses_default_secret());
        assert_eq!(config.auth.hash_cost().memory_kib, 8192);
        assert_eq!(config.auth.token_ttl_minutes, 30);
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.database.path, "./data/authgate.db");
    }

    #[test]
    fn test_rejects_non_positive_ttl() {
        assert!(Config::parse("[auth]\ntoken_ttl_minutes = 0\n").is_err());
    }

    #[test]
    fn test_rejects_out_of_range_minutes() {
        assert!(Config::parse("[auth]\ntoken_ttl_minutes = 153722867280912930\n").is_err());
        assert!(Config::parse("[auth]\nrevocation_purge_interval_minutes = 307445734561825861\n").is_err());

        let config = Config::parse(
            "[auth]\ntoken_ttl_minutes = 525600\nrevocation_purge_interval_minutes = 0\n",
        )
        .unwrap();
        assert_eq!(config.auth.token_ttl_minutes, MAX_MINUTES);
        assert_eq!(config.auth.revocation_purge_interval_minutes, 0);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");

        let config = Config::load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.server.port, default_port());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[database]\npath = \"/tmp/auth.db\"").unwrap();

        let config = Config::load(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.database.path, "/tmp/auth.db");
    }

    #[test]
    fn test_debug_hides_secret() {
        let mut config = Config::default();
        config.auth.jwt_secret = "super-secret".to_string();
        assert!(!format!("{:?}", config).contains("super-secret"));
    }
}
