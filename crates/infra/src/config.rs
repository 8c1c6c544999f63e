//! Layered application configuration.
//!
//! Sources, highest priority first:
//! 1. Environment variables (`SENIORCARE_*`, `__` separates sections, so
//!    `SENIORCARE_DATABASE__URL` sets `database.url`)
//! 2. `seniorcare.toml` in the working directory, when present
//! 3. Built-in defaults
//!
//! [`AppConfig::load_with_dotenv`] additionally reads a `.env` file first.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use seniorcare_observability::{LogFormat, LogSettings};

pub const ENV_PREFIX: &str = "SENIORCARE_";
pub const CONFIG_FILE: &str = "seniorcare.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    Figment(#[from] figment::Error),

    #[error("Configuration section '{section}' is not configured (missing required fields)")]
    NotConfigured { section: String },

    #[error("Invalid configuration value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

const fn default_max_connections() -> u32 {
    10
}

const fn default_run_migrations() -> bool {
    true
}

const fn default_max_login_attempts() -> u32 {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind_addr
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::InvalidValue {
                field: "server.bind_addr".into(),
                reason: e.to_string(),
            })
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Postgres URL; without one the process runs on the in-memory store.
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Create missing tables on startup.
    #[serde(default = "default_run_migrations")]
    pub run_migrations: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
            run_migrations: default_run_migrations(),
        }
    }
}

impl DatabaseConfig {
    pub fn is_configured(&self) -> bool {
        self.url.as_deref().is_some_and(|u| !u.trim().is_empty())
    }

    /// The configured URL, or `NotConfigured`.
    pub fn require_url(&self) -> Result<&str, ConfigError> {
        self.url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| ConfigError::NotConfigured {
                section: "database".into(),
            })
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// Consecutive failed logins before an account is disabled.
    #[serde(default = "default_max_login_attempts")]
    pub max_login_attempts: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            max_login_attempts: default_max_login_attempts(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// `json`, or `pretty` (alias `text`).
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

impl LogConfig {
    pub fn settings(&self) -> LogSettings {
        LogSettings {
            level: self.level.clone(),
            format: self.format,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub log: LogConfig,
}

impl AppConfig {
    /// Load from defaults, the optional TOML file and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        let config: Self = Self::figment().extract()?;
        config.validate()?;
        Ok(config)
    }

    /// [`AppConfig::load`] after reading `.env`, if one exists.
    pub fn load_with_dotenv() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::load()
    }

    pub fn figment() -> Figment {
        Self::figment_from(Path::new(CONFIG_FILE))
    }

    /// Provider chain reading the TOML layer from `path`.
    pub fn figment_from(path: &Path) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if path.exists() {
            figment = figment.merge(Toml::file(PathBuf::from(path)));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.socket_addr()?;
        if self.database.max_connections == 0 {
            return Err(ConfigError::InvalidValue {
                field: "database.max_connections".into(),
                reason: "must be at least 1".into(),
            });
        }
        if self.auth.max_login_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "auth.max_login_attempts".into(),
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn defaults() {
        let config: AppConfig = AppConfig::figment_from(Path::new("missing.toml"))
            .extract()
            .unwrap();
        assert_eq!(config.server.bind_addr, "0.0.0.0:8080");
        assert!(!config.database.is_configured());
        assert_eq!(config.database.max_connections, 10);
        assert!(config.database.run_migrations);
        assert_eq!(config.auth.max_login_attempts, 5);
        assert_eq!(config.log.format, LogFormat::Json);
        config.validate().unwrap();
    }

    #[test]
    fn env_overrides_toml() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "seniorcare.toml",
                r#"
                [server]
                bind_addr = "127.0.0.1:9000"

                [database]
                url = "postgres://toml/db"
                max_connections = 4
                "#,
            )?;
            jail.set_env("SENIORCARE_DATABASE__URL", "postgres://env/db");
            jail.set_env("SENIORCARE_AUTH__MAX_LOGIN_ATTEMPTS", "3");

            let config = AppConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config.server.bind_addr, "127.0.0.1:9000");
            assert_eq!(config.database.url.as_deref(), Some("postgres://env/db"));
            assert_eq!(config.database.max_connections, 4);
            assert_eq!(config.auth.max_login_attempts, 3);
            Ok(())
        });
    }

    #[test]
    fn invalid_bind_addr_rejected() {
        let mut config = AppConfig::default();
        config.server.bind_addr = "not an address".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field, .. }) if field == "server.bind_addr"
        ));
    }

    #[test]
    fn log_format_accepts_text_alias() {
        Jail::expect_with(|jail| {
            jail.set_env("SENIORCARE_LOG__FORMAT", "text");
            let config = AppConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config.log.format, LogFormat::Pretty);
            assert_eq!(config.log.settings().level, "info");
            Ok(())
        });
    }

    #[test]
    fn unknown_log_format_fails_extraction() {
        Jail::expect_with(|jail| {
            jail.create_file("seniorcare.toml", "[log]\nformat = \"xml\"\n")?;
            let err = AppConfig::load().unwrap_err();
            assert!(matches!(err, ConfigError::Figment(_)), "{err}");
            Ok(())
        });
    }

    #[test]
    fn blank_url_is_not_configured() {
        let config = DatabaseConfig {
            url: Some("  ".into()),
            ..DatabaseConfig::default()
        };
        assert!(!config.is_configured());
        assert!(matches!(config.require_url(), Err(ConfigError::NotConfigured { .. })));
    }
}
