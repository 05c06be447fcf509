//! # Settings
//!
//! Layered configuration for the forum server, lowest precedence first:
//!
//! 1. built-in defaults (an empty environment runs a memory-backed server)
//! 2. `config/default.toml`, then `config/local.toml` (both optional)
//! 3. environment variables prefixed `FORUM__`, nested with `__`
//!    (e.g. `FORUM__DATABASE__URL`), after loading `.env` if present

use config::builder::DefaultState;
use config::{ConfigBuilder, Environment, File, FileFormat};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub maintenance: MaintenanceSettings,
    pub log: LogSettings,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 5000,
        }
    }
}

impl ServerSettings {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Memory,
    Postgres,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub backend: Backend,
    /// Connection string; required for the postgres backend.
    pub url: Option<SecretString>,
    pub max_connections: u32,
    pub run_migrations: bool,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            backend: Backend::Memory,
            url: None,
            max_connections: 10,
            run_migrations: true,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct MaintenanceSettings {
    /// Inserted posts between storage reorganizations; `0` disables them.
    pub reorganize_every: u64,
}

impl Default for MaintenanceSettings {
    fn default() -> Self {
        Self {
            reorganize_every: 1_500_000,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// `EnvFilter` directives; `RUST_LOG` takes precedence when set.
    pub filter: String,
    pub json: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            filter: "info,tower_http=info".into(),
            json: false,
        }
    }
}

impl Settings {
    /// Loads `.env`, the `config/` files and `FORUM__*` variables.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::build(
            config::Config::builder()
                .add_source(File::with_name("config/default").required(false))
                .add_source(File::with_name("config/local").required(false))
                .add_source(
                    Environment::with_prefix("FORUM")
                        .prefix_separator("__")
                        .separator("__")
                        .try_parsing(true),
                ),
        )
    }

    /// Parses settings from a TOML document, over the defaults.
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        Self::build(config::Config::builder().add_source(File::from_str(toml, FileFormat::Toml)))
    }

    fn build(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid("server.port must be non-zero".into()));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be non-zero".into(),
            ));
        }
        if self.database.backend == Backend::Postgres && self.database_url().is_none() {
            return Err(ConfigError::Invalid(
                "database.url is required for the postgres backend".into(),
            ));
        }
        Ok(())
    }

    /// The configured connection string, if any and non-empty.
    pub fn database_url(&self) -> Option<&str> {
        self.database
            .url
            .as_ref()
            .map(|url| url.expose_secret())
            .filter(|url| !url.is_empty())
    }
}
