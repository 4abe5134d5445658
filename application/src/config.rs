//! [`Config`]-related definitions.

use std::time;

use config::{builder::DefaultState, ConfigBuilder, ConfigError};
use derive_more::Debug;
use serde::Deserialize;
use smart_default::SmartDefault;

/// Application configuration.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: Server,

    /// Service configuration.
    pub service: Service,

    /// Postgres configuration.
    pub postgres: Postgres,

    /// Log configuration.
    pub log: Log,
}

impl Config {
    /// Creates a new [`Config`] by:
    /// - loading it from the provided `path` (if any);
    /// - merging it with the environment variables (if any);
    /// - using default values for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(path: impl AsRef<str>) -> Result<Self, ConfigError> {
        ConfigBuilder::<DefaultState>::default()
            .add_source(config::File::with_name(path.as_ref()).required(false))
            .add_source(config::Environment::with_prefix("CONF").separator("."))
            .build()?
            .try_deserialize()
    }
}

/// Server configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Server {
    /// Host to bind the server to.
    #[default("0.0.0.0".to_owned())]
    pub host: String,

    /// Port to bind the server to.
    #[default(8080)]
    pub port: u16,

    /// [CORS] configuration.
    ///
    /// [CORS]: https://developer.mozilla.org/en-US/docs/Web/HTTP/CORS
    pub cors: Cors,
}

/// [CORS] configuration.
///
/// [CORS]: https://developer.mozilla.org/en-US/docs/Web/HTTP/CORS
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Cors {
    /// List of allowed origins.
    #[default(vec!["*".to_owned()])]
    pub origins: Vec<String>,
}

/// Service configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Service {
    /// [JWT] secret.
    ///
    /// [JWT]: https://wikipedia.org/wiki/JSON_Web_Token
    #[debug(skip)]
    #[default("secret".to_owned())]
    pub jwt_secret: String,

    /// Time a session stays valid after login.
    #[default(service::Config::DEFAULT_SESSION_TTL)]
    #[serde(with = "humantime_serde")]
    pub session_ttl: time::Duration,

    /// Administrator account to be ensured on startup, if any.
    pub admin: Option<Admin>,
}

impl From<Service> for service::Config {
    fn from(value: Service) -> Self {
        let Service {
            jwt_secret,
            session_ttl,
            admin: _,
        } = value;
        Self {
            session_ttl,
            ..Self::with_secret(jwt_secret.as_bytes())
        }
    }
}

/// Credentials of the platform administrator.
#[derive(Clone, Debug, Deserialize)]
pub struct Admin {
    /// Name of the administrator.
    #[serde(default = "Admin::default_name")]
    pub name: String,

    /// Email the administrator logs in with.
    pub email: String,

    /// Password the administrator logs in with.
    #[debug(skip)]
    pub password: String,
}

impl Admin {
    /// Returns the default [`Admin::name`].
    fn default_name() -> String {
        "Administrator".to_owned()
    }
}

/// Postgres configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Postgres {
    /// Host to connect to.
    #[default("127.0.0.1".to_owned())]
    pub host: String,

    /// Port to connect to.
    #[default(5432)]
    pub port: u16,

    /// User to connect as.
    #[default("postgres".to_owned())]
    pub user: String,

    /// Password to connect with.
    #[debug(skip)]
    #[default("postgres".to_owned())]
    pub password: String,

    /// Database name to connect to.
    #[default("postgres".to_owned())]
    pub dbname: String,

    /// Maximum number of pooled connections.
    #[default(16)]
    pub pool_size: usize,
}

impl From<Postgres> for service::infra::postgres::Config {
    fn from(value: Postgres) -> Self {
        let Postgres {
            host,
            port,
            user,
            password,
            dbname,
            pool_size,
        } = value;

        Self {
            host: Some(host),
            port: Some(port),
            user: Some(user),
            password: Some(password),
            dbname: Some(dbname),
            pool: Some(service::infra::postgres::PoolConfig::new(pool_size)),
            ..Self::default()
        }
    }
}

/// Log configuration.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Log {
    /// Log level.
    pub level: LogLevel,
}

/// Log level.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogLevel {
    /// Designates very low priority, often extremely verbose, information.
    Trace,

    /// Designates lower priority information.
    Debug,

    /// Designates useful information.
    #[default]
    Info,

    /// Designates hazardous situations.
    Warn,

    /// Designates very serious errors.
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use super::Config;

    #[test]
    fn defaults_without_file() {
        let conf = Config::new("definitely-missing-config").unwrap();

        assert_eq!(conf.server.port, 8080);
        assert_eq!(conf.server.cors.origins, vec!["*".to_owned()]);
        assert_eq!(conf.service.session_ttl, Duration::from_secs(30 * 60));
        assert!(conf.service.admin.is_none());
        assert_eq!(conf.postgres.pool_size, 16);
    }

    #[test]
    fn converts_service_config() {
        let mut conf = Config::default();
        conf.service.session_ttl = Duration::from_secs(60);

        let service: service::Config = conf.service.into();

        assert_eq!(service.session_ttl, Duration::from_secs(60));
    }
}
