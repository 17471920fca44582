//! Application configuration loaded from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use kadha_core::catalog::{CatalogSettings, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
use kadha_core::services::{BlogSettings, UnpublishedReadPolicy};
use kadha_infra::{JwtConfig, MAX_EXPIRATION_HOURS};
use kadha_infra::database::DatabaseConfig;

/// Used outside production when `JWT_SECRET` is unset.
const DEVELOPMENT_JWT_SECRET: &str = "kadha-development-secret";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {key}")]
    Invalid { key: &'static str, value: String },

    #[error("JWT_SECRET must be set when RUST_ENV=production")]
    MissingSecret,
}

/// Token signing settings.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub jwt: JwtConfig,
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub database: Option<DatabaseConfig>,
    pub auth: AuthSettings,
    pub blog: BlogSettings,
}

/// Read `key` and parse it; unset or empty means `None`.
fn parse_var<T: FromStr>(key: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { key, value }),
        _ => Ok(None),
    }
}

/// Unset or 0 issues tokens that never expire; values past the supported
/// lifetime are rejected.
fn expiration_hours(raw: Option<i64>) -> Result<Option<i64>, ConfigError> {
    match raw {
        Some(hours) if hours > MAX_EXPIRATION_HOURS => Err(ConfigError::Invalid {
            key: "JWT_EXPIRATION_HOURS",
            value: hours.to_string(),
        }),
        Some(hours) if hours > 0 => Ok(Some(hours)),
        _ => Ok(None),
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = env::var("RUST_ENV").unwrap_or_else(|_| "development".to_string());

        let database = match env::var("DATABASE_URL") {
            Ok(url) if !url.trim().is_empty() => {
                let defaults = DatabaseConfig::default();
                Some(DatabaseConfig {
                    url,
                    max_connections: parse_var("DB_MAX_CONNECTIONS")?
                        .unwrap_or(defaults.max_connections),
                    min_connections: parse_var("DB_MIN_CONNECTIONS")?
                        .unwrap_or(defaults.min_connections),
                    operation_timeout: parse_var::<u64>("DB_OPERATION_TIMEOUT_SECS")?
                        .map(Duration::from_secs)
                        .unwrap_or(defaults.operation_timeout),
                })
            }
            _ => None,
        };

        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: parse_var("PORT")?.unwrap_or(8080),
            database,
            auth: Self::auth_from_env(&environment)?,
            blog: Self::blog_from_env()?,
            environment,
        })
    }

    fn auth_from_env(environment: &str) -> Result<AuthSettings, ConfigError> {
        let secret = match env::var("JWT_SECRET") {
            Ok(secret) if !secret.is_empty() => secret,
            _ if environment == "production" => return Err(ConfigError::MissingSecret),
            _ => {
                tracing::warn!("JWT_SECRET not set, using the development secret");
                DEVELOPMENT_JWT_SECRET.to_string()
            }
        };

        let defaults = JwtConfig::default();
        Ok(AuthSettings {
            jwt: JwtConfig {
                secret,
                expiration_hours: expiration_hours(parse_var("JWT_EXPIRATION_HOURS")?)?,
                issuer: env::var("JWT_ISSUER").unwrap_or(defaults.issuer),
            },
        })
    }

    fn blog_from_env() -> Result<BlogSettings, ConfigError> {
        let max_limit = parse_var::<u64>("CATALOG_MAX_LIMIT")?
            .filter(|l| *l > 0)
            .unwrap_or(MAX_PAGE_LIMIT);
        let default_limit = parse_var::<u64>("CATALOG_DEFAULT_LIMIT")?
            .filter(|l| *l > 0)
            .unwrap_or(DEFAULT_PAGE_LIMIT)
            .min(max_limit);

        let unpublished_reads = match env::var("UNPUBLISHED_READ_POLICY") {
            Ok(value) if !value.trim().is_empty() => UnpublishedReadPolicy::from_str(&value)
                .map_err(|_| ConfigError::Invalid {
                    key: "UNPUBLISHED_READ_POLICY",
                    value,
                })?,
            _ => UnpublishedReadPolicy::default(),
        };

        Ok(BlogSettings {
            catalog: CatalogSettings {
                default_limit,
                max_limit,
            },
            unpublished_reads,
        })
    }
}
