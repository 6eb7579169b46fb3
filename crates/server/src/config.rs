//! Runtime configuration read from the environment.

use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::Duration;
use ricette_blog::upload::DEFAULT_MAX_IMAGE_BYTES;
use salvo::http::HeaderValue;
use thiserror::Error;
use tracing::{info, warn};

const DEV_JWT_SECRET: &str = "ricette-development-secret-change-me";

/// A variable is set but cannot be used.
#[derive(Debug, Error)]
#[error("invalid value for {key}: {message}")]
pub struct ConfigError {
    key: &'static str,
    message: String,
}

impl ConfigError {
    fn new(key: &'static str, message: impl Display) -> Self {
        Self {
            key,
            message: message.to_string(),
        }
    }
}

/// Server settings.
#[derive(Clone, Debug)]
pub struct Config {
    /// Address the HTTP listener binds to.
    pub listen: String,
    /// SQLite connection URL.
    pub database_url: String,
    /// HMAC secret signing the JWTs.
    pub jwt_secret: String,
    /// Lifetime of access tokens.
    pub access_ttl: Duration,
    /// Lifetime of refresh tokens.
    pub refresh_ttl: Duration,
    /// Directory holding uploaded images.
    pub media_root: PathBuf,
    /// Largest accepted image, in bytes.
    pub max_upload_bytes: u64,
    /// Public origin of the site used in the sitemap, e.g. `https://sardegnaricette.it`.
    pub public_base_url: Option<String>,
    /// Origins allowed by CORS. Empty allows any origin.
    pub cors_origins: Vec<HeaderValue>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8000".to_owned(),
            database_url: "sqlite://ricette.db?mode=rwc".to_owned(),
            jwt_secret: DEV_JWT_SECRET.to_owned(),
            access_ttl: Duration::minutes(60),
            refresh_ttl: Duration::days(7),
            media_root: PathBuf::from("media"),
            max_upload_bytes: DEFAULT_MAX_IMAGE_BYTES,
            public_base_url: None,
            cors_origins: Vec::new(),
        }
    }
}

impl Config {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, which returns the value of a variable if set.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let jwt_secret = match var("RICETTE_JWT_SECRET") {
            Some(secret) => secret,
            None if cfg!(debug_assertions) => {
                warn!("RICETTE_JWT_SECRET not set, using the development secret");
                defaults.jwt_secret
            }
            None => {
                return Err(ConfigError::new(
                    "RICETTE_JWT_SECRET",
                    "required in release builds",
                ));
            }
        };

        let access_minutes: i64 = try_load(&var, "RICETTE_ACCESS_TTL_MINUTES", 60)?;
        let access_ttl = Duration::try_minutes(access_minutes)
            .filter(|ttl| *ttl > Duration::zero())
            .ok_or_else(|| ConfigError::new("RICETTE_ACCESS_TTL_MINUTES", "out of range"))?;
        let refresh_days: i64 = try_load(&var, "RICETTE_REFRESH_TTL_DAYS", 7)?;
        let refresh_ttl = Duration::try_days(refresh_days)
            .filter(|ttl| *ttl > Duration::zero())
            .ok_or_else(|| ConfigError::new("RICETTE_REFRESH_TTL_DAYS", "out of range"))?;

        let cors_origins = match var("RICETTE_CORS_ORIGINS") {
            Some(origins) => parse_origins(&origins)?,
            None => {
                info!("RICETTE_CORS_ORIGINS not set, allowing any origin");
                Vec::new()
            }
        };

        Ok(Self {
            listen: try_load(&var, "RICETTE_LISTEN", defaults.listen)?,
            database_url: try_load(&var, "DATABASE_URL", defaults.database_url)?,
            jwt_secret,
            access_ttl,
            refresh_ttl,
            media_root: try_load(&var, "RICETTE_MEDIA_ROOT", defaults.media_root)?,
            max_upload_bytes: try_load(&var, "RICETTE_MAX_UPLOAD_BYTES", defaults.max_upload_bytes)?,
            public_base_url: var("RICETTE_PUBLIC_BASE_URL")
                .map(|url| url.trim().trim_end_matches('/').to_owned()),
            cors_origins,
        })
    }
}

fn try_load<T>(
    var: impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr + std::fmt::Debug,
    T::Err: Display,
{
    match var(key) {
        Some(value) => value.trim().parse().map_err(|e| {
            warn!("invalid {key} value: {e}");
            ConfigError::new(key, e)
        }),
        None => {
            info!("{key} not set, using default: {default:?}");
            Ok(default)
        }
    }
}

fn parse_origins(origins: &str) -> Result<Vec<HeaderValue>, ConfigError> {
    origins
        .split(',')
        .map(|origin| origin.trim().trim_end_matches('/'))
        .filter(|origin| !origin.is_empty() && *origin != "*")
        .map(|origin| {
            HeaderValue::from_str(origin).map_err(|e| ConfigError::new("RICETTE_CORS_ORIGINS", e))
        })
        .collect()
}
