use std::path::PathBuf;

use anyhow::{anyhow, bail, Context};
use serde::Deserialize;

const DEFAULT_ENV: &str = "local";
const ENV_VAR_NAME: &str = "LIBRIS_ENV";
const CONFIG_DIR_ENV: &str = "LIBRIS_CONFIG_DIR";

/// Signing secret used when none is configured. Refused in production.
pub const DEVELOPMENT_JWT_SECRET: &str = "libris-development-secret";

/// Deployment environment the application is running in.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Local,
    Staging,
    Production,
}

/// Top-level configuration structure loaded from layered sources.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
    #[serde(default)]
    pub auth: AuthSettings,
    #[serde(default)]
    pub recommendations: RecommendationSettings,
}

impl Settings {
    /// Load configuration by layering `.env`, base file, and environment overlay.
    ///
    /// Environment variables use the `LIBRIS_` prefix and `__` between nested
    /// keys, e.g. `LIBRIS_DATABASE__URL`.
    pub fn load() -> anyhow::Result<Self> {
        // Allow missing `.env` files without failing.
        let _ = dotenvy::dotenv();

        let environment = std::env::var(ENV_VAR_NAME).unwrap_or_else(|_| DEFAULT_ENV.to_string());
        let config_dir = match std::env::var(CONFIG_DIR_ENV) {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => std::env::current_dir()
                .context("unable to resolve current directory")?
                .join("config"),
        };

        let base_path = config_dir.join("base.toml");
        let environment_path = config_dir.join(format!("{}.toml", environment));

        let builder = config::Config::builder()
            .add_source(config::File::from(base_path).required(false))
            .add_source(config::File::from(environment_path).required(false))
            .add_source(
                config::Environment::with_prefix("LIBRIS")
                    .prefix_separator("_")
                    .separator("__"),
            );

        let cfg = builder
            .build()
            .with_context(|| "failed to build configuration")?;

        let mut settings: Settings = cfg
            .try_deserialize()
            .with_context(|| "failed to deserialize configuration")?;

        // Override environment field with parsed enum variant.
        settings.environment = match environment.as_str() {
            "local" => Environment::Local,
            "staging" => Environment::Staging,
            "production" => Environment::Production,
            other => {
                return Err(anyhow!(
                    "unsupported environment '{}'; expected local/staging/production",
                    other
                ));
            }
        };

        settings.validate()?;
        Ok(settings)
    }

    /// Reject combinations that must never reach a deployed environment.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.environment == Environment::Production
            && self.auth.jwt_secret == DEVELOPMENT_JWT_SECRET
        {
            bail!("auth.jwt_secret must be set explicitly in production");
        }
        if self.recommendations.nlist == 0 || self.recommendations.nprobe == 0 {
            bail!("recommendations.nlist and recommendations.nprobe must be positive");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "ServerSettings::default_host")]
    pub host: String,
    #[serde(default = "ServerSettings::default_port")]
    pub port: u16,
    #[serde(default = "ServerSettings::default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl ServerSettings {
    fn default_host() -> String {
        "0.0.0.0".to_string()
    }

    fn default_port() -> u16 {
        8080
    }

    fn default_request_timeout_ms() -> u64 {
        15000
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            request_timeout_ms: Self::default_request_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "DatabaseSettings::default_url")]
    pub url: String,
    #[serde(default = "DatabaseSettings::default_max_connections")]
    pub max_connections: u32,
}

impl DatabaseSettings {
    fn default_url() -> String {
        "sqlite://libris.db?mode=rwc".to_string()
    }

    fn default_max_connections() -> u32 {
        5
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: Self::default_url(),
            max_connections: Self::default_max_connections(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TelemetrySettings {
    #[serde(default)]
    pub log_format: LogFormat,
    /// `tracing-subscriber` filter directive; `RUST_LOG` wins when set.
    #[serde(default)]
    pub filter: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthSettings {
    #[serde(default = "AuthSettings::default_jwt_secret")]
    pub jwt_secret: String,
    #[serde(default = "AuthSettings::default_access_token_ttl_secs")]
    pub access_token_ttl_secs: u64,
    #[serde(default = "AuthSettings::default_refresh_token_ttl_secs")]
    pub refresh_token_ttl_secs: u64,
    /// Argon2 memory cost in KiB.
    #[serde(default = "AuthSettings::default_password_memory_kib")]
    pub password_memory_kib: u32,
}

impl AuthSettings {
    fn default_jwt_secret() -> String {
        DEVELOPMENT_JWT_SECRET.to_string()
    }

    fn default_access_token_ttl_secs() -> u64 {
        5 * 60
    }

    fn default_refresh_token_ttl_secs() -> u64 {
        24 * 60 * 60
    }

    fn default_password_memory_kib() -> u32 {
        19 * 1024
    }
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            jwt_secret: Self::default_jwt_secret(),
            access_token_ttl_secs: Self::default_access_token_ttl_secs(),
            refresh_token_ttl_secs: Self::default_refresh_token_ttl_secs(),
            password_memory_kib: Self::default_password_memory_kib(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecommendationSettings {
    #[serde(default = "RecommendationSettings::default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    /// Coarse clusters in the inverted-file index.
    #[serde(default = "RecommendationSettings::default_nlist")]
    pub nlist: usize,
    /// Clusters scanned per query.
    #[serde(default = "RecommendationSettings::default_nprobe")]
    pub nprobe: usize,
    /// Neighbors fetched per favorite.
    #[serde(default = "RecommendationSettings::default_neighbors")]
    pub neighbors: usize,
    /// Size of the final list.
    #[serde(default = "RecommendationSettings::default_limit")]
    pub limit: usize,
}

impl RecommendationSettings {
    fn default_cache_ttl_secs() -> u64 {
        60 * 60
    }

    fn default_nlist() -> usize {
        100
    }

    fn default_nprobe() -> usize {
        1
    }

    fn default_neighbors() -> usize {
        5
    }

    fn default_limit() -> usize {
        5
    }
}

impl Default for RecommendationSettings {
    fn default() -> Self {
        Self {
            cache_ttl_secs: Self::default_cache_ttl_secs(),
            nlist: Self::default_nlist(),
            nprobe: Self::default_nprobe(),
            neighbors: Self::default_neighbors(),
            limit: Self::default_limit(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_environment_is_local() {
        let settings = Settings::default();
        assert_eq!(settings.environment, Environment::Local);
    }

    #[test]
    fn default_database_is_local_sqlite_file() {
        let settings = Settings::default();
        assert_eq!(settings.database.url, "sqlite://libris.db?mode=rwc");
    }

    #[test]
    fn recommendation_defaults_match_catalog_behaviour() {
        let settings = RecommendationSettings::default();
        assert_eq!(settings.cache_ttl_secs, 3600);
        assert_eq!(settings.nlist, 100);
        assert_eq!(settings.neighbors, 5);
        assert_eq!(settings.limit, 5);
    }

    #[test]
    fn production_rejects_development_secret() {
        let settings = Settings {
            environment: Environment::Production,
            ..Settings::default()
        };
        assert!(settings.validate().is_err());

        let mut settings = settings;
        settings.auth.jwt_secret = "a-real-secret".to_string();
        assert!(settings.validate().is_ok());
    }
}
