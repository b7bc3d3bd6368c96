use anyhow::{anyhow, Context};
use log::{info, warn};
use std::str::FromStr;

use crate::forum::threads::OrphanPolicy;
use crate::security::jwt::{JwtAlgorithm, JwtConfig};

// Type alias for backward compatibility
pub type Config = AppConfig;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: JwtConfig,
    pub forum: ForumConfig,
    pub cors_origins: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
}

#[derive(Clone, Debug)]
pub struct ForumConfig {
    pub orphan_policy: OrphanPolicy,
    pub seed_defaults: bool,
}

impl Default for ForumConfig {
    fn default() -> Self {
        Self {
            orphan_policy: OrphanPolicy::Drop,
            seed_defaults: true,
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl AppConfig {
    /// Load configuration from the process environment (after `.env` is applied).
    pub fn from_env() -> Result<Self, anyhow::Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from any key lookup. `from_env` delegates here.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_url = get("DATABASE_URL").ok_or_else(|| anyhow!("DATABASE_URL must be set"))?;

        let jwt_secret = get("JWT_SECRET")
            .or_else(|| get("SUPABASE_JWT_SECRET"))
            .ok_or_else(|| anyhow!("JWT_SECRET (or SUPABASE_JWT_SECRET) must be set"))?;

        let algorithm = match get("JWT_ALGORITHM") {
            Some(raw) => raw
                .parse::<JwtAlgorithm>()
                .map_err(|e| anyhow!("Invalid JWT_ALGORITHM: {e}"))?,
            None => JwtAlgorithm::HS256,
        };

        let orphan_policy = match get("FORUM_ORPHAN_REPLIES") {
            Some(raw) => raw
                .parse::<OrphanPolicy>()
                .map_err(|e| anyhow!("Invalid FORUM_ORPHAN_REPLIES: {e}"))?,
            None => OrphanPolicy::Drop,
        };

        let cors_origins: Vec<String> = get("CORS_ORIGINS")
            .unwrap_or_else(|| "http://localhost:5173".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let config = AppConfig {
            server: ServerConfig {
                host: get("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: parse_or("SERVER_PORT", get("SERVER_PORT"), 8000)?,
            },
            database: DatabaseConfig {
                url: database_url,
                pool_size: parse_or("DATABASE_POOL_SIZE", get("DATABASE_POOL_SIZE"), 10)?,
            },
            auth: JwtConfig {
                secret: jwt_secret,
                algorithm,
                audience: get("JWT_AUDIENCE"),
                issuer: get("JWT_ISSUER"),
                leeway_seconds: parse_or("JWT_LEEWAY_SECONDS", get("JWT_LEEWAY_SECONDS"), 60)?,
            },
            forum: ForumConfig {
                orphan_policy,
                seed_defaults: parse_bool(get("FORUM_SEED_DEFAULTS").as_deref(), true),
            },
            cors_origins,
        };

        if config.auth.algorithm.is_symmetric() && config.auth.secret.len() < 32 {
            warn!("JWT secret is shorter than 32 characters");
        }
        info!(
            "Configuration loaded: bind={} pool_size={} orphan_replies={}",
            config.server.bind_address(),
            config.database.pool_size,
            config.forum.orphan_policy
        );

        Ok(config)
    }
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> Result<T, anyhow::Error>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        Some(value) => value
            .trim()
            .parse::<T>()
            .with_context(|| format!("Invalid value for {key}: {value}")),
        None => Ok(default),
    }
}

fn parse_bool(raw: Option<&str>, default: bool) -> bool {
    match raw.map(|v| v.trim().to_ascii_lowercase()) {
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => true,
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => false,
        _ => default,
    }
}
