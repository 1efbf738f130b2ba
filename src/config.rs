// src/config.rs

use std::{env, fmt, str::FromStr};

use dotenvy::dotenv;

use crate::engine::{badges::BadgeTiers, completion::CompletionPolicy};

/// XP credited when a learner completes a content unit for the first time.
pub const DEFAULT_XP_PER_LESSON: i64 = 10;

/// XP credited the first time a learner passes a quiz.
pub const DEFAULT_XP_PER_QUIZ_PASS: i64 = 10;

/// Which `Store` implementation backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "pg" => Ok(StorageBackend::Postgres),
            "memory" | "mem" => Ok(StorageBackend::Memory),
            other => Err(format!("unknown storage backend '{}'", other)),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid { key: &'static str, reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "{} must be set", key),
            ConfigError::Invalid { key, reason } => write!(f, "{} is invalid: {}", key, reason),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone)]
pub struct Config {
    pub storage: StorageBackend,
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
    pub port: u16,
    pub badge_tiers: BadgeTiers,
    pub completion_policy: CompletionPolicy,
    pub xp_per_lesson: i64,
    pub xp_per_quiz_pass: i64,
    pub cache_ttl_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        let storage = parse_or("STORAGE", StorageBackend::Postgres)?;

        let database_url = env::var("DATABASE_URL").ok();
        if storage == StorageBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        let jwt_secret = env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET"))?;

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            storage,
            database_url,
            jwt_secret,
            jwt_expiration: parse_or("JWT_EXPIRATION", 86_400)?,
            rust_log,
            admin_username: env::var("ADMIN_USERNAME").ok(),
            admin_password: env::var("ADMIN_PASSWORD").ok(),
            port: parse_or("PORT", 3000)?,
            badge_tiers: parse_or("BADGE_TIERS", BadgeTiers::default())?,
            completion_policy: parse_or("COMPLETION_POLICY", CompletionPolicy::default())?,
            xp_per_lesson: parse_or("XP_PER_LESSON", DEFAULT_XP_PER_LESSON)?,
            xp_per_quiz_pass: parse_or("XP_PER_QUIZ_PASS", DEFAULT_XP_PER_QUIZ_PASS)?,
            cache_ttl_secs: parse_or("CACHE_TTL_SECS", 60)?,
        })
    }

    /// Configuration for tests and local experiments: in-memory storage and
    /// default gamification settings.
    pub fn for_memory(jwt_secret: &str) -> Self {
        Self {
            storage: StorageBackend::Memory,
            database_url: None,
            jwt_secret: jwt_secret.to_string(),
            jwt_expiration: 600,
            rust_log: "error".to_string(),
            admin_username: None,
            admin_password: None,
            port: 0,
            badge_tiers: BadgeTiers::default(),
            completion_policy: CompletionPolicy::default(),
            xp_per_lesson: DEFAULT_XP_PER_LESSON,
            xp_per_quiz_pass: DEFAULT_XP_PER_QUIZ_PASS,
            cache_ttl_secs: 60,
        }
    }
}

fn parse_or<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw.parse::<T>().map_err(|e| ConfigError::Invalid {
            key,
            reason: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_backend_parses_aliases() {
        assert_eq!("Postgres".parse::<StorageBackend>(), Ok(StorageBackend::Postgres));
        assert_eq!("mem".parse::<StorageBackend>(), Ok(StorageBackend::Memory));
        assert!("sqlite".parse::<StorageBackend>().is_err());
    }
}
