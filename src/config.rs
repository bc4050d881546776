use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub access_token_ttl: usize,
    pub refresh_token_ttl: usize,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_refresh_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,
    pub log_level: tracing::Level,
    pub log_dir: String,
    pub run_migrations: bool,
}

fn required(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("{key} must be set"))
}

fn optional<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw}")),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            access_token_ttl: optional("ACCESS_TOKEN_TTL", 900)?, // 15 min
            refresh_token_ttl: optional("REFRESH_TOKEN_TTL", 604_800)?, // 7 days

            rate_login_per_min: optional("RATE_LOGIN_PER_MIN", 60)?,
            rate_refresh_per_min: optional("RATE_REFRESH_PER_MIN", 30)?,
            rate_protected_per_min: optional("RATE_PROTECTED_PER_MIN", 1000)?,

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),
            log_level: env::var("LOG_LEVEL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(tracing::Level::DEBUG),
            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
            run_migrations: optional("RUN_MIGRATIONS", true)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_optional_uses_default() {
        let value: u32 = optional("GEO_ATTENDANCE_TEST_UNSET_RATE", 42).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn unset_required_names_the_key() {
        let err = required("GEO_ATTENDANCE_TEST_UNSET_SECRET").unwrap_err();
        assert!(err.to_string().contains("GEO_ATTENDANCE_TEST_UNSET_SECRET"));
    }
}
