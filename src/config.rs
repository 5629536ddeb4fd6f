use std::env;
use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::NaiveTime;
use dotenvy::dotenv;

use crate::service::attendance::AttendancePolicy;
use crate::utils::time::parse_hhmm;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    pub jwt_secret: String,
    pub server_addr: String,
    pub access_token_ttl: usize,
    pub refresh_token_ttl: usize,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_register_per_min: u32,
    pub rate_refresh_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,

    // Attendance policy
    pub standard_start: NaiveTime,
    pub standard_end: NaiveTime,
    pub default_avatar_url: String,

    pub catalog_cache_ttl_secs: u64,
}

fn required(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("{key} must be set"))
}

fn or_default<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .with_context(|| format!("{key} is not valid"))
}

fn time_or_default(key: &str, default: &str) -> Result<NaiveTime> {
    let raw = env::var(key).unwrap_or_else(|_| default.to_string());
    parse_hhmm(&raw).with_context(|| format!("{key} must be HH:MM, got {raw:?}"))
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            db_max_connections: or_default("DB_MAX_CONNECTIONS", "10")?,
            jwt_secret: required("JWT_SECRET")?,
            access_token_ttl: or_default("ACCESS_TOKEN_TTL", "900")?, // default 15 min
            refresh_token_ttl: or_default("REFRESH_TOKEN_TTL", "604800")?, // default 7 days

            rate_login_per_min: or_default("RATE_LOGIN_PER_MIN", "60")?,
            rate_register_per_min: or_default("RATE_REGISTER_PER_MIN", "30")?,
            rate_refresh_per_min: or_default("RATE_REFRESH_PER_MIN", "30")?,
            rate_protected_per_min: or_default("RATE_PROTECTED_PER_MIN", "1000")?,

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),

            standard_start: time_or_default("STANDARD_START_TIME", "08:00")?,
            standard_end: time_or_default("STANDARD_END_TIME", "17:00")?,
            default_avatar_url: env::var("DEFAULT_AVATAR_URL")
                .unwrap_or_else(|_| "/default-avatar.png".to_string()),

            catalog_cache_ttl_secs: or_default("CATALOG_CACHE_TTL_SECS", "300")?,
        })
    }

    pub fn attendance_policy(&self) -> AttendancePolicy {
        AttendancePolicy {
            standard_start: self.standard_start,
            standard_end: self.standard_end,
        }
    }
}

#[cfg(test)]
impl Config {
    /// Fixed settings for handler tests; nothing is read from the environment.
    pub fn for_tests() -> Self {
        let policy = AttendancePolicy::default();
        Self {
            database_url: "mysql://localhost/hrm_test".into(),
            db_max_connections: 1,
            jwt_secret: "test-secret".into(),
            server_addr: "127.0.0.1:0".into(),
            access_token_ttl: 900,
            refresh_token_ttl: 3600,
            rate_login_per_min: 60,
            rate_register_per_min: 30,
            rate_refresh_per_min: 30,
            rate_protected_per_min: 1000,
            api_prefix: "/api".into(),
            standard_start: policy.standard_start,
            standard_end: policy.standard_end,
            default_avatar_url: "/default-avatar.png".into(),
            catalog_cache_ttl_secs: 60,
        }
    }
}
