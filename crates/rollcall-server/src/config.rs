use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use tracing::{info, warn};

use rollcall_store::migrations::AdminSeed;

/// Placeholder JWT secrets that are only acceptable on a dev machine.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

const DEFAULT_SECRET: &str = "dev-secret-change-me";

pub struct Config {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub static_dir: PathBuf,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub admin_seed: Option<AdminSeed>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let jwt_secret = var("ROLLCALL_JWT_SECRET").unwrap_or_else(|| DEFAULT_SECRET.into());
        if PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            warn!("ROLLCALL_JWT_SECRET is unset or a placeholder; tokens are forgeable");
        }

        let admin_seed = match (var("ROLLCALL_ADMIN_USERNAME"), var("ROLLCALL_ADMIN_PASSWORD")) {
            (Some(username), Some(password)) => Some(AdminSeed {
                username,
                password,
                name: var("ROLLCALL_ADMIN_NAME").unwrap_or_else(|| "Administrator".into()),
            }),
            (Some(_), None) | (None, Some(_)) => {
                warn!("Admin seed needs both ROLLCALL_ADMIN_USERNAME and ROLLCALL_ADMIN_PASSWORD");
                None
            }
            (None, None) => None,
        };

        Ok(Self {
            host: var("ROLLCALL_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse_or("ROLLCALL_PORT", 3000)?,
            data_dir: var("ROLLCALL_DATA_DIR").unwrap_or_else(|| "data".into()).into(),
            static_dir: var("ROLLCALL_STATIC_DIR").unwrap_or_else(|| ".".into()).into(),
            jwt_secret,
            token_ttl_hours: parse_or("ROLLCALL_TOKEN_TTL_HOURS", 12)?,
            admin_seed,
        })
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr + Display,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid {} value '{}'", key, raw)),
        None => {
            info!("{} not set, using default: {}", key, default);
            Ok(default)
        }
    }
}
