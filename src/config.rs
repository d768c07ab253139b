//! Startup configuration read from environment variables.
//!
//! Values are read once in `main`; nothing reads the environment afterwards.

use rust_decimal::Decimal;
use std::str::FromStr;
use thiserror::Error;

use crate::domain::{FinePolicyError, fine::FinePolicy};

const DEFAULT_DATABASE_URL: &str = "postgres://localhost/library";
const DEFAULT_PORT: u16 = 3000;

/// Configuration errors abort startup.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
    pub fine_policy: FinePolicy,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url =
            lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let port = match lookup("PORT") {
            Some(raw) => parse_value("PORT", &raw)?,
            None => DEFAULT_PORT,
        };

        let rate: Decimal = parse_value(
            "FINE_RATE_PER_DAY",
            &lookup("FINE_RATE_PER_DAY").ok_or(ConfigError::Missing("FINE_RATE_PER_DAY"))?,
        )?;
        let cap: Decimal = parse_value(
            "FINE_MAX_PER_LOAN",
            &lookup("FINE_MAX_PER_LOAN").ok_or(ConfigError::Missing("FINE_MAX_PER_LOAN"))?,
        )?;
        let grace_period_days = match lookup("FINE_GRACE_PERIOD_DAYS") {
            Some(raw) => parse_value("FINE_GRACE_PERIOD_DAYS", &raw)?,
            None => 0,
        };

        let fine_policy = FinePolicy::new(rate, cap, grace_period_days).map_err(|e| match e {
            FinePolicyError::NegativeRate => ConfigError::Invalid {
                name: "FINE_RATE_PER_DAY",
                reason: "must not be negative".to_string(),
            },
            FinePolicyError::NegativeCap => ConfigError::Invalid {
                name: "FINE_MAX_PER_LOAN",
                reason: "must not be negative".to_string(),
            },
        })?;

        Ok(Self {
            database_url,
            port,
            fine_policy,
        })
    }
}

fn parse_value<T>(name: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        name,
        reason: e.to_string(),
    })
}
