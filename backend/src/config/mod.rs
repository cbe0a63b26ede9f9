//! Configuration management for SessionKit
//!
//! This module handles loading and validating configuration from environment variables,
//! with support for different environments (development, staging, production).
//! Token secrets and lifetimes have no defaults: a missing value stops startup.

use std::env;

use chrono::Duration;
use thiserror::Error;

use crate::auth::{PasswordHasher, TokenConfig, TokenSettings, DEFAULT_COST};

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid environment value: {0}")]
    InvalidValue(String),

    #[error("Invalid port number: {0}")]
    InvalidPort(String),
}

/// Application environment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    /// Parse environment from string
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        match s.to_lowercase().as_str() {
            "dev" | "development" => Ok(Environment::Development),
            "staging" => Ok(Environment::Staging),
            "prod" | "production" => Ok(Environment::Production),
            _ => Err(ConfigError::InvalidValue(format!(
                "Invalid environment: '{}'. Expected: dev, staging, or prod",
                s
            ))),
        }
    }

    /// Check if this is a production environment
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    /// Get the environment name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Current environment
    pub environment: Environment,

    /// Server port
    pub port: u16,

    /// CORS allowed origins
    pub cors_allowed_origins: Option<String>,

    /// Log level (RUST_LOG)
    pub log_level: String,

    /// Access/refresh signing secrets and lifetimes
    pub tokens: TokenConfig,

    /// bcrypt work factor
    pub bcrypt_cost: u32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors)
        dotenvy::dotenv().ok();

        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| {
            lookup(name)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
        };

        let environment = lookup("ENVIRONMENT")
            .map(|s| Environment::parse(&s))
            .unwrap_or(Ok(Environment::Development))?;

        let port = lookup("PORT")
            .unwrap_or_else(|| "8000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort("PORT must be a valid number".to_string()))?;

        let cors_allowed_origins = lookup("CORS_ALLOWED_ORIGINS");

        let log_level = lookup("RUST_LOG").unwrap_or_else(|| "info".to_string());

        let access_secret = required("ACCESS_TOKEN_SECRET")?;
        let access_ttl = parse_expiry(&required("ACCESS_TOKEN_EXPIRY")?)?;
        let refresh_secret = required("REFRESH_TOKEN_SECRET")?;
        let refresh_ttl = parse_expiry(&required("REFRESH_TOKEN_EXPIRY")?)?;

        let bcrypt_cost = match lookup("BCRYPT_COST") {
            Some(raw) => parse_cost(&raw)?,
            None => DEFAULT_COST,
        };

        Ok(Config {
            environment,
            port,
            cors_allowed_origins,
            log_level,
            tokens: TokenConfig::new(
                TokenSettings::new(access_secret, access_ttl),
                TokenSettings::new(refresh_secret, refresh_ttl),
            ),
            bcrypt_cost,
        })
    }

    /// Credential hasher at the configured work factor
    pub fn password_hasher(&self) -> PasswordHasher {
        PasswordHasher::new(self.bcrypt_cost)
    }
}

fn parse_cost(raw: &str) -> Result<u32, ConfigError> {
    let cost = raw
        .trim()
        .parse::<u32>()
        .map_err(|_| ConfigError::InvalidValue(format!("BCRYPT_COST '{}' is not a number", raw)))?;

    if !(4..=31).contains(&cost) {
        return Err(ConfigError::InvalidValue(format!(
            "BCRYPT_COST must be between 4 and 31, got {}",
            cost
        )));
    }
    Ok(cost)
}

/// Parse a token lifetime such as `"15m"`, `"10d"` or `"2 hours"`.
///
/// A bare number is read as milliseconds, matching the `expiresIn` strings
/// deployments already carry.
pub fn parse_expiry(raw: &str) -> Result<Duration, ConfigError> {
    let invalid = || ConfigError::InvalidValue(format!("Invalid token expiry: '{}'", raw));

    let value = raw.trim();
    let split = value
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(value.len());
    let (number, unit) = value.split_at(split);

    let amount: f64 = number.parse().map_err(|_| invalid())?;
    let unit_ms: f64 = match unit.trim().to_ascii_lowercase().as_str() {
        "" | "ms" | "msec" | "msecs" | "millisecond" | "milliseconds" => 1.0,
        "s" | "sec" | "secs" | "second" | "seconds" => 1_000.0,
        "m" | "min" | "mins" | "minute" | "minutes" => 60_000.0,
        "h" | "hr" | "hrs" | "hour" | "hours" => 3_600_000.0,
        "d" | "day" | "days" => 86_400_000.0,
        "w" | "week" | "weeks" => 604_800_000.0,
        "y" | "yr" | "yrs" | "year" | "years" => 31_557_600_000.0,
        _ => return Err(invalid()),
    };

    let millis = (amount * unit_ms).round();
    if !millis.is_finite() || millis <= 0.0 || millis > i64::MAX as f64 {
        return Err(invalid());
    }
    Ok(Duration::milliseconds(millis as i64))
}
