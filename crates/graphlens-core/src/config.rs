use std::net::SocketAddr;
use std::str::FromStr;

use crate::app_config::{AppConfig, Environment, ModelConfig};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Load only the model API settings; `DATABASE_URL` is not required.
///
/// # Errors
///
/// Returns `ConfigError` if `GEMINI_API_KEY` is missing or a model setting is
/// invalid.
pub fn load_model_config() -> Result<ModelConfig, ConfigError> {
    dotenvy::dotenv().ok();
    build_model_config(&|key| std::env::var(key))
}

fn require<F>(lookup: &F, var: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    lookup(var)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
}

fn or_default<F>(lookup: &F, var: &str, default: &str) -> String
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    lookup(var).unwrap_or_else(|_| default.to_string())
}

fn parse_or_default<F, T>(lookup: &F, var: &str, default: &str) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    or_default(lookup, var, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
}

fn positive(var: &str) -> ConfigError {
    ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason: "must be greater than zero".to_string(),
    }
}

/// Build the model API settings from the provided env-var lookup function.
fn build_model_config<F>(lookup: &F) -> Result<ModelConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let gemini_api_key = require(lookup, "GEMINI_API_KEY")?;
    let gemini_base_url = or_default(
        lookup,
        "GRAPHLENS_GEMINI_BASE_URL",
        "https://generativelanguage.googleapis.com",
    );
    let vision_model = or_default(lookup, "GRAPHLENS_VISION_MODEL", "gemini-2.0-flash");
    let text_model = or_default(lookup, "GRAPHLENS_TEXT_MODEL", "gemini-2.0-flash");
    let upstream_timeout_secs: u64 =
        parse_or_default(lookup, "GRAPHLENS_UPSTREAM_TIMEOUT_SECS", "30")?;
    if upstream_timeout_secs == 0 {
        return Err(positive("GRAPHLENS_UPSTREAM_TIMEOUT_SECS"));
    }

    Ok(ModelConfig {
        gemini_api_key,
        gemini_base_url,
        vision_model,
        text_model,
        upstream_timeout_secs,
    })
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let database_url = require(&lookup, "DATABASE_URL")?;
    let model = build_model_config(&lookup)?;

    let env = parse_environment(&or_default(&lookup, "GRAPHLENS_ENV", "development"))?;

    let bind_addr: SocketAddr = parse_or_default(&lookup, "GRAPHLENS_BIND_ADDR", "0.0.0.0:8000")?;
    let log_level = or_default(&lookup, "GRAPHLENS_LOG_LEVEL", "info");
    let cors_origin = or_default(&lookup, "GRAPHLENS_CORS_ORIGIN", "http://localhost:3000");

    let db_max_connections = parse_or_default(&lookup, "GRAPHLENS_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_or_default(&lookup, "GRAPHLENS_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs =
        parse_or_default(&lookup, "GRAPHLENS_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let max_image_bytes: usize =
        parse_or_default(&lookup, "GRAPHLENS_MAX_IMAGE_BYTES", "10485760")?;
    if max_image_bytes == 0 {
        return Err(positive("GRAPHLENS_MAX_IMAGE_BYTES"));
    }

    let history_limit: u32 = parse_or_default(&lookup, "GRAPHLENS_HISTORY_LIMIT", "10")?;

    Ok(AppConfig {
        database_url,
        gemini_api_key: model.gemini_api_key,
        env,
        bind_addr,
        log_level,
        cors_origin,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        gemini_base_url: model.gemini_base_url,
        vision_model: model.vision_model,
        text_model: model.text_model,
        upstream_timeout_secs: model.upstream_timeout_secs,
        max_image_bytes,
        history_limit: i64::from(history_limit.max(1)),
    })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidEnvVar`] for anything other than
/// `development`, `test`, or `production`.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "GRAPHLENS_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
