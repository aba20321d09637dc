use crate::app_config::{AppConfig, Environment};
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

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let api_base_url = require("PROMOKIT_API_URL")?;
    if !api_base_url.starts_with("http://") && !api_base_url.starts_with("https://") {
        return Err(ConfigError::InvalidEnvVar {
            var: "PROMOKIT_API_URL".to_string(),
            reason: format!("expected an http(s) URL, got '{api_base_url}'"),
        });
    }

    let access_token = lookup("PROMOKIT_ACCESS_TOKEN")
        .ok()
        .filter(|t| !t.trim().is_empty());
    let env = parse_environment(&or_default("PROMOKIT_ENV", "development"))?;
    let log_level = or_default("PROMOKIT_LOG_LEVEL", "info");
    let state_dir = PathBuf::from(or_default("PROMOKIT_STATE_DIR", "./.promokit/session"));

    let request_timeout_secs = parse_u64("PROMOKIT_REQUEST_TIMEOUT_SECS", "60")?;
    let generate_timeout_secs = parse_u64("PROMOKIT_GENERATE_TIMEOUT_SECS", "90")?;
    let publish_timeout_secs = parse_u64("PROMOKIT_PUBLISH_TIMEOUT_SECS", "120")?;
    let user_agent = or_default("PROMOKIT_USER_AGENT", "promokit/0.1 (promotion-generator)");
    let max_retries = parse_u32("PROMOKIT_MAX_RETRIES", "3")?;
    let retry_backoff_base_ms = parse_u64("PROMOKIT_RETRY_BACKOFF_BASE_MS", "1000")?;
    let max_upload_bytes = parse_u64("PROMOKIT_MAX_UPLOAD_BYTES", "10485760")?;
    let upload_subdir = or_default("PROMOKIT_UPLOAD_SUBDIR", "ads/images");

    Ok(AppConfig {
        api_base_url,
        access_token,
        env,
        log_level,
        state_dir,
        request_timeout_secs,
        generate_timeout_secs,
        publish_timeout_secs,
        user_agent,
        max_retries,
        retry_backoff_base_ms,
        max_upload_bytes,
        upload_subdir,
    })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` for anything other than
/// `development`, `test`, or `production`.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "PROMOKIT_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
