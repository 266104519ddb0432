use super::{AppConfig, ConfigError};

/// Validate the full application config, returning an error if any rule is violated.
///
/// # Errors
///
/// Returns [`ConfigError::Validation`] when any configuration invariant is violated.
pub fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    validate_server_config(config)?;
    validate_backend(config)?;
    validate_log_level(config)?;
    Ok(())
}

fn validation_err(msg: impl Into<String>) -> ConfigError {
    ConfigError::Validation(msg.into())
}

fn validate_server_config(config: &AppConfig) -> Result<(), ConfigError> {
    let server = &config.server;
    if server.http_pool_max_idle_per_host == 0 {
        return Err(validation_err(
            "server.http_pool_max_idle_per_host must be greater than 0",
        ));
    }
    if server.timeout == 0 {
        return Err(validation_err("server.timeout must be greater than 0"));
    }
    if server.host.trim().is_empty() {
        return Err(validation_err("server.host cannot be empty"));
    }
    Ok(())
}

fn validate_backend(config: &AppConfig) -> Result<(), ConfigError> {
    let backend = &config.backend;
    if !backend.base_url.starts_with("http://") && !backend.base_url.starts_with("https://") {
        return Err(validation_err(
            "backend.base_url must start with http:// or https://",
        ));
    }
    if let Err(err) = url::Url::parse(&backend.base_url) {
        return Err(validation_err(format!(
            "backend.base_url is not a valid URL: {err}"
        )));
    }
    if !backend.chat_path.starts_with('/') {
        return Err(validation_err("backend.chat_path must start with '/'"));
    }
    Ok(())
}

const VALID_LOG_LEVELS: &[&str] = &["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL", "DISABLED"];

fn validate_log_level(config: &AppConfig) -> Result<(), ConfigError> {
    let level = config.features.log_level.to_uppercase();
    if !VALID_LOG_LEVELS.contains(&level.as_str()) {
        return Err(validation_err(format!(
            "Invalid log_level '{}'. Must be one of: {}",
            config.features.log_level,
            VALID_LOG_LEVELS.join(", ")
        )));
    }
    Ok(())
}
