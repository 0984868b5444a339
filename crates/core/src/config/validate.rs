use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Remote URLs and credentials are present
/// - Timeouts and the correlation scan window are not 0
/// - Marker keys are present
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let ticketing = &config.ticketing;
    if ticketing.base_url.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "ticketing.base_url cannot be empty".to_string(),
        ));
    }
    if ticketing.username.is_empty() {
        return Err(ConfigError::ValidationError(
            "ticketing.username cannot be empty".to_string(),
        ));
    }
    if ticketing.connect_timeout_secs == 0 || ticketing.read_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "ticketing timeouts cannot be 0".to_string(),
        ));
    }

    let monitoring = &config.monitoring;
    if monitoring.api_url.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "monitoring.api_url cannot be empty".to_string(),
        ));
    }
    if monitoring.connect_timeout_secs == 0 || monitoring.read_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "monitoring timeouts cannot be 0".to_string(),
        ));
    }
    if monitoring.scan_window == 0 {
        return Err(ConfigError::ValidationError(
            "monitoring.scan_window cannot be 0".to_string(),
        ));
    }
    if monitoring.marker_key.trim().is_empty() || monitoring.closed_marker_key.trim().is_empty()
    {
        return Err(ConfigError::ValidationError(
            "monitoring marker keys cannot be empty".to_string(),
        ));
    }

    Ok(())
}
