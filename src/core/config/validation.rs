//! Contains validation logic for the final Config struct.

use super::{Config, Result};
use crate::core::error::AppError;
use std::time::Duration;

/// Validates the configuration after loading and overrides.
/// Clamps values where a sensible fallback exists, errors otherwise.
pub(crate) fn validate_config(config: &mut Config) -> Result<()> {
    for (name, value) in [
        ("overall deadline", config.overall_deadline),
        ("DNS timeout", config.dns_timeout),
        ("SMTP timeout", config.smtp_timeout),
        ("port probe timeout", config.port_timeout),
    ] {
        if value == Duration::ZERO {
            return Err(AppError::Config(format!("The {} must be greater than zero.", name)));
        }
    }
    if config.max_concurrency == 0 {
        tracing::warn!("Max concurrency was set to 0. Setting to 1.");
        config.max_concurrency = 1;
    }
    if config.max_profile_concurrency == 0 {
        tracing::warn!("Max profile concurrency was set to 0. Setting to 1.");
        config.max_profile_concurrency = 1;
    }
    if config.max_candidates == 0 {
        tracing::warn!("Max candidates was set to 0. Setting to 1.");
        config.max_candidates = 1;
    }
    if config.smtp_port == 0 {
        return Err(AppError::Config("SMTP port cannot be 0.".to_string()));
    }
    if config.probe_ports.contains(&0) {
        return Err(AppError::Config("Probe ports cannot contain 0.".to_string()));
    }
    if config.probe_ports.is_empty() {
        tracing::warn!("No probe ports configured. Port reachability tier will always fail.");
    }
    if !config.email_regex.is_match(&config.smtp_sender_email) {
        return Err(AppError::Config(format!(
            "Invalid SMTP sender email format: {}",
            config.smtp_sender_email
        )));
    }
    if config.helo_name.is_empty() {
        tracing::warn!("HELO name is empty. Using 'localhost'.");
        config.helo_name = "localhost".to_string();
    }
    if config.personal_providers.is_empty() {
        tracing::warn!("No personal providers configured. Only work candidates will be generated.");
    }
    if config.dns_servers.is_empty() {
        tracing::debug!("No DNS servers configured. System resolver configuration will be used.");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_concurrency_clamped() {
        let mut config = Config {
            max_concurrency: 0,
            max_candidates: 0,
            ..Config::default()
        };
        validate_config(&mut config).unwrap();
        assert_eq!(config.max_concurrency, 1);
        assert_eq!(config.max_candidates, 1);
    }

    #[test]
    fn test_invalid_sender_rejected() {
        let mut config = Config {
            smtp_sender_email: "not-an-address".to_string(),
            ..Config::default()
        };
        assert!(matches!(validate_config(&mut config), Err(AppError::Config(_))));
    }

    #[test]
    fn test_zero_deadline_rejected() {
        let mut config = Config {
            overall_deadline: Duration::ZERO,
            ..Config::default()
        };
        assert!(validate_config(&mut config).is_err());
    }
}
