//! Provides the `ConfigBuilder` for fluent configuration construction.

use super::loading::{apply_file_config, load_config_file};
use super::validation::validate_config;
use super::{Config, ConfigFile, ProbeMode, Result};
use crate::AppError;
use std::path::Path;
use std::time::Duration;

const DEFAULT_CONFIG_LOCATIONS: [&str; 2] = ["./email-hunter.toml", "./config.toml"];

/// Millisecond form of `duration`, clamped to `u64::MAX`.
fn saturating_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Builder pattern for creating `Config` instances fluently.
///
/// Precedence, lowest to highest: built-in defaults, the config file
/// (explicit path or the first default location found), builder overrides.
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
    config_file_path: Option<String>,
    skip_default_locations: bool,
    overrides: ConfigFile,
}

impl ConfigBuilder {
    /// Creates a new builder with default configuration values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Specify an optional configuration file path to load.
    pub fn config_file(mut self, path: impl Into<String>) -> Self {
        self.config_file_path = Some(path.into());
        self
    }

    /// Do not look for `./email-hunter.toml` / `./config.toml`.
    pub fn without_default_files(mut self) -> Self {
        self.skip_default_locations = true;
        self
    }

    pub fn overall_deadline(mut self, duration: Duration) -> Self {
        self.overrides.network.overall_deadline_ms = Some(saturating_millis(duration));
        self
    }
    pub fn max_concurrency(mut self, value: usize) -> Self {
        self.overrides.network.max_concurrency = Some(value);
        self
    }
    pub fn max_profile_concurrency(mut self, value: usize) -> Self {
        self.overrides.network.max_profile_concurrency = Some(value);
        self
    }
    pub fn dns_timeout(mut self, duration: Duration) -> Self {
        self.overrides.dns.dns_timeout_ms = Some(saturating_millis(duration));
        self
    }
    pub fn dns_servers(mut self, servers: Vec<String>) -> Self {
        self.overrides.dns.dns_servers = Some(servers);
        self
    }
    pub fn smtp_timeout(mut self, duration: Duration) -> Self {
        self.overrides.smtp.smtp_timeout_ms = Some(saturating_millis(duration));
        self
    }
    pub fn smtp_port(mut self, port: u16) -> Self {
        self.overrides.smtp.smtp_port = Some(port);
        self
    }
    pub fn smtp_sender_email(mut self, value: impl Into<String>) -> Self {
        self.overrides.smtp.smtp_sender_email = Some(value.into());
        self
    }
    pub fn helo_name(mut self, value: impl Into<String>) -> Self {
        self.overrides.smtp.helo_name = Some(value.into());
        self
    }
    pub fn port_timeout(mut self, duration: Duration) -> Self {
        self.overrides.smtp.port_timeout_ms = Some(saturating_millis(duration));
        self
    }
    pub fn probe_ports(mut self, ports: Vec<u16>) -> Self {
        self.overrides.smtp.probe_ports = Some(ports);
        self
    }
    pub fn probe_mode(mut self, mode: ProbeMode) -> Self {
        self.overrides.verification.probe_mode = Some(mode);
        self
    }
    pub fn known_providers(mut self, providers: Vec<String>) -> Self {
        self.overrides.verification.known_providers = Some(providers);
        self
    }
    pub fn max_candidates(mut self, value: usize) -> Self {
        self.overrides.generation.max_candidates = Some(value);
        self
    }
    pub fn personal_providers(mut self, providers: Vec<String>) -> Self {
        self.overrides.generation.personal_providers = Some(providers);
        self
    }
    pub fn infer_company_domain(mut self, enable: bool) -> Self {
        self.overrides.generation.infer_company_domain = Some(enable);
        self
    }
    pub fn denylist_local_parts(mut self, parts: Vec<String>) -> Self {
        self.overrides.ranking.denylist_local_parts = Some(parts);
        self
    }
    pub fn denylist_domains(mut self, domains: Vec<String>) -> Self {
        self.overrides.ranking.denylist_domains = Some(domains);
        self
    }
    pub fn max_alternatives(mut self, value: usize) -> Self {
        self.overrides.ranking.max_alternatives = Some(value);
        self
    }

    /// Builds the final `Config` object, applying defaults, file settings, overrides, and validation.
    pub fn build(mut self) -> Result<Config> {
        let mut loaded_path: Option<String> = None;

        if let Some(ref path) = self.config_file_path {
            match load_config_file(path) {
                Ok(file_config) => {
                    apply_file_config(&mut self.config, &file_config);
                    loaded_path = Some(path.clone());
                    tracing::info!("Loaded base configuration from specified file: {}", path);
                }
                Err(e) => {
                    tracing::error!("Failed to load specified config file '{}': {}", path, e);
                    return Err(AppError::Config(format!(
                        "Failed to load specified configuration file '{}': {:#}",
                        path, e
                    )));
                }
            }
        } else if !self.skip_default_locations {
            tracing::debug!("No config file specified, checking default locations.");
            for path_str in DEFAULT_CONFIG_LOCATIONS {
                if !Path::new(path_str).exists() {
                    continue;
                }
                tracing::debug!("Found potential default config file: {}", path_str);
                match load_config_file(path_str) {
                    Ok(file_config) => {
                        apply_file_config(&mut self.config, &file_config);
                        loaded_path = Some(path_str.to_string());
                        tracing::info!(
                            "Loaded base configuration from default location: {}",
                            path_str
                        );
                        break;
                    }
                    Err(e) => {
                        tracing::warn!(
                            "Failed to load or parse default config '{}': {:#}",
                            path_str,
                            e
                        );
                    }
                }
            }
            if loaded_path.is_none() {
                tracing::info!("No configuration file found. Using default values and overrides.");
            }
        }

        apply_file_config(&mut self.config, &self.overrides);
        self.config.loaded_config_path = loaded_path;
        validate_config(&mut self.config)?;

        tracing::debug!("Final configuration built successfully.");
        Ok(self.config)
    }
}
