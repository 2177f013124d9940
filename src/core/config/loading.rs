//! Handles loading configuration from files and applying it to the Config struct.

use super::{Config, ConfigFile};
use anyhow::Context;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Loads configuration settings from a TOML file.
pub(crate) fn load_config_file(file_path: &str) -> anyhow::Result<ConfigFile> {
    let path = Path::new(file_path);
    if !path.is_file() {
        return Err(anyhow::anyhow!(
            "File not found or is not a file: {}",
            file_path
        ));
    }
    tracing::debug!("Attempting to read config file: {}", file_path);
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file: {}", file_path))?;

    let config_file_content: ConfigFile = toml::from_str(&content)
        .with_context(|| format!("Failed to parse TOML configuration from {}", file_path))?;

    tracing::debug!("Successfully parsed configuration file: {}", file_path);
    Ok(config_file_content)
}

fn lowercased(items: &[String]) -> Vec<String> {
    items
        .iter()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Merges every `Some` field of `file_config` onto `config`.
pub(crate) fn apply_file_config(config: &mut Config, file_config: &ConfigFile) {
    // Network
    if let Some(ms) = file_config.network.overall_deadline_ms {
        config.overall_deadline = Duration::from_millis(ms);
    }
    if let Some(concurrency) = file_config.network.max_concurrency {
        config.max_concurrency = concurrency;
    }
    if let Some(concurrency) = file_config.network.max_profile_concurrency {
        config.max_profile_concurrency = concurrency;
    }

    // DNS
    if let Some(ms) = file_config.dns.dns_timeout_ms {
        config.dns_timeout = Duration::from_millis(ms);
    }
    if let Some(ref servers) = file_config.dns.dns_servers {
        if !servers.is_empty() {
            config.dns_servers = servers.clone();
        }
    }

    // SMTP / ports
    if let Some(ms) = file_config.smtp.smtp_timeout_ms {
        config.smtp_timeout = Duration::from_millis(ms);
    }
    if let Some(port) = file_config.smtp.smtp_port {
        config.smtp_port = port;
    }
    if let Some(ref sender) = file_config.smtp.smtp_sender_email {
        config.smtp_sender_email = sender.trim().to_string();
    }
    if let Some(ref helo) = file_config.smtp.helo_name {
        config.helo_name = helo.trim().to_string();
    }
    if let Some(ms) = file_config.smtp.port_timeout_ms {
        config.port_timeout = Duration::from_millis(ms);
    }
    if let Some(ref ports) = file_config.smtp.probe_ports {
        config.probe_ports = ports.clone();
    }

    // Generation
    if let Some(max) = file_config.generation.max_candidates {
        config.max_candidates = max;
    }
    if let Some(ref providers) = file_config.generation.personal_providers {
        config.personal_providers = lowercased(providers);
    }
    if let Some(enable) = file_config.generation.infer_company_domain {
        config.infer_company_domain = enable;
    }

    // Verification
    if let Some(mode) = file_config.verification.probe_mode {
        config.probe_mode = mode;
    }
    if let Some(ref providers) = file_config.verification.known_providers {
        config.known_providers = lowercased(providers).into_iter().collect();
    }

    // Ranking
    if let Some(ref parts) = file_config.ranking.denylist_local_parts {
        config.denylist_local_parts = lowercased(parts);
    }
    if let Some(ref domains) = file_config.ranking.denylist_domains {
        config.denylist_domains = lowercased(domains);
    }
    if let Some(max_alt) = file_config.ranking.max_alternatives {
        config.max_alternatives = max_alt;
    }
}
