//! Runtime configuration.
//!
//! [`Config`] holds the effective settings. It is normally produced by
//! [`ConfigBuilder`], which layers defaults, an optional TOML file
//! ([`ConfigFile`]) and programmatic overrides, then validates the result.

mod builder;
mod loading;
mod validation;

pub use builder::ConfigBuilder;

pub(crate) use crate::core::error::Result;

use regex::Regex;
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;

/// Strict syntactic shape accepted for any candidate address.
pub const STRICT_EMAIL_PATTERN: &str = r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$";

const DEFAULT_PERSONAL_PROVIDERS: &[&str] = &["gmail.com", "yahoo.com", "hotmail.com", "outlook.com"];

const DEFAULT_KNOWN_PROVIDERS: &[&str] = &[
    "gmail.com",
    "googlemail.com",
    "yahoo.com",
    "ymail.com",
    "hotmail.com",
    "outlook.com",
    "live.com",
    "msn.com",
    "icloud.com",
    "me.com",
    "aol.com",
    "protonmail.com",
    "proton.me",
];

const DEFAULT_DENYLIST_LOCAL_PARTS: &[&str] = &[
    "noreply",
    "no-reply",
    "do-not-reply",
    "donotreply",
    "mailer-daemon",
    "bounce",
];

const DEFAULT_DENYLIST_DOMAINS: &[&str] = &["example.com", "example.org", "example.net", "test.com"];

/// How deep the deliverability prober goes once a domain resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeMode {
    /// A resolving domain is enough; no per-mailbox network probes.
    Fast,
    /// Allowlist, then SMTP handshake, then port reachability.
    Thorough,
}

/// Effective configuration used by every stage of the pipeline.
#[derive(Debug, Clone)]
pub struct Config {
    // Orchestration
    pub overall_deadline: Duration,
    pub max_concurrency: usize,
    pub max_profile_concurrency: usize,

    // DNS
    pub dns_timeout: Duration,
    pub dns_servers: Vec<String>,

    // Probing
    pub probe_mode: ProbeMode,
    pub smtp_timeout: Duration,
    pub smtp_port: u16,
    pub smtp_sender_email: String,
    pub helo_name: String,
    pub port_timeout: Duration,
    pub probe_ports: Vec<u16>,

    // Candidate generation
    pub max_candidates: usize,
    pub personal_providers: Vec<String>,
    pub infer_company_domain: bool,

    // Allowlist / ranking
    pub known_providers: HashSet<String>,
    pub denylist_local_parts: Vec<String>,
    pub denylist_domains: Vec<String>,
    pub max_alternatives: usize,

    pub email_regex: Regex,
    pub loaded_config_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            overall_deadline: Duration::from_secs(30),
            max_concurrency: 10,
            max_profile_concurrency: 4,
            dns_timeout: Duration::from_secs(5),
            dns_servers: Vec::new(),
            probe_mode: ProbeMode::Thorough,
            smtp_timeout: Duration::from_secs(10),
            smtp_port: 25,
            smtp_sender_email: "verify@email-hunter.dev".to_string(),
            helo_name: "localhost".to_string(),
            port_timeout: Duration::from_secs(5),
            probe_ports: vec![25, 587, 465],
            max_candidates: 40,
            personal_providers: to_strings(DEFAULT_PERSONAL_PROVIDERS),
            infer_company_domain: false,
            known_providers: DEFAULT_KNOWN_PROVIDERS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            denylist_local_parts: to_strings(DEFAULT_DENYLIST_LOCAL_PARTS),
            denylist_domains: to_strings(DEFAULT_DENYLIST_DOMAINS),
            max_alternatives: 3,
            email_regex: Regex::new(STRICT_EMAIL_PATTERN).expect("static email pattern is valid"),
            loaded_config_path: None,
        }
    }
}

impl Config {
    /// Whether `domain` belongs to the universally-deliverable allowlist.
    pub fn is_known_provider(&self, domain: &str) -> bool {
        self.known_providers.contains(&domain.to_lowercase())
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// On-disk (TOML) configuration. Every field is optional; missing values keep
/// the defaults. Durations are in milliseconds.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub network: NetworkSection,
    pub dns: DnsSection,
    pub smtp: SmtpSection,
    pub generation: GenerationSection,
    pub verification: VerificationSection,
    pub ranking: RankingSection,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct NetworkSection {
    pub overall_deadline_ms: Option<u64>,
    pub max_concurrency: Option<usize>,
    pub max_profile_concurrency: Option<usize>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct DnsSection {
    pub dns_timeout_ms: Option<u64>,
    pub dns_servers: Option<Vec<String>>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct SmtpSection {
    pub smtp_timeout_ms: Option<u64>,
    pub smtp_port: Option<u16>,
    pub smtp_sender_email: Option<String>,
    pub helo_name: Option<String>,
    pub port_timeout_ms: Option<u64>,
    pub probe_ports: Option<Vec<u16>>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct GenerationSection {
    pub max_candidates: Option<usize>,
    pub personal_providers: Option<Vec<String>>,
    pub infer_company_domain: Option<bool>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct VerificationSection {
    pub probe_mode: Option<ProbeMode>,
    pub known_providers: Option<Vec<String>>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct RankingSection {
    pub denylist_local_parts: Option<Vec<String>>,
    pub denylist_domains: Option<Vec<String>>,
    pub max_alternatives: Option<usize>,
}
