//! DNS lookups and the cached domain resolver.

use crate::core::config::Config;
use crate::core::error::{AppError, LookupError, Result};
use crate::core::models::DomainVerdict;
use crate::utils::cache::DomainCache;

use async_trait::async_trait;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use trust_dns_resolver::config::{NameServerConfigGroup, ResolverConfig, ResolverOpts};
use trust_dns_resolver::error::{ResolveError, ResolveErrorKind};
use trust_dns_resolver::system_conf::read_system_conf;
use trust_dns_resolver::TokioAsyncResolver;

/// A mail exchange host for a domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailServer {
    pub exchange: String,
    pub preference: u16,
}

/// The DNS queries the pipeline needs. Implemented over a real resolver in
/// production and by in-memory doubles in tests.
#[async_trait]
pub trait DnsLookup: Send + Sync {
    /// MX records for `domain`, in any order.
    async fn mail_servers(&self, domain: &str) -> std::result::Result<Vec<MailServer>, LookupError>;

    /// Succeeds if `domain` has at least one A or AAAA record.
    async fn address(&self, domain: &str) -> std::result::Result<(), LookupError>;
}

/// Production lookup backed by `trust_dns_resolver`.
pub struct TrustDnsLookup {
    resolver: TokioAsyncResolver,
}

impl TrustDnsLookup {
    pub fn new(resolver: TokioAsyncResolver) -> Self {
        Self { resolver }
    }
}

fn classify(domain: &str, error: &ResolveError) -> LookupError {
    match error.kind() {
        ResolveErrorKind::NoRecordsFound { .. } => LookupError::NotFound(domain.to_string()),
        ResolveErrorKind::Timeout => LookupError::Timeout,
        _ => LookupError::Transient(error.to_string()),
    }
}

#[async_trait]
impl DnsLookup for TrustDnsLookup {
    async fn mail_servers(&self, domain: &str) -> std::result::Result<Vec<MailServer>, LookupError> {
        let lookup = self
            .resolver
            .mx_lookup(domain)
            .await
            .map_err(|e| classify(domain, &e))?;
        Ok(lookup
            .iter()
            .map(|mx| MailServer {
                exchange: mx.exchange().to_utf8(),
                preference: mx.preference(),
            })
            .collect())
    }

    async fn address(&self, domain: &str) -> std::result::Result<(), LookupError> {
        let lookup = self
            .resolver
            .lookup_ip(domain)
            .await
            .map_err(|e| classify(domain, &e))?;
        if lookup.iter().next().is_some() {
            Ok(())
        } else {
            Err(LookupError::NotFound(domain.to_string()))
        }
    }
}

/// Applies the configured per-query timeout and a single attempt, so the
/// resolver never retries past `dns_timeout`.
fn with_probe_limits(mut opts: ResolverOpts, config: &Config) -> ResolverOpts {
    opts.timeout = config.dns_timeout;
    opts.attempts = 1;
    opts
}

/// Builds the async resolver from configuration.
///
/// Custom name servers (plain UDP/TCP on port 53) replace the system
/// configuration when provided.
pub(crate) fn create_resolver(config: &Config) -> Result<TokioAsyncResolver> {
    let mut opts = with_probe_limits(ResolverOpts::default(), config);

    if config.dns_servers.is_empty() {
        tracing::debug!(target: "dns_task", "Using system DNS configuration.");
        let resolver_config = match read_system_conf() {
            Ok((system_config, system_opts)) => {
                opts = with_probe_limits(system_opts, config);
                system_config
            }
            Err(e) => {
                tracing::warn!(target: "dns_task", "System DNS configuration unavailable ({}); falling back to defaults.", e);
                ResolverConfig::default()
            }
        };
        return Ok(TokioAsyncResolver::tokio(resolver_config, opts));
    }

    let ips = config
        .dns_servers
        .iter()
        .map(|s| {
            s.trim()
                .parse::<IpAddr>()
                .map_err(|e| AppError::Config(format!("Invalid DNS server '{}': {}", s, e)))
        })
        .collect::<Result<Vec<IpAddr>>>()?;
    tracing::debug!(target: "dns_task", "Using custom DNS servers: {:?}", ips);

    let group = NameServerConfigGroup::from_ips_clear(&ips, 53, true);
    let resolver_config = ResolverConfig::from_parts(None, vec![], group);
    Ok(TokioAsyncResolver::tokio(resolver_config, opts))
}

/// True for the root exchange `.` a domain publishes to refuse all mail.
fn is_null_mx(server: &MailServer) -> bool {
    server.exchange.trim_end_matches('.').is_empty()
}

/// Picks the exchange with the lowest preference value.
pub(crate) fn preferred_mail_server(mut servers: Vec<MailServer>) -> Option<MailServer> {
    servers.retain(|s| !is_null_mx(s));
    servers.sort_by(|a, b| {
        a.preference
            .cmp(&b.preference)
            .then_with(|| a.exchange.cmp(&b.exchange))
    });
    servers.into_iter().next()
}

/// Decides whether a domain can plausibly receive mail, memoized per run.
#[derive(Clone)]
pub struct DomainResolver {
    lookup: Arc<dyn DnsLookup>,
    timeout: Duration,
}

impl DomainResolver {
    pub fn new(lookup: Arc<dyn DnsLookup>, timeout: Duration) -> Self {
        Self { lookup, timeout }
    }

    /// Cached verdict for `domain`, resolving it on a miss.
    pub async fn resolve(&self, cache: &DomainCache, domain: &str) -> DomainVerdict {
        let domain = domain.trim().trim_end_matches('.').to_lowercase();
        cache
            .get_or_resolve(&domain, || self.resolve_uncached(&domain))
            .await
    }

    /// MX first, then A/AAAA. Timeouts and errors count as "not found". A null
    /// MX is final and skips the address fallback.
    async fn resolve_uncached(&self, domain: &str) -> DomainVerdict {
        tracing::debug!(target: "dns_task", "Resolving mail records for {}", domain);

        let mx = match tokio::time::timeout(self.timeout, self.lookup.mail_servers(domain)).await {
            Ok(result) => result,
            Err(_) => Err(LookupError::Timeout),
        };
        match mx {
            Ok(servers) if !servers.is_empty() && servers.iter().all(is_null_mx) => {
                tracing::info!(target: "dns_task", "{} publishes a null MX and accepts no mail", domain);
                return DomainVerdict::unresolvable(domain);
            }
            Ok(servers) => {
                if let Some(server) = preferred_mail_server(servers) {
                    tracing::debug!(target: "dns_task",
                        "{} resolved via MX {} (preference {})", domain, server.exchange, server.preference);
                    return DomainVerdict::via_mx(domain, &server.exchange);
                }
                tracing::debug!(target: "dns_task", "{} returned an empty MX set", domain);
            }
            Err(e) => {
                tracing::debug!(target: "dns_task", "MX lookup for {} failed: {}", domain, e);
            }
        }

        let address = match tokio::time::timeout(self.timeout, self.lookup.address(domain)).await {
            Ok(result) => result,
            Err(_) => Err(LookupError::Timeout),
        };
        match address {
            Ok(()) => {
                tracing::debug!(target: "dns_task", "{} resolved via address record", domain);
                DomainVerdict::via_address(domain)
            }
            Err(e) => {
                tracing::info!(target: "dns_task", "{} is unresolvable: {}", domain, e);
                DomainVerdict::unresolvable(domain)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{DomainStatus, ResolutionMethod};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct StaticDns {
        mx: HashMap<String, Vec<MailServer>>,
        addresses: Vec<String>,
        hang: bool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl DnsLookup for StaticDns {
        async fn mail_servers(
            &self,
            domain: &str,
        ) -> std::result::Result<Vec<MailServer>, LookupError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.hang {
                std::future::pending::<()>().await;
            }
            self.mx
                .get(domain)
                .cloned()
                .ok_or_else(|| LookupError::NotFound(domain.to_string()))
        }

        async fn address(&self, domain: &str) -> std::result::Result<(), LookupError> {
            if self.hang {
                std::future::pending::<()>().await;
            }
            if self.addresses.iter().any(|d| d == domain) {
                Ok(())
            } else {
                Err(LookupError::NotFound(domain.to_string()))
            }
        }
    }

    fn mx(exchange: &str, preference: u16) -> MailServer {
        MailServer {
            exchange: exchange.to_string(),
            preference,
        }
    }

    #[test]
    fn test_resolver_opts_follow_config() {
        let config = crate::core::config::ConfigBuilder::new()
            .without_default_files()
            .dns_timeout(Duration::from_millis(750))
            .build()
            .unwrap();
        let opts = with_probe_limits(ResolverOpts::default(), &config);
        assert_eq!(opts.timeout, Duration::from_millis(750));
        assert_eq!(opts.attempts, 1);
    }

    #[test]
    fn test_preferred_mail_server_lowest_preference() {
        let chosen = preferred_mail_server(vec![
            mx("alt2.mx.example-corp.com.", 20),
            mx("mx.example-corp.com.", 5),
            mx("alt1.mx.example-corp.com.", 10),
        ])
        .unwrap();
        assert_eq!(chosen.exchange, "mx.example-corp.com.");
        assert!(preferred_mail_server(vec![mx(".", 0)]).is_none());
    }

    #[tokio::test]
    async fn test_mx_then_address_fallback() {
        let mut dns = StaticDns::default();
        dns.mx.insert(
            "example-corp.com".to_string(),
            vec![mx("mx2.example-corp.com.", 20), mx("mx1.example-corp.com.", 10)],
        );
        dns.addresses.push("bigcorp.com".to_string());
        let resolver = DomainResolver::new(Arc::new(dns), Duration::from_secs(1));
        let cache = DomainCache::new();

        let mx_verdict = resolver.resolve(&cache, "Example-Corp.com").await;
        assert_eq!(mx_verdict.status, DomainStatus::Valid);
        assert_eq!(mx_verdict.method, ResolutionMethod::MxRecord);
        assert_eq!(mx_verdict.mail_host.as_deref(), Some("mx1.example-corp.com"));

        let a_verdict = resolver.resolve(&cache, "bigcorp.com").await;
        assert_eq!(a_verdict.method, ResolutionMethod::AddressRecord);
        assert_eq!(a_verdict.mail_host.as_deref(), Some("bigcorp.com"));

        let missing = resolver.resolve(&cache, "nowhere.invalid").await;
        assert_eq!(missing.status, DomainStatus::Invalid);
        assert_eq!(missing.method, ResolutionMethod::Unresolvable);
        assert!(missing.mail_host.is_none());
    }

    #[tokio::test]
    async fn test_null_mx_is_unresolvable_without_address_fallback() {
        let mut dns = StaticDns::default();
        dns.mx
            .insert("nomail.bigcorp.com".to_string(), vec![mx(".", 0)]);
        dns.addresses.push("nomail.bigcorp.com".to_string());
        let resolver = DomainResolver::new(Arc::new(dns), Duration::from_secs(1));

        let verdict = resolver.resolve(&DomainCache::new(), "nomail.bigcorp.com").await;
        assert_eq!(verdict.status, DomainStatus::Invalid);
        assert_eq!(verdict.method, ResolutionMethod::Unresolvable);
        assert!(verdict.mail_host.is_none());
    }

    #[tokio::test]
    async fn test_empty_mx_set_falls_back_to_address() {
        let mut dns = StaticDns::default();
        dns.mx.insert("bigcorp.com".to_string(), Vec::new());
        dns.addresses.push("bigcorp.com".to_string());
        let resolver = DomainResolver::new(Arc::new(dns), Duration::from_secs(1));

        let verdict = resolver.resolve(&DomainCache::new(), "bigcorp.com").await;
        assert_eq!(verdict.method, ResolutionMethod::AddressRecord);
    }

    #[tokio::test]
    async fn test_cache_hit_skips_lookup() {
        let dns = Arc::new(StaticDns::default());
        let resolver = DomainResolver::new(dns.clone(), Duration::from_secs(1));
        let cache = DomainCache::new();

        resolver.resolve(&cache, "nowhere.invalid").await;
        resolver.resolve(&cache, "nowhere.invalid").await;
        assert_eq!(dns.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_hanging_dns_counts_as_not_found() {
        let dns = StaticDns {
            hang: true,
            ..StaticDns::default()
        };
        let resolver = DomainResolver::new(Arc::new(dns), Duration::from_millis(50));
        let verdict = resolver.resolve(&DomainCache::new(), "slow.example-corp.com").await;
        assert_eq!(verdict.status, DomainStatus::Invalid);
    }
}
