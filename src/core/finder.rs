use crate::core::config::Config;
use crate::core::error::Result;
use crate::core::models::{FindResult, ProfileRequest, VerificationReport};
use crate::core::ranking::{rank_candidates, select_best};
use crate::utils::dns::{create_resolver, DnsLookup, DomainResolver, TrustDnsLookup};
use crate::utils::patterns::{generate_candidates, name_tokens, organisation_domain};
use crate::utils::ports::{PortProbe, TcpPortProbe};
use crate::utils::smtp::{HandshakeProbe, SmtpVerifier};
use crate::verification::orchestrator::verify_candidates;
use crate::verification::prober::DeliverabilityProber;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

/// Generates, verifies and ranks email candidates for a person.
///
/// Cheap to share behind an `Arc`; each call to [`EmailFinder::find_email`]
/// gets its own domain cache and deadline.
#[derive(Clone)]
pub struct EmailFinder {
    config: Arc<Config>,
    prober: Arc<DeliverabilityProber>,
}

impl EmailFinder {
    /// Creates a finder wired to real DNS, SMTP and TCP backends.
    pub(crate) async fn new(config: &Config) -> Result<Self> {
        tracing::debug!("Initializing EmailFinder components...");
        let resolver = create_resolver(config)?;
        tracing::debug!("DNS resolver initialized.");
        let smtp_verifier = SmtpVerifier::new(config)?;
        tracing::debug!("SMTP verifier initialized.");

        let finder = Self::with_backends(
            config,
            Arc::new(TrustDnsLookup::new(resolver)),
            Arc::new(smtp_verifier),
            Arc::new(TcpPortProbe::new(config.port_timeout)),
        );
        tracing::info!("EmailFinder initialized successfully.");
        Ok(finder)
    }

    /// Creates a finder over caller-supplied network backends.
    pub fn with_backends(
        config: &Config,
        dns: Arc<dyn DnsLookup>,
        handshake: Arc<dyn HandshakeProbe>,
        ports: Arc<dyn PortProbe>,
    ) -> Self {
        let config = Arc::new(config.clone());
        let resolver = DomainResolver::new(dns, config.dns_timeout);
        let prober = DeliverabilityProber::new(Arc::clone(&config), resolver, handshake, ports);
        Self {
            config,
            prober: Arc::new(prober),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs the full pipeline for one profile. Never fails: missing data and
    /// network trouble show up as an empty or partial result.
    pub async fn find_email(&self, request: &ProfileRequest) -> FindResult {
        let profile = &request.profile;
        let task_label = profile.label();
        tracing::info!(target: "find_email_task", "[{}] Starting email discovery", task_label);
        let start_time = Instant::now();

        let candidates = generate_candidates(&self.config, profile, &request.seed_emails);
        let mut verification_log = BTreeMap::new();

        if candidates.is_empty() {
            tracing::warn!(target: "find_email_task", "[{}] No email candidates generated.", task_label);
            verification_log.insert(
                "candidates".to_string(),
                "No candidates generated from the supplied profile".to_string(),
            );
            return FindResult {
                profile: profile.clone(),
                candidates_generated: 0,
                candidates_verified: 0,
                ranked_emails: Vec::new(),
                selection: select_best(&[], self.config.max_alternatives),
                timed_out: false,
                elapsed_ms: u64::try_from(start_time.elapsed().as_millis()).unwrap_or(u64::MAX),
                verification_log,
            };
        }
        tracing::info!(target: "find_email_task", "[{}] Generated {} candidates to assess.", task_label, candidates.len());
        tracing::trace!(target: "find_email_task", "[{}] Candidate list (ordered): {:?}", task_label, candidates);

        let report = verify_candidates(
            Arc::clone(&self.prober),
            candidates.clone(),
            self.config.max_concurrency,
            self.config.overall_deadline,
        )
        .await;
        if report.timed_out {
            tracing::warn!(target: "find_email_task",
                "[{}] Verification deadline reached; ranking {} of {} verified candidates.",
                task_label, report.results.len(), candidates.len());
        }

        let tokens = name_tokens(&profile.name);
        let organisation = organisation_domain(profile);
        let ranked = rank_candidates(
            &self.config,
            &candidates,
            &report,
            &tokens,
            organisation.as_deref(),
        );
        let selection = select_best(&ranked, self.config.max_alternatives);

        record_report(&report, &mut verification_log);

        match &selection.best {
            Some(best) => tracing::info!(target: "find_email_task",
                "[{}] Most likely email: {} (confidence {}/100, method {})",
                task_label,
                best.email,
                best.confidence,
                best.method.map_or("unverified", |m| m.as_str())),
            None => tracing::info!(target: "find_email_task", "[{}] No plausible email found.", task_label),
        }

        let elapsed = start_time.elapsed();
        tracing::info!(target: "find_email_task", "[{}] Email discovery finished in {:.2?}.", task_label, elapsed);

        FindResult {
            profile: profile.clone(),
            candidates_generated: candidates.len(),
            candidates_verified: report.results.len(),
            ranked_emails: ranked,
            selection,
            timed_out: report.timed_out,
            elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            verification_log,
        }
    }
}

/// Flattens domain verdicts and per-candidate outcomes into log lines.
fn record_report(report: &VerificationReport, log: &mut BTreeMap<String, String>) {
    for (domain, verdict) in &report.verdicts {
        let line = match &verdict.mail_host {
            Some(host) => format!("{:?} via {:?} ({})", verdict.status, verdict.method, host),
            None => format!("{:?} via {:?}", verdict.status, verdict.method),
        };
        log.insert(domain.clone(), line);
    }
    for result in &report.results {
        log.insert(
            result.candidate().full_address.clone(),
            format!("{}: {}", result.method(), result.detail()),
        );
    }
    if report.timed_out {
        log.insert(
            "deadline".to_string(),
            format!("Timed out after {:?}", report.elapsed),
        );
    }
}
