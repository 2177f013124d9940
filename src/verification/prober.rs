//! Per-candidate deliverability checks.

use crate::core::config::{Config, ProbeMode};
use crate::core::error::ProbeError;
use crate::core::models::{CandidateEmail, VerificationMethod, VerificationResult};
use crate::utils::cache::DomainCache;
use crate::utils::dns::DomainResolver;
use crate::utils::ports::PortProbe;
use crate::utils::smtp::HandshakeProbe;

use std::sync::Arc;

/// Runs the tiered checks for one candidate: domain verdict, known provider,
/// SMTP handshake, then port reachability. The first positive tier wins.
#[derive(Clone)]
pub(crate) struct DeliverabilityProber {
    config: Arc<Config>,
    resolver: DomainResolver,
    handshake: Arc<dyn HandshakeProbe>,
    ports: Arc<dyn PortProbe>,
}

impl DeliverabilityProber {
    pub(crate) fn new(
        config: Arc<Config>,
        resolver: DomainResolver,
        handshake: Arc<dyn HandshakeProbe>,
        ports: Arc<dyn PortProbe>,
    ) -> Self {
        Self {
            config,
            resolver,
            handshake,
            ports,
        }
    }

    pub(crate) async fn probe(
        &self,
        cache: &DomainCache,
        candidate: CandidateEmail,
    ) -> VerificationResult {
        let verdict = self.resolver.resolve(cache, &candidate.domain).await;
        if !verdict.is_valid() {
            return VerificationResult::failed(
                candidate,
                format!("Domain {} has no MX or address records", verdict.domain),
            );
        }

        if self.config.is_known_provider(&candidate.domain) {
            return VerificationResult::new(
                candidate,
                VerificationMethod::KnownProvider,
                "Domain is a known mail provider".to_string(),
            );
        }

        let Some(mail_host) = verdict.mail_host.clone() else {
            return VerificationResult::failed(candidate, "No mail host resolved".to_string());
        };

        if self.config.probe_mode == ProbeMode::Fast {
            return VerificationResult::new(
                candidate,
                VerificationMethod::DomainResolved,
                format!("Domain resolves ({:?}) via {}", verdict.method, mail_host),
            );
        }

        let smtp_failure = match self
            .handshake
            .check_recipient(&mail_host, &candidate.full_address)
            .await
        {
            Ok(()) => {
                return VerificationResult::new(
                    candidate,
                    VerificationMethod::SmtpAccepted,
                    format!("RCPT TO accepted by {}", mail_host),
                );
            }
            Err(e) => e,
        };
        tracing::debug!(target: "smtp_task",
            "Handshake tier failed for {}: {}. Falling back to port checks.", candidate, smtp_failure);

        let mut port_failures: Vec<(u16, ProbeError)> = Vec::new();
        for &port in &self.config.probe_ports {
            match self.ports.connect(&mail_host, port).await {
                Ok(()) => {
                    return VerificationResult::new(
                        candidate,
                        VerificationMethod::PortReachable,
                        format!(
                            "{}:{} reachable (SMTP check: {})",
                            mail_host, port, smtp_failure
                        ),
                    );
                }
                Err(e) => port_failures.push((port, e)),
            }
        }

        let ports_summary = port_failures
            .iter()
            .map(|(port, e)| format!("{}: {}", port, e))
            .collect::<Vec<_>>()
            .join("; ");
        VerificationResult::failed(
            candidate,
            format!(
                "SMTP check failed ({}); no mail port reachable on {} [{}]",
                smtp_failure, mail_host, ports_summary
            ),
        )
    }
}
