//! SMTP recipient probing.

mod client;
mod error;

pub use client::SmtpVerifier;

use crate::core::error::{AppError, ProbeError, Result};
use async_trait::async_trait;
use std::time::Duration;
use tokio::net::TcpStream;

/// Well-known MX used to check that outbound port 25 is open at all.
const CONNECTIVITY_PROBE_HOST: &str = "gmail-smtp-in.l.google.com";
const CONNECTIVITY_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Asks a mail host whether it would accept `email` as a recipient.
///
/// `Ok(())` means the server answered `RCPT TO` with a 2xx reply.
#[async_trait]
pub trait HandshakeProbe: Send + Sync {
    async fn check_recipient(
        &self,
        mail_host: &str,
        email: &str,
    ) -> std::result::Result<(), ProbeError>;
}

/// Pre-flight check that outbound connections to port 25 are possible.
///
/// Many residential and cloud networks filter port 25; in that case every
/// handshake tier falls through to port reachability.
pub(crate) async fn test_smtp_connectivity() -> Result<()> {
    tracing::info!(target: "smtp_task",
        "Checking outbound SMTP connectivity to {}:25...", CONNECTIVITY_PROBE_HOST);

    match tokio::time::timeout(
        CONNECTIVITY_PROBE_TIMEOUT,
        TcpStream::connect((CONNECTIVITY_PROBE_HOST, 25)),
    )
    .await
    {
        Ok(Ok(_stream)) => {
            tracing::info!(target: "smtp_task", "Outbound port 25 is reachable.");
            Ok(())
        }
        Ok(Err(e)) => {
            tracing::warn!(target: "smtp_task",
                "Outbound port 25 connection failed: {}. SMTP probes will fall through to port checks.", e);
            Err(AppError::SmtpInconclusive(format!(
                "Cannot connect to {}:25: {}",
                CONNECTIVITY_PROBE_HOST, e
            )))
        }
        Err(_) => {
            tracing::warn!(target: "smtp_task",
                "Outbound port 25 connection timed out after {:?}.", CONNECTIVITY_PROBE_TIMEOUT);
            Err(AppError::SmtpInconclusive(format!(
                "Connection to {}:25 timed out (port 25 likely blocked)",
                CONNECTIVITY_PROBE_HOST
            )))
        }
    }
}
