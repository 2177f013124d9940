//! Classification of `lettre` SMTP errors into probe outcomes.

use crate::core::error::ProbeError;
use lettre::transport::smtp::response::Code;
use lettre::transport::smtp::Error as SmtpError;
use std::time::Duration;

/// Numeric form of a reply code, e.g. `550`.
pub(crate) fn code_value(code: &Code) -> u16 {
    code.severity as u16 * 100 + code.category as u16 * 10 + code.detail as u16
}

/// Interprets a `lettre::transport::smtp::Error` as a [`ProbeError`].
///
/// Replies carrying a status code are rejections (4xx included; greylisting
/// is not retried). Connection-level failures that look like a filtered
/// port are reported as `Blocked`.
pub(crate) fn handle_smtp_error(error: &SmtpError, timeout: Duration, server: &str) -> ProbeError {
    if error.is_timeout() {
        tracing::debug!(target: "smtp_task", "SMTP exchange with {} timed out: {}", server, error);
        return ProbeError::Timeout(timeout);
    }

    if let Some(code) = error.status() {
        let code = code_value(&code);
        if error.is_permanent() {
            tracing::debug!(target: "smtp_task", "{} rejected with permanent error {}: {}", server, code, error);
        } else {
            tracing::debug!(target: "smtp_task", "{} answered with transient error {}: {}", server, code, error);
        }
        return ProbeError::Rejected {
            code,
            message: error.to_string(),
        };
    }

    let err_string = error.to_string().to_lowercase();
    // Socket read timeouts surface as EAGAIN on some platforms.
    if err_string.contains("timed out")
        || err_string.contains("temporarily unavailable")
        || err_string.contains("would block")
    {
        return ProbeError::Timeout(timeout);
    }
    if err_string.contains("connection refused")
        || err_string.contains("network is unreachable")
        || err_string.contains("no route to host")
        || err_string.contains("permission denied")
    {
        tracing::warn!(target: "smtp_task",
            "Connection to {} failed ({}). Outbound port 25 may be blocked.", server, error);
        return ProbeError::Blocked(error.to_string());
    }

    tracing::debug!(target: "smtp_task", "Unclassified SMTP error for {}: {}", server, error);
    ProbeError::Connection(error.to_string())
}
