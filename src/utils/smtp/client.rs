//! Provides the SmtpVerifier client for probing recipients via SMTP.

use super::error::{code_value, handle_smtp_error};
use super::HandshakeProbe;
use crate::core::config::Config;
use crate::core::error::{AppError, ProbeError, Result};

use async_trait::async_trait;
use lettre::transport::smtp::client::SmtpConnection;
use lettre::transport::smtp::commands::{Mail, Rcpt};
use lettre::transport::smtp::extension::ClientId;
use lettre::transport::smtp::response::Severity;
use lettre::Address;
use std::str::FromStr;
use std::time::Duration;

/// Connection parameters for one handshake.
#[derive(Clone)]
struct ConnectionParams {
    mail_host: String,
    port: u16,
    helo_name: ClientId,
    timeout: Duration,
}

/// Asks a mail host whether it would accept a recipient, without sending a
/// message. Plaintext only; the exchange stops after `RCPT TO`.
#[derive(Clone)]
pub struct SmtpVerifier {
    sender: Address,
    helo_name: String,
    port: u16,
    timeout: Duration,
}

impl SmtpVerifier {
    pub fn new(config: &Config) -> Result<Self> {
        let sender = Address::from_str(&config.smtp_sender_email)
            .map_err(|e| AppError::Config(format!("Invalid sender email in config: {}", e)))?;
        Ok(Self {
            sender,
            helo_name: config.helo_name.clone(),
            port: config.smtp_port,
            timeout: config.smtp_timeout,
        })
    }

    /// Blocking EHLO / MAIL FROM / RCPT TO exchange. `SmtpConnection::connect`
    /// reads the greeting and performs EHLO itself.
    fn handshake(
        params: &ConnectionParams,
        sender: Address,
        recipient: Address,
    ) -> std::result::Result<(), ProbeError> {
        let server = (params.mail_host.as_str(), params.port);
        let mut conn =
            SmtpConnection::connect(server, Some(params.timeout), &params.helo_name, None, None)
                .map_err(|e| handle_smtp_error(&e, params.timeout, &params.mail_host))?;

        tracing::debug!(target: "smtp_task",
            "Connected to {}:{}, sending MAIL FROM:<{}>", params.mail_host, params.port, sender);
        if let Err(e) = conn.command(Mail::new(Some(sender), vec![])) {
            conn.abort();
            return Err(handle_smtp_error(&e, params.timeout, &params.mail_host));
        }

        tracing::debug!(target: "smtp_task", "Sending RCPT TO:<{}> to {}", recipient, params.mail_host);
        let outcome = match conn.command(Rcpt::new(recipient, vec![])) {
            Ok(response) if response.code().severity == Severity::PositiveCompletion => Ok(()),
            Ok(response) => Err(ProbeError::Rejected {
                code: code_value(&response.code()),
                message: response.message().collect::<Vec<&str>>().join(" "),
            }),
            Err(e) => Err(handle_smtp_error(&e, params.timeout, &params.mail_host)),
        };

        if conn.quit().is_err() {
            tracing::trace!(target: "smtp_task", "QUIT to {} failed; connection dropped.", params.mail_host);
        }
        outcome
    }
}

#[async_trait]
impl HandshakeProbe for SmtpVerifier {
    async fn check_recipient(
        &self,
        mail_host: &str,
        email: &str,
    ) -> std::result::Result<(), ProbeError> {
        let recipient = Address::from_str(email).map_err(|e| ProbeError::Rejected {
            code: 0,
            message: format!("Recipient refused by client: {}", e),
        })?;

        let params = ConnectionParams {
            mail_host: mail_host.to_string(),
            port: self.port,
            helo_name: ClientId::Domain(self.helo_name.clone()),
            timeout: self.timeout,
        };
        let sender = self.sender.clone();

        tracing::debug!(target: "smtp_task", "Starting SMTP check for <{}> via {}:{}", email, mail_host, self.port);

        // The blocking exchange keeps running after an outer timeout but is
        // bounded by its own socket timeouts.
        let handle =
            tokio::task::spawn_blocking(move || Self::handshake(&params, sender, recipient));
        let outcome = match tokio::time::timeout(self.timeout, handle).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(join_error)) => Err(ProbeError::Connection(format!(
                "SMTP task failed: {}",
                join_error
            ))),
            Err(_) => Err(ProbeError::Timeout(self.timeout)),
        };

        match &outcome {
            Ok(()) => tracing::info!(target: "smtp_task", "{} accepted RCPT TO:<{}>", mail_host, email),
            Err(e) => tracing::debug!(target: "smtp_task", "SMTP check for <{}> via {} failed: {}", email, mail_host, e),
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ConfigBuilder;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;

    /// Serves one SMTP session on 127.0.0.1, answering `RCPT TO` with
    /// `rcpt_reply` and every other command positively. Returns the port.
    fn scripted_server(rcpt_reply: &'static str) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        std::thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut writer = stream;
            writer.write_all(b"220 mx.example-corp.com ESMTP\r\n").unwrap();
            let mut line = String::new();
            loop {
                line.clear();
                if reader.read_line(&mut line).unwrap_or(0) == 0 {
                    break;
                }
                let verb = line.get(..4).unwrap_or("").to_ascii_uppercase();
                let reply = match verb.as_str() {
                    "EHLO" | "HELO" => "250 mx.example-corp.com\r\n",
                    "MAIL" => "250 2.1.0 Sender OK\r\n",
                    "RCPT" => rcpt_reply,
                    "QUIT" => {
                        let _ = writer.write_all(b"221 2.0.0 Bye\r\n");
                        break;
                    }
                    _ => "500 5.5.1 Unrecognized command\r\n",
                };
                if writer.write_all(reply.as_bytes()).is_err() {
                    break;
                }
            }
        });
        port
    }

    fn verifier(port: u16, timeout: Duration) -> SmtpVerifier {
        let config = ConfigBuilder::new()
            .without_default_files()
            .smtp_port(port)
            .smtp_timeout(timeout)
            .build()
            .unwrap();
        SmtpVerifier::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_accepted_recipient() {
        let port = scripted_server("250 2.1.5 Recipient OK\r\n");
        let outcome = verifier(port, Duration::from_secs(5))
            .check_recipient("127.0.0.1", "jane.doe@example-corp.com")
            .await;
        assert!(outcome.is_ok(), "{:?}", outcome);
    }

    #[tokio::test]
    async fn test_unknown_recipient_is_rejected_with_code() {
        let port = scripted_server("550 5.1.1 User unknown\r\n");
        let outcome = verifier(port, Duration::from_secs(5))
            .check_recipient("127.0.0.1", "nobody@example-corp.com")
            .await;
        assert!(
            matches!(outcome, Err(ProbeError::Rejected { code: 550, .. })),
            "{:?}",
            outcome
        );
    }

    #[tokio::test]
    async fn test_greylisting_reply_is_rejected_with_code() {
        let port = scripted_server("451 4.7.1 Try again later\r\n");
        let outcome = verifier(port, Duration::from_secs(5))
            .check_recipient("127.0.0.1", "jane.doe@example-corp.com")
            .await;
        assert!(
            matches!(outcome, Err(ProbeError::Rejected { code: 451, .. })),
            "{:?}",
            outcome
        );
    }

    #[tokio::test]
    async fn test_silent_server_times_out() {
        // Accepted by the kernel backlog but never greeted.
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let outcome = verifier(port, Duration::from_millis(300))
            .check_recipient("127.0.0.1", "jane.doe@example-corp.com")
            .await;
        assert!(matches!(outcome, Err(ProbeError::Timeout(_))), "{:?}", outcome);
        drop(listener);
    }

    #[tokio::test]
    async fn test_refused_connection_is_blocked() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let outcome = verifier(port, Duration::from_secs(2))
            .check_recipient("127.0.0.1", "jane.doe@example-corp.com")
            .await;
        assert!(matches!(outcome, Err(ProbeError::Blocked(_))), "{:?}", outcome);
    }

    #[test]
    fn test_verifier_uses_configured_sender_and_port() {
        let config = ConfigBuilder::new()
            .without_default_files()
            .smtp_port(2525)
            .smtp_sender_email("probe@example-corp.com")
            .build()
            .unwrap();
        let verifier = SmtpVerifier::new(&config).unwrap();
        assert_eq!(verifier.port, 2525);
        assert_eq!(verifier.sender.to_string(), "probe@example-corp.com");
    }

    #[tokio::test]
    async fn test_unparseable_recipient_is_rejected_locally() {
        let config = ConfigBuilder::new().without_default_files().build().unwrap();
        let verifier = SmtpVerifier::new(&config).unwrap();
        let outcome = verifier.check_recipient("mx.example-corp.com", "not an address").await;
        assert!(matches!(outcome, Err(ProbeError::Rejected { code: 0, .. })));
    }
}
