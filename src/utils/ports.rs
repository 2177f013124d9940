//! TCP reachability probing of mail ports.

use crate::core::error::ProbeError;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::time::Duration;
use tokio::net::TcpStream;

/// Opens (and immediately drops) a TCP connection to `host:port`.
#[async_trait]
pub trait PortProbe: Send + Sync {
    async fn connect(&self, host: &str, port: u16) -> Result<(), ProbeError>;
}

/// `PortProbe` over `tokio::net::TcpStream`.
#[derive(Debug, Clone)]
pub struct TcpPortProbe {
    timeout: Duration,
}

impl TcpPortProbe {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl PortProbe for TcpPortProbe {
    async fn connect(&self, host: &str, port: u16) -> Result<(), ProbeError> {
        match tokio::time::timeout(self.timeout, TcpStream::connect((host, port))).await {
            Ok(Ok(_stream)) => {
                tracing::debug!(target: "port_task", "{}:{} is reachable", host, port);
                Ok(())
            }
            Ok(Err(e)) => {
                tracing::debug!(target: "port_task", "{}:{} refused or failed: {}", host, port, e);
                match e.kind() {
                    ErrorKind::ConnectionRefused | ErrorKind::PermissionDenied => {
                        Err(ProbeError::Blocked(format!("{}:{} {}", host, port, e)))
                    }
                    _ => Err(ProbeError::Connection(format!("{}:{} {}", host, port, e))),
                }
            }
            Err(_) => {
                tracing::debug!(target: "port_task", "{}:{} timed out after {:?}", host, port, self.timeout);
                Err(ProbeError::Timeout(self.timeout))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_open_local_port_is_reachable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let probe = TcpPortProbe::new(Duration::from_secs(2));
        assert!(probe.connect("127.0.0.1", port).await.is_ok());
    }

    #[tokio::test]
    async fn test_closed_local_port_fails() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        let probe = TcpPortProbe::new(Duration::from_secs(2));
        assert!(probe.connect("127.0.0.1", port).await.is_err());
    }
}
