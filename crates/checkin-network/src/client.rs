//! Control-plane client.
//!
//! Each request opens a short-lived connection, sends one line, reads one
//! line and closes. Connect, send and receive are each bounded by the
//! configured timeout. There is no retry; the caller decides what a failure
//! means.
//!
//! ```no_run
//! use checkin_core::{CodeKind, Submission};
//! use checkin_network::{ControlClient, ControlClientConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ControlClient::new(ControlClientConfig::default());
//! let response = client
//!     .submit(Submission::new("S100", CodeKind::Identity, 1))
//!     .await?;
//! println!("{}", response.message);
//! # Ok(())
//! # }
//! ```

use std::net::SocketAddr;
use std::time::Duration;

use checkin_core::constants::DEFAULT_SUBMIT_TIMEOUT_MS;
use checkin_core::{SessionId, Submission};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LinesCodec};
use tracing::{debug, trace, warn};

use crate::error::ControlError;
use crate::protocol::{ControlRequest, ControlResponse};

#[derive(Debug, Clone)]
pub struct ControlClientConfig {
    pub server_addr: SocketAddr,

    /// Timeout for each of connect, send and receive.
    pub timeout: Duration,
}

impl Default for ControlClientConfig {
    fn default() -> Self {
        Self {
            server_addr: SocketAddr::from(([127, 0, 0, 1], 5000)),
            timeout: Duration::from_millis(DEFAULT_SUBMIT_TIMEOUT_MS),
        }
    }
}

impl ControlClientConfig {
    pub fn new(server_addr: SocketAddr) -> Self {
        Self {
            server_addr,
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Clone)]
pub struct ControlClient {
    config: ControlClientConfig,
}

impl ControlClient {
    pub fn new(config: ControlClientConfig) -> Self {
        Self { config }
    }

    pub fn server_addr(&self) -> SocketAddr {
        self.config.server_addr
    }

    pub async fn submit(&self, submission: Submission) -> Result<ControlResponse, ControlError> {
        self.request(&ControlRequest::Submit(submission)).await
    }

    pub async fn activate(&self, session_id: SessionId) -> Result<ControlResponse, ControlError> {
        self.request(&ControlRequest::Activate { session_id }).await
    }

    pub async fn deactivate(&self, session_id: SessionId) -> Result<ControlResponse, ControlError> {
        self.request(&ControlRequest::Deactivate { session_id })
            .await
    }

    pub async fn status(&self) -> Result<ControlResponse, ControlError> {
        self.request(&ControlRequest::Status).await
    }

    /// One request/response round trip on a fresh connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the server cannot be reached, does not answer in
    /// time, closes the connection early or sends an unparseable line. A
    /// rejected request is not an error; check `success` on the response.
    pub async fn request(&self, request: &ControlRequest) -> Result<ControlResponse, ControlError> {
        let timeout = self.config.timeout;
        let millis = timeout.as_millis() as u64;

        let stream = tokio::time::timeout(timeout, TcpStream::connect(self.config.server_addr))
            .await
            .map_err(|_| {
                warn!(addr = %self.config.server_addr, "Control plane connect timeout");
                ControlError::ConnectionTimeout(millis)
            })??;
        if let Err(e) = stream.set_nodelay(true) {
            debug!(error = %e, "Failed to set TCP_NODELAY");
        }

        let mut framed = Framed::new(stream, LinesCodec::new());
        let line = serde_json::to_string(request)?;
        trace!(op = request.op(), "Sending control request");

        tokio::time::timeout(timeout, framed.send(line))
            .await
            .map_err(|_| ControlError::WriteTimeout(millis))??;

        let reply = match tokio::time::timeout(timeout, framed.next()).await {
            Ok(Some(Ok(reply))) => reply,
            Ok(Some(Err(e))) => return Err(e.into()),
            Ok(None) => {
                return Err(ControlError::ConnectionLost(
                    "server closed connection before replying".to_string(),
                ));
            }
            Err(_) => return Err(ControlError::ReadTimeout(millis)),
        };

        let response: ControlResponse = serde_json::from_str(&reply)?;
        trace!(op = request.op(), success = response.success, "Control response");
        Ok(response)
    }
}
