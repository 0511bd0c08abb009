//! Control-plane TCP server.
//!
//! Accepts newline-delimited JSON requests and hands each one to a
//! [`ControlHandler`]. Each connection runs in its own task; requests on one
//! connection are answered in order.
//!
//! ```text
//! checkin-listener ┐
//!                  ├──> ControlServer ──> ControlHandler (ScanEngine)
//! admin tooling   ─┘        │
//!                           └──> LinesCodec (JSON per line)
//! ```
//!
//! # Locality
//!
//! Only loopback peers are served. Any other peer gets a single `forbidden`
//! response and the connection is closed, unless `development_mode` is set.
//!
//! # Malformed input
//!
//! A line that is not a valid request gets `invalid_request` and the
//! connection stays open. A line longer than `max_line_length` also gets
//! `invalid_request`, after which the connection is closed.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use checkin_core::constants::MAX_REQUEST_LINE_LENGTH;
use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::{Framed, LinesCodec, LinesCodecError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::error::ControlError;
use crate::protocol::{ControlRequest, ControlResponse};

/// Application side of the control plane.
///
/// Implementations decide how requests are applied; the server only frames
/// and routes them. The returned future must be `Send` because every
/// connection is served from its own task.
pub trait ControlHandler: Send + Sync + 'static {
    fn handle(&self, request: ControlRequest) -> impl Future<Output = ControlResponse> + Send;
}

#[derive(Debug, Clone)]
pub struct ControlServerConfig {
    pub bind_addr: SocketAddr,

    /// Serve non-loopback peers too.
    pub development_mode: bool,

    /// Longest accepted request line in bytes.
    pub max_line_length: usize,
}

impl Default for ControlServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 5000)),
            development_mode: false,
            max_line_length: MAX_REQUEST_LINE_LENGTH,
        }
    }
}

impl ControlServerConfig {
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            ..Default::default()
        }
    }

    pub fn development_mode(mut self, enabled: bool) -> Self {
        self.development_mode = enabled;
        self
    }

    pub fn max_line_length(mut self, max: usize) -> Self {
        self.max_line_length = max;
        self
    }
}

/// Returns `true` if `peer` may use the control plane.
pub fn is_peer_allowed(peer: &SocketAddr, development_mode: bool) -> bool {
    development_mode || peer.ip().to_canonical().is_loopback()
}

pub struct ControlServer<H> {
    listener: TcpListener,
    handler: Arc<H>,
    config: ControlServerConfig,
}

impl<H: ControlHandler> ControlServer<H> {
    /// Bind the listening socket.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::BindFailed`] if the address is unavailable.
    pub async fn bind(config: ControlServerConfig, handler: H) -> Result<Self, ControlError> {
        let listener = TcpListener::bind(config.bind_addr)
            .await
            .map_err(|source| ControlError::BindFailed {
                addr: config.bind_addr,
                source,
            })?;

        if config.development_mode {
            warn!(addr = %config.bind_addr, "Development mode: control plane accepts remote peers");
        }
        info!(addr = %listener.local_addr()?, "Control plane listening");

        Ok(Self {
            listener,
            handler: Arc::new(handler),
            config,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ControlError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until `shutdown` fires.
    ///
    /// Open connections are told to stop as well; each finishes the request
    /// it is processing.
    pub async fn serve(self, shutdown: CancellationToken) -> Result<(), ControlError> {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Control plane shutting down");
                    return Ok(());
                }
                accepted = self.listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(conn) => conn,
                        Err(e) => {
                            error!(error = %e, "Failed to accept connection");
                            continue;
                        }
                    };

                    let handler = Arc::clone(&self.handler);
                    let config = self.config.clone();
                    let shutdown = shutdown.child_token();
                    tokio::spawn(async move {
                        if let Err(e) = serve_connection(stream, peer, handler, config, shutdown).await {
                            debug!(peer = %peer, error = %e, "Connection ended with error");
                        }
                    });
                }
            }
        }
    }
}

async fn serve_connection<H: ControlHandler>(
    stream: TcpStream,
    peer: SocketAddr,
    handler: Arc<H>,
    config: ControlServerConfig,
    shutdown: CancellationToken,
) -> Result<(), ControlError> {
    let mut framed = Framed::new(stream, LinesCodec::new_with_max_length(config.max_line_length));

    if !is_peer_allowed(&peer, config.development_mode) {
        warn!(peer = %peer, "Refusing non-local control connection");
        send_response(&mut framed, &ControlResponse::forbidden()).await?;
        return Ok(());
    }

    debug!(peer = %peer, "Control connection opened");

    loop {
        let line = tokio::select! {
            _ = shutdown.cancelled() => break,
            next = framed.next() => next,
        };

        let line = match line {
            Some(Ok(line)) => line,
            Some(Err(LinesCodecError::MaxLineLengthExceeded)) => {
                warn!(peer = %peer, max = config.max_line_length, "Request line too long");
                send_response(
                    &mut framed,
                    &ControlResponse::invalid_request("request line too long"),
                )
                .await?;
                break;
            }
            Some(Err(e)) => return Err(e.into()),
            None => break,
        };

        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<ControlRequest>(&line) {
            Ok(request) => {
                trace!(peer = %peer, op = request.op(), "Control request");
                handler.handle(request).await
            }
            Err(e) => {
                warn!(peer = %peer, error = %e, "Malformed control request");
                ControlResponse::invalid_request(format!("malformed request: {e}"))
            }
        };

        send_response(&mut framed, &response).await?;
    }

    debug!(peer = %peer, "Control connection closed");
    Ok(())
}

async fn send_response(
    framed: &mut Framed<TcpStream, LinesCodec>,
    response: &ControlResponse,
) -> Result<(), ControlError> {
    let line = serde_json::to_string(response)?;
    framed.send(line).await?;
    Ok(())
}
