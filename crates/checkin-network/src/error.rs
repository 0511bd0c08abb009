use std::net::SocketAddr;

use thiserror::Error;
use tokio_util::codec::LinesCodecError;

/// Control-plane transport errors, shared by the client and the server.
#[derive(Debug, Error)]
pub enum ControlError {
    #[error("Failed to bind to {addr}: {source}")]
    BindFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Connection timeout after {0}ms")]
    ConnectionTimeout(u64),

    #[error("Read timeout after {0}ms")]
    ReadTimeout(u64),

    #[error("Write timeout after {0}ms")]
    WriteTimeout(u64),

    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    #[error("Codec error: {0}")]
    Codec(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<LinesCodecError> for ControlError {
    fn from(e: LinesCodecError) -> Self {
        match e {
            LinesCodecError::Io(e) => ControlError::Io(e),
            other => ControlError::Codec(other.to_string()),
        }
    }
}

impl ControlError {
    /// Returns `true` if the server could not be reached or did not answer
    /// in time.
    pub fn is_unreachable(&self) -> bool {
        matches!(
            self,
            ControlError::ConnectionTimeout(_)
                | ControlError::ReadTimeout(_)
                | ControlError::WriteTimeout(_)
                | ControlError::ConnectionLost(_)
                | ControlError::Io(_)
        )
    }
}
