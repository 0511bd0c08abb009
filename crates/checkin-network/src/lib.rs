//! Control plane for the check-in kiosk.
//!
//! Newline-delimited JSON over TCP between the listener process (and admin
//! tooling) and the server process that owns the engine.
//!
//! # Components
//!
//! - [`ControlServer`]: accepts local connections and routes requests to a
//!   [`ControlHandler`]
//! - [`ControlClient`]: one short-lived connection per request
//! - [`protocol`]: the request and response types

pub mod client;
pub mod error;
pub mod protocol;
pub mod server;

pub use client::{ControlClient, ControlClientConfig};
pub use error::ControlError;
pub use protocol::{ControlRequest, ControlResponse};
pub use server::{ControlHandler, ControlServer, ControlServerConfig, is_peer_allowed};
