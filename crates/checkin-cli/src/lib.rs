//! Process wiring for the check-in kiosk.
//!
//! Three binaries share this crate:
//!
//! - `checkin-server`: owns the database, the display and the
//!   [`ScanEngine`](checkin_engine::ScanEngine), and serves the control plane
//! - `checkin-listener`: claims the scanner and forwards completed codes
//! - `checkin-ctl`: activates, closes and inspects sessions from a shell
//!
//! All of them read [`config::KioskConfig`] and log through [`logging`].

pub mod config;
pub mod logging;
pub mod net;
pub mod service;
pub mod shutdown;

pub use config::{ConfigArgs, ConfigError, KioskConfig};
pub use service::EngineService;
