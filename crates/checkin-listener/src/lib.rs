//! Scanner side of the check-in kiosk.
//!
//! [`ScanListener`] owns the claimed barcode scanner, turns key events into
//! codes and forwards each one to the engine with the kind the Status Store
//! says is expected next. It never touches the database.
//!
//! ```no_run
//! use checkin_core::StatusStore;
//! use checkin_hardware::AnyScannerDevice;
//! use checkin_listener::ScanListener;
//! use checkin_network::{ControlClient, ControlClientConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let scanner = AnyScannerDevice::open(None)?;
//! let client = ControlClient::new(ControlClientConfig::default());
//! let listener = ScanListener::new(scanner, client, StatusStore::new("scan_status.json"));
//! let stats = listener.run(CancellationToken::new()).await?;
//! println!("{} codes read", stats.codes);
//! # Ok(())
//! # }
//! ```

pub mod listener;
pub mod submitter;

pub use listener::{ListenerError, ListenerStats, ScanListener};
pub use submitter::Submitter;
