//! Hardware device abstraction layer for the exam check-in kiosk.
//!
//! The kiosk drives two peripherals:
//!
//! - a keyboard-emulating barcode scanner, read through [`ScannerDevice`] and
//!   decoded into codes by [`keymap::CodeAssembler`]
//! - a small character display, written through [`DisplayDevice`]
//!
//! Each has a mock implementation in [`mock`] for development and tests. The
//! Linux drivers are compiled in with the `hardware-evdev` and `hardware-lcd`
//! features.
//!
//! ```no_run
//! use checkin_hardware::keymap::{CodeAssembler, KeyOutcome};
//! use checkin_hardware::traits::ScannerDevice;
//! use checkin_hardware::Result;
//!
//! async fn read_code<S: ScannerDevice>(scanner: &mut S) -> Result<String> {
//!     let mut assembler = CodeAssembler::new();
//!     loop {
//!         if let KeyOutcome::Completed(code) = assembler.push(scanner.read_event().await?) {
//!             return Ok(code);
//!         }
//!     }
//! }
//! ```
//!
//! [`ScannerDevice`]: traits::ScannerDevice
//! [`DisplayDevice`]: traits::DisplayDevice

pub mod devices;
pub mod discovery;
pub mod error;
#[cfg(feature = "hardware-evdev")]
pub mod evdev_scanner;
pub mod keymap;
#[cfg(feature = "hardware-lcd")]
pub mod lcd;
pub mod mock;
pub mod traits;
pub mod types;

pub use devices::{AnyDisplayDevice, AnyScannerDevice, DisplayTarget};
pub use error::{HardwareError, Result};
pub use traits::{DisplayDevice, ScannerDevice};
pub use types::{DeviceInfo, KeyEvent, KeyState};
