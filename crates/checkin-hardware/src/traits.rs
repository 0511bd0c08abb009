//! Hardware device trait definitions.
//!
//! Two device families back the kiosk: a keyboard-emulating barcode scanner
//! that feeds the listener, and a small character display that shows feedback.
//! Both have a mock implementation in [`crate::mock`] and a Linux driver behind
//! a cargo feature.
//!
//! The scanner trait uses native `async fn` methods (Edition 2024 RPITIT). The
//! display trait is synchronous: character LCD writes are short bus transfers
//! and the feedback controller calls them while holding a plain mutex.

#![allow(async_fn_in_trait)]

use crate::error::Result;
use crate::types::{DeviceInfo, KeyEvent};

/// Keyboard-emulating barcode scanner.
///
/// Implementations deliver raw key events; turning them into codes is done by
/// [`crate::keymap::CodeAssembler`] so every backend shares one key table.
///
/// # Exclusive access
///
/// A real scanner is claimed exclusively when opened so its keystrokes never
/// reach other consumers. [`ScannerDevice::release`] gives the claim back and
/// must be safe to call more than once.
///
/// # Examples
///
/// ```no_run
/// use checkin_hardware::traits::ScannerDevice;
/// use checkin_hardware::Result;
///
/// async fn next_press<S: ScannerDevice>(scanner: &mut S) -> Result<u16> {
///     loop {
///         let event = scanner.read_event().await?;
///         if event.is_down() {
///             return Ok(event.code);
///         }
///     }
/// }
/// ```
pub trait ScannerDevice: Send + Sync {
    /// Wait for the next key event.
    ///
    /// # Errors
    ///
    /// Returns [`crate::HardwareError::Disconnected`] once the device is gone.
    /// Other errors are transient and the caller may keep reading.
    async fn read_event(&mut self) -> Result<KeyEvent>;

    /// Device identification.
    async fn info(&self) -> Result<DeviceInfo>;

    /// Release the exclusive claim and close the device.
    async fn release(&mut self) -> Result<()>;
}

/// Fixed-size character display.
pub trait DisplayDevice: Send {
    /// Characters per row.
    fn columns(&self) -> usize;

    /// Number of rows.
    fn rows(&self) -> usize;

    /// Blank every row.
    fn clear(&mut self) -> Result<()>;

    /// Write `text` at the start of `row`.
    ///
    /// Text is cut to the column width and the rest of the row is blanked, so
    /// the previous content never shows through.
    fn write_line(&mut self, row: usize, text: &str) -> Result<()>;
}
