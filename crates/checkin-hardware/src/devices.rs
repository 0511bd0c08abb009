//! Enum wrappers for hardware device dispatch.
//!
//! Native `async fn` in traits is not object-safe, so `Box<dyn ScannerDevice>`
//! is not available. These enums give concrete dispatch instead, with real
//! drivers compiled in behind cargo features.
//!
//! # Examples
//!
//! ```
//! use checkin_hardware::devices::AnyScannerDevice;
//! use checkin_hardware::mock::MockScanner;
//! use checkin_hardware::traits::ScannerDevice;
//!
//! #[tokio::main]
//! async fn main() -> checkin_hardware::Result<()> {
//!     let (scanner, _handle) = MockScanner::new();
//!     let any = AnyScannerDevice::Mock(scanner);
//!     assert_eq!(any.info().await?.model, "mock");
//!     Ok(())
//! }
//! ```

use crate::mock::{MockScanner, VirtualPanel};
use crate::traits::{DisplayDevice, ScannerDevice};
use crate::{DeviceInfo, HardwareError, KeyEvent, Result};

#[cfg(feature = "hardware-evdev")]
use crate::evdev_scanner::EvdevScanner;
#[cfg(feature = "hardware-lcd")]
use crate::lcd::Hd44780Lcd;

/// Enum wrapper for scanner dispatch.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyScannerDevice {
    /// Mock scanner for development and testing.
    Mock(MockScanner),
    /// Linux input device.
    #[cfg(feature = "hardware-evdev")]
    Evdev(EvdevScanner),
}

impl AnyScannerDevice {
    /// Open the scanner at `path`, or discover one when no path is given.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError::Unsupported`] when built without evdev support,
    /// otherwise any discovery or open error.
    #[cfg(feature = "hardware-evdev")]
    pub fn open(path: Option<&str>) -> Result<Self> {
        let path = match path {
            Some(path) if !std::path::Path::new(path).exists() => {
                return Err(HardwareError::invalid_config(format!(
                    "scanner device {path} does not exist"
                )));
            }
            Some(path) => path.to_string(),
            None => crate::discovery::discover_scanner()?.path,
        };
        Ok(Self::Evdev(EvdevScanner::open(&path)?))
    }

    #[cfg(not(feature = "hardware-evdev"))]
    pub fn open(_path: Option<&str>) -> Result<Self> {
        Err(HardwareError::unsupported(
            "evdev scanners (build with the hardware-evdev feature)",
        ))
    }
}

impl ScannerDevice for AnyScannerDevice {
    async fn read_event(&mut self) -> Result<KeyEvent> {
        match self {
            Self::Mock(device) => device.read_event().await,
            #[cfg(feature = "hardware-evdev")]
            Self::Evdev(device) => device.read_event().await,
        }
    }

    async fn info(&self) -> Result<DeviceInfo> {
        match self {
            Self::Mock(device) => device.info().await,
            #[cfg(feature = "hardware-evdev")]
            Self::Evdev(device) => device.info().await,
        }
    }

    async fn release(&mut self) -> Result<()> {
        match self {
            Self::Mock(device) => device.release().await,
            #[cfg(feature = "hardware-evdev")]
            Self::Evdev(device) => device.release().await,
        }
    }
}

/// Enum wrapper for display dispatch.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyDisplayDevice {
    Virtual(VirtualPanel),
    #[cfg(feature = "hardware-lcd")]
    Lcd(Hd44780Lcd),
}

impl DisplayDevice for AnyDisplayDevice {
    fn columns(&self) -> usize {
        match self {
            Self::Virtual(device) => device.columns(),
            #[cfg(feature = "hardware-lcd")]
            Self::Lcd(device) => device.columns(),
        }
    }

    fn rows(&self) -> usize {
        match self {
            Self::Virtual(device) => device.rows(),
            #[cfg(feature = "hardware-lcd")]
            Self::Lcd(device) => device.rows(),
        }
    }

    fn clear(&mut self) -> Result<()> {
        match self {
            Self::Virtual(device) => device.clear(),
            #[cfg(feature = "hardware-lcd")]
            Self::Lcd(device) => device.clear(),
        }
    }

    fn write_line(&mut self, row: usize, text: &str) -> Result<()> {
        match self {
            Self::Virtual(device) => device.write_line(row, text),
            #[cfg(feature = "hardware-lcd")]
            Self::Lcd(device) => device.write_line(row, text),
        }
    }
}

/// Where feedback is rendered.
#[derive(Debug, Clone)]
pub enum DisplayTarget {
    /// No panel; messages go to the log only.
    Console,
    /// In-memory panel.
    Virtual(VirtualPanel),
    /// HD44780 LCD on an I2C bus.
    I2c {
        bus: u8,
        address: u16,
        columns: usize,
        rows: usize,
    },
}

impl DisplayTarget {
    /// Open a fresh driver for this target.
    ///
    /// `Ok(None)` means there is no physical device to drive.
    ///
    /// # Errors
    ///
    /// Returns the driver's initialization error, or
    /// [`HardwareError::Unsupported`] for an I2C target in a build without LCD
    /// support.
    pub fn open(&self) -> Result<Option<AnyDisplayDevice>> {
        match self {
            Self::Console => Ok(None),
            Self::Virtual(panel) => panel.open().map(|p| Some(AnyDisplayDevice::Virtual(p))),
            #[cfg(feature = "hardware-lcd")]
            Self::I2c {
                bus,
                address,
                columns,
                rows,
            } => Hd44780Lcd::open(*bus, *address, *columns, *rows)
                .map(|lcd| Some(AnyDisplayDevice::Lcd(lcd))),
            #[cfg(not(feature = "hardware-lcd"))]
            Self::I2c { .. } => Err(HardwareError::unsupported(
                "I2C LCD (build with the hardware-lcd feature)",
            )),
        }
    }

    /// Returns `true` if talking to this target makes blocking syscalls.
    pub fn is_blocking(&self) -> bool {
        matches!(self, Self::I2c { .. })
    }

    /// Short label for logs.
    pub fn label(&self) -> String {
        match self {
            Self::Console => "console".to_string(),
            Self::Virtual(_) => "virtual".to_string(),
            Self::I2c { bus, address, .. } => format!("i2c-{bus}@{address:#04x}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_target_has_no_device() {
        assert!(DisplayTarget::Console.open().unwrap().is_none());
        assert_eq!(DisplayTarget::Console.label(), "console");
    }

    #[test]
    fn test_virtual_target_opens_shared_panel() {
        let panel = VirtualPanel::new(16, 2);
        let target = DisplayTarget::Virtual(panel.clone());

        let mut device = target.open().unwrap().unwrap();
        device.write_line(1, "Hello").unwrap();

        assert_eq!(device.columns(), 16);
        assert_eq!(panel.trimmed_lines(), vec!["", "Hello"]);
        assert_eq!(panel.open_count(), 1);
    }

    #[test]
    fn test_i2c_label() {
        let target = DisplayTarget::I2c {
            bus: 1,
            address: 0x27,
            columns: 16,
            rows: 2,
        };
        assert_eq!(target.label(), "i2c-1@0x27");
        assert!(target.is_blocking());
        assert!(!DisplayTarget::Console.is_blocking());
        assert!(!DisplayTarget::Virtual(VirtualPanel::new(16, 2)).is_blocking());
    }

    #[cfg(not(feature = "hardware-lcd"))]
    #[test]
    fn test_i2c_without_driver_is_unsupported() {
        let target = DisplayTarget::I2c {
            bus: 1,
            address: 0x27,
            columns: 16,
            rows: 2,
        };
        assert!(matches!(
            target.open(),
            Err(HardwareError::Unsupported { .. })
        ));
    }

    #[tokio::test]
    async fn test_mock_scanner_dispatch() {
        let (scanner, handle) = MockScanner::new();
        let mut any = AnyScannerDevice::Mock(scanner);
        handle.send_key(crate::keymap::KEY_A).await.unwrap();

        assert_eq!(
            any.read_event().await.unwrap(),
            KeyEvent::down(crate::keymap::KEY_A)
        );
        any.release().await.unwrap();
        assert!(handle.is_released());
    }
}
