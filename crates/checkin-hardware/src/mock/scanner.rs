//! Mock barcode scanner.
//!
//! Simulates a keyboard-emulating scanner by receiving key events through an
//! internal channel. Tests type whole codes with
//! [`MockScannerHandle::type_code`] or inject raw events and read errors.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;

use crate::{
    HardwareError, Result,
    keymap::{self, KEY_ENTER},
    traits::ScannerDevice,
    types::{DeviceInfo, KeyEvent},
};

#[derive(Debug)]
enum MockInput {
    Event(KeyEvent),
    ReadError(String),
    Disconnect,
}

/// Mock scanner device.
///
/// # Examples
///
/// ```
/// use checkin_hardware::keymap::{CodeAssembler, KeyOutcome};
/// use checkin_hardware::mock::MockScanner;
/// use checkin_hardware::traits::ScannerDevice;
///
/// #[tokio::main]
/// async fn main() -> checkin_hardware::Result<()> {
///     let (mut scanner, handle) = MockScanner::new();
///     handle.type_code("S100").await?;
///
///     let mut assembler = CodeAssembler::new();
///     loop {
///         if let KeyOutcome::Completed(code) = assembler.push(scanner.read_event().await?) {
///             assert_eq!(code, "S100");
///             break;
///         }
///     }
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockScanner {
    input_rx: mpsc::Receiver<MockInput>,
    name: String,
    released: Arc<AtomicBool>,
}

impl MockScanner {
    /// Create a mock scanner with the default name.
    pub fn new() -> (Self, MockScannerHandle) {
        Self::with_name("Mock Barcode Scanner")
    }

    /// Create a mock scanner with a custom name.
    pub fn with_name(name: impl Into<String>) -> (Self, MockScannerHandle) {
        let name = name.into();
        let (input_tx, input_rx) = mpsc::channel(256);
        let released = Arc::new(AtomicBool::new(false));

        let scanner = Self {
            input_rx,
            name: name.clone(),
            released: Arc::clone(&released),
        };
        let handle = MockScannerHandle {
            input_tx,
            name,
            released,
        };

        (scanner, handle)
    }
}

impl ScannerDevice for MockScanner {
    async fn read_event(&mut self) -> Result<KeyEvent> {
        if self.released.load(Ordering::SeqCst) {
            return Err(HardwareError::disconnected(&self.name));
        }

        match self.input_rx.recv().await {
            Some(MockInput::Event(event)) => Ok(event),
            Some(MockInput::ReadError(message)) => Err(HardwareError::read_failed(message)),
            Some(MockInput::Disconnect) | None => {
                self.input_rx.close();
                Err(HardwareError::disconnected(&self.name))
            }
        }
    }

    async fn info(&self) -> Result<DeviceInfo> {
        Ok(DeviceInfo::new(self.name.clone(), "mock"))
    }

    async fn release(&mut self) -> Result<()> {
        self.released.store(true, Ordering::SeqCst);
        self.input_rx.close();
        Ok(())
    }
}

/// Handle for driving a [`MockScanner`].
///
/// Cloneable; dropping every handle disconnects the scanner.
#[derive(Debug, Clone)]
pub struct MockScannerHandle {
    input_tx: mpsc::Sender<MockInput>,
    name: String,
    released: Arc<AtomicBool>,
}

impl MockScannerHandle {
    /// Send a raw key event.
    ///
    /// # Errors
    ///
    /// Returns an error if the scanner was dropped or released.
    pub async fn send_event(&self, event: KeyEvent) -> Result<()> {
        self.send(MockInput::Event(event)).await
    }

    /// Press and release a single key.
    pub async fn send_key(&self, code: u16) -> Result<()> {
        self.send_event(KeyEvent::down(code)).await?;
        self.send_event(KeyEvent::up(code)).await
    }

    /// Type `code` followed by Enter, the way a scanner does.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `code` contains a character the key
    /// table cannot produce.
    pub async fn type_code(&self, code: &str) -> Result<()> {
        for c in code.chars() {
            let key = keymap::code_for(c).ok_or_else(|| {
                HardwareError::invalid_config(format!("no scanner key produces {c:?}"))
            })?;
            self.send_key(key).await?;
        }
        self.send_key(KEY_ENTER).await
    }

    /// Make the next read fail with a transient communication error.
    pub async fn send_read_error(&self, message: impl Into<String>) -> Result<()> {
        self.send(MockInput::ReadError(message.into())).await
    }

    /// Simulate unplugging: reads after queued events fail with
    /// [`HardwareError::Disconnected`].
    pub async fn disconnect(&self) -> Result<()> {
        self.send(MockInput::Disconnect).await
    }

    /// Returns `true` once the scanner has been released.
    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    async fn send(&self, input: MockInput) -> Result<()> {
        self.input_tx
            .send(input)
            .await
            .map_err(|_| HardwareError::disconnected(&self.name))
    }
}
