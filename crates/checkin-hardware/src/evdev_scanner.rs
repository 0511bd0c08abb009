//! Linux input (evdev) barcode scanner.
//!
//! The device is grabbed on open so scanned keystrokes are delivered to this
//! process only and never typed into a console or desktop session.

use evdev::{Device, EventStream, EventType};
use tracing::{debug, info, warn};

use crate::{
    HardwareError, Result,
    traits::ScannerDevice,
    types::{DeviceInfo, KeyEvent, KeyState},
};

/// `ENODEV`: the device node went away (unplugged).
const ENODEV: i32 = 19;

/// Scanner backed by a `/dev/input/event*` node.
pub struct EvdevScanner {
    path: String,
    name: String,
    stream: EventStream,
    grabbed: bool,
}

impl std::fmt::Debug for EvdevScanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvdevScanner")
            .field("path", &self.path)
            .field("name", &self.name)
            .field("grabbed", &self.grabbed)
            .finish_non_exhaustive()
    }
}

impl EvdevScanner {
    /// Open `path` and claim it exclusively.
    ///
    /// # Errors
    ///
    /// - [`HardwareError::OpenFailed`] if the node cannot be opened
    /// - [`HardwareError::ExclusiveClaimFailed`] if another process holds it
    pub fn open(path: &str) -> Result<Self> {
        let mut device = Device::open(path)
            .map_err(|e| HardwareError::open_failed(format!("open {path}: {e}")))?;
        let name = device.name().unwrap_or("unknown").to_string();

        device
            .grab()
            .map_err(|e| HardwareError::exclusive_claim(path, e.to_string()))?;

        let stream = device
            .into_event_stream()
            .map_err(|e| HardwareError::open_failed(format!("event stream {path}: {e}")))?;

        info!(path, name = %name, "Scanner opened and grabbed");
        Ok(Self {
            path: path.to_string(),
            name,
            stream,
            grabbed: true,
        })
    }

    fn map_read_error(&self, e: std::io::Error) -> HardwareError {
        if e.raw_os_error() == Some(ENODEV) {
            HardwareError::disconnected(format!("{} ({})", self.name, self.path))
        } else {
            HardwareError::read_failed(e.to_string())
        }
    }
}

impl ScannerDevice for EvdevScanner {
    async fn read_event(&mut self) -> Result<KeyEvent> {
        loop {
            let event = match self.stream.next_event().await {
                Ok(event) => event,
                Err(e) => return Err(self.map_read_error(e)),
            };

            if event.event_type() != EventType::KEY {
                continue;
            }
            match KeyState::from_raw(event.value()) {
                Some(state) => {
                    return Ok(KeyEvent {
                        code: event.code(),
                        state,
                    });
                }
                None => debug!(value = event.value(), "Unknown key state value"),
            }
        }
    }

    async fn info(&self) -> Result<DeviceInfo> {
        Ok(DeviceInfo::new(self.name.clone(), "evdev").with_path(self.path.clone()))
    }

    async fn release(&mut self) -> Result<()> {
        if !self.grabbed {
            return Ok(());
        }
        self.grabbed = false;

        if let Err(e) = self.stream.device_mut().ungrab() {
            // Unplugged devices cannot be ungrabbed; the kernel already dropped the claim.
            warn!(path = %self.path, error = %e, "Failed to ungrab scanner");
        } else {
            info!(path = %self.path, "Scanner released");
        }
        Ok(())
    }
}
