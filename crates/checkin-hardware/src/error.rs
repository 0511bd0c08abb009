//! Hardware errors.
//!
//! Scanner errors split into fatal ones (the device is gone or was never
//! usable) and transient read failures; see [`HardwareError::is_fatal`].
//! Display errors never leave the feedback controller, which falls back to
//! the console.

pub type Result<T> = std::result::Result<T, HardwareError>;

#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    #[error("Device disconnected: {device}")]
    Disconnected { device: String },

    /// A backend was requested that this build does not include.
    #[error("Not supported in this build: {feature}")]
    Unsupported { feature: String },

    /// One read failed; the device may still deliver further events.
    #[error("Scanner read failed: {message}")]
    ReadFailed { message: String },

    #[error("Failed to open device: {message}")]
    OpenFailed { message: String },

    #[error("Invalid device configuration: {message}")]
    InvalidConfig { message: String },

    #[error("No scanner device found; configure the device path explicitly")]
    NoScannerFound,

    #[error("Multiple scanner candidates found ({}); configure the device path explicitly", candidates.join(", "))]
    AmbiguousScanner { candidates: Vec<String> },

    /// Another process holds the input device.
    #[error("Failed to claim {device} exclusively: {message}")]
    ExclusiveClaimFailed { device: String, message: String },

    #[error("Display write failed: {message}")]
    DisplayWrite { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HardwareError {
    pub fn disconnected(device: impl Into<String>) -> Self {
        Self::Disconnected {
            device: device.into(),
        }
    }

    pub fn unsupported(feature: impl Into<String>) -> Self {
        Self::Unsupported {
            feature: feature.into(),
        }
    }

    pub fn read_failed(message: impl Into<String>) -> Self {
        Self::ReadFailed {
            message: message.into(),
        }
    }

    pub fn open_failed(message: impl Into<String>) -> Self {
        Self::OpenFailed {
            message: message.into(),
        }
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    pub fn exclusive_claim(device: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ExclusiveClaimFailed {
            device: device.into(),
            message: message.into(),
        }
    }

    pub fn display_write(message: impl Into<String>) -> Self {
        Self::DisplayWrite {
            message: message.into(),
        }
    }

    /// Returns `true` if the scanner is gone or unusable and the listener
    /// must stop. Everything else is a transient read failure.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Disconnected { .. }
                | Self::ExclusiveClaimFailed { .. }
                | Self::NoScannerFound
                | Self::AmbiguousScanner { .. }
        )
    }
}
