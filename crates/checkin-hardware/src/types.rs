//! Common types shared across hardware device implementations.

use serde::{Deserialize, Serialize};

/// Generic device information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Device name as reported by the kernel or driver.
    pub name: String,

    /// Device model or driver identifier.
    pub model: String,

    /// Device node path, if the device is backed by one.
    pub path: Option<String>,
}

impl DeviceInfo {
    /// Create a new DeviceInfo with required fields.
    pub fn new(name: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            path: None,
        }
    }

    /// Set the device node path.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}

/// Key transition reported by an input device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyState {
    Up,
    Down,
    /// Autorepeat while held.
    Repeat,
}

impl KeyState {
    /// Map the raw evdev event value (0, 1, 2).
    pub fn from_raw(value: i32) -> Option<Self> {
        match value {
            0 => Some(Self::Up),
            1 => Some(Self::Down),
            2 => Some(Self::Repeat),
            _ => None,
        }
    }
}

/// A single key event from a scanner.
///
/// `code` is the Linux input key code (`KEY_*` from `input-event-codes.h`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyEvent {
    pub code: u16,
    pub state: KeyState,
}

impl KeyEvent {
    pub fn down(code: u16) -> Self {
        Self {
            code,
            state: KeyState::Down,
        }
    }

    pub fn up(code: u16) -> Self {
        Self {
            code,
            state: KeyState::Up,
        }
    }

    #[inline]
    pub fn is_down(&self) -> bool {
        self.state == KeyState::Down
    }
}
