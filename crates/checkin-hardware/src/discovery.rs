//! Scanner discovery.
//!
//! When no device path is configured the listener looks for an input device
//! whose name suggests a barcode scanner and that reports key events. Exactly
//! one match is required; zero or several is a startup error that asks the
//! operator to configure the path explicitly.

use tracing::{debug, info};

use crate::{HardwareError, Result};

/// Lowercase name fragments that mark an input device as a likely scanner.
pub const SCANNER_NAME_HINTS: &[&str] = &["scan", "barcod", "hid", "keyboard"];

/// An input device considered during discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceCandidate {
    pub path: String,
    pub name: String,
    /// Device reports key events.
    pub supports_keys: bool,
}

impl DeviceCandidate {
    pub fn new(path: impl Into<String>, name: impl Into<String>, supports_keys: bool) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            supports_keys,
        }
    }

    /// Returns `true` if the name matches a hint and the device emits keys.
    pub fn looks_like_scanner(&self) -> bool {
        let name = self.name.to_lowercase();
        self.supports_keys && SCANNER_NAME_HINTS.iter().any(|hint| name.contains(hint))
    }
}

/// Pick the single scanner among `candidates`.
///
/// # Errors
///
/// - [`HardwareError::NoScannerFound`] if nothing matches
/// - [`HardwareError::AmbiguousScanner`] if more than one device matches
pub fn select_scanner(candidates: impl IntoIterator<Item = DeviceCandidate>) -> Result<DeviceCandidate> {
    let mut matches: Vec<DeviceCandidate> = candidates
        .into_iter()
        .filter(|c| {
            let hit = c.looks_like_scanner();
            debug!(path = %c.path, name = %c.name, hit, "Discovery candidate");
            hit
        })
        .collect();

    match matches.len() {
        0 => Err(HardwareError::NoScannerFound),
        1 => {
            let chosen = matches.remove(0);
            info!(path = %chosen.path, name = %chosen.name, "Scanner discovered");
            Ok(chosen)
        }
        _ => Err(HardwareError::AmbiguousScanner {
            candidates: matches
                .into_iter()
                .map(|c| format!("{} ({})", c.path, c.name))
                .collect(),
        }),
    }
}

/// List the input devices present on this machine.
#[cfg(feature = "hardware-evdev")]
pub fn enumerate_candidates() -> Vec<DeviceCandidate> {
    evdev::enumerate()
        .map(|(path, device)| {
            DeviceCandidate::new(
                path.display().to_string(),
                device.name().unwrap_or_default(),
                device.supported_events().contains(evdev::EventType::KEY),
            )
        })
        .collect()
}

/// Without evdev support there is nothing to enumerate.
#[cfg(not(feature = "hardware-evdev"))]
pub fn enumerate_candidates() -> Vec<DeviceCandidate> {
    Vec::new()
}

/// Discover the scanner on this machine.
pub fn discover_scanner() -> Result<DeviceCandidate> {
    select_scanner(enumerate_candidates())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("SYMBEYE Barcode Scanner", true)]
    #[case("Honeywell Scanning and Mobility", true)]
    #[case("USB HID KBW", true)]
    #[case("AT Translated Set 2 keyboard", true)]
    #[case("Logitech USB Optical Mouse", false)]
    #[case("Power Button", false)]
    fn test_name_heuristics(#[case] name: &str, #[case] expected: bool) {
        let candidate = DeviceCandidate::new("/dev/input/event0", name, true);
        assert_eq!(candidate.looks_like_scanner(), expected);
    }

    #[test]
    fn test_requires_key_capability() {
        let candidate = DeviceCandidate::new("/dev/input/event0", "Barcode Scanner", false);
        assert!(!candidate.looks_like_scanner());
    }

    #[test]
    fn test_single_match_is_selected() {
        let chosen = select_scanner(vec![
            DeviceCandidate::new("/dev/input/event0", "Power Button", true),
            DeviceCandidate::new("/dev/input/event3", "Barcode Reader", true),
            DeviceCandidate::new("/dev/input/event4", "Mouse", false),
        ])
        .unwrap();
        assert_eq!(chosen.path, "/dev/input/event3");
    }

    #[test]
    fn test_no_match() {
        let err = select_scanner(vec![DeviceCandidate::new(
            "/dev/input/event0",
            "Power Button",
            true,
        )])
        .unwrap_err();
        assert!(matches!(err, HardwareError::NoScannerFound));
    }

    #[test]
    fn test_multiple_matches_refuse_to_guess() {
        let err = select_scanner(vec![
            DeviceCandidate::new("/dev/input/event2", "AT Translated Set 2 keyboard", true),
            DeviceCandidate::new("/dev/input/event5", "Barcode Scanner", true),
        ])
        .unwrap_err();

        match err {
            HardwareError::AmbiguousScanner { candidates } => {
                assert_eq!(candidates.len(), 2);
                assert!(candidates[1].starts_with("/dev/input/event5"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
