//! Shared constants for the check-in kiosk.
//!
//! Both the listener process and the control-plane server read these
//! defaults, so anything that has to agree across processes (status file
//! location, control address) lives here rather than in either binary.
//!
//! # Usage
//!
//! ```
//! use checkin_core::constants::*;
//!
//! assert_eq!(DEFAULT_DISPLAY_COLUMNS, 16);
//! assert!(MAX_CODE_LENGTH >= MIN_CODE_LENGTH);
//! ```

// ============================================================================
// Shared State
// ============================================================================

/// Default location of the Status Store file, relative to the working directory.
pub const DEFAULT_STATUS_PATH: &str = "scan_status.json";

/// Default SQLite database file.
pub const DEFAULT_DATABASE_PATH: &str = "checkin.db";

// ============================================================================
// Control Plane
// ============================================================================

/// Default bind address of the control-plane endpoint.
///
/// Loopback only; remote callers are refused unless development mode is on.
pub const DEFAULT_CONTROL_ADDR: &str = "127.0.0.1:5000";

/// Timeout applied by the listener to each control-plane round trip (milliseconds).
pub const DEFAULT_SUBMIT_TIMEOUT_MS: u64 = 5000;

/// Maximum accepted length of one control-plane request line (bytes).
pub const MAX_REQUEST_LINE_LENGTH: usize = 4096;

// ============================================================================
// Scan Codes
// ============================================================================

/// Minimum length of a scanned code after trimming.
pub const MIN_CODE_LENGTH: usize = 1;

/// Maximum length of a scanned code.
///
/// Barcode payloads on exam booklets and ID cards are short; anything longer
/// is treated as a stuck key or a misconfigured scanner.
pub const MAX_CODE_LENGTH: usize = 128;

// ============================================================================
// Display
// ============================================================================

/// Character columns of the standard kiosk LCD (16x2 HD44780).
pub const DEFAULT_DISPLAY_COLUMNS: usize = 16;

/// Character rows of the standard kiosk LCD.
pub const DEFAULT_DISPLAY_ROWS: usize = 2;

/// I2C bus the LCD backpack sits on (Raspberry Pi default).
pub const DEFAULT_I2C_BUS: u8 = 1;

/// I2C address of the common PCF8574 LCD backpack.
pub const DEFAULT_I2C_ADDRESS: u16 = 0x27;

/// Message shown when no check-in activity is in progress.
pub const DEFAULT_IDLE_MESSAGE: &str = "System Ready";

/// Delay between marquee frames (milliseconds).
pub const DEFAULT_SCROLL_STEP_MS: u64 = 350;

/// Bounded wait when joining a cancelled marquee task (milliseconds).
pub const SCROLL_JOIN_TIMEOUT_MS: u64 = 500;

// ============================================================================
// Artifacts
// ============================================================================

/// Prefix of freshly minted artifact (booklet) codes.
pub const DEFAULT_ARTIFACT_PREFIX: &str = "BK";

/// Directory artifact sheets are written to before printing.
pub const DEFAULT_ARTIFACT_DIR: &str = "output_barcodes";

/// Print spooler command used to send artifact sheets to a printer.
pub const DEFAULT_PRINT_COMMAND: &str = "lp";
