pub mod constants;
pub mod error;
pub mod status;
pub mod types;

pub use error::{Error, ErrorKind, Result};
pub use status::{ScanStatus, StatusStore};
pub use types::*;

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
