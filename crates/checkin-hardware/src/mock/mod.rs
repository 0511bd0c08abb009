//! Mock device implementations for testing and development.
//!
//! Both mocks are driven programmatically: the scanner through a handle that
//! types codes, the panel through shared state that tests can inspect.

pub mod panel;
pub mod scanner;

pub use panel::VirtualPanel;
pub use scanner::{MockScanner, MockScannerHandle};
