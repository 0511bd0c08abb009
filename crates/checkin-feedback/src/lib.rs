//! Operator feedback for the check-in kiosk.
//!
//! [`FeedbackDisplay`] shows status messages on the panel (or the log when
//! there is none), [`messages`] holds the message catalogue and [`text`] the
//! fixed-width text helpers.

pub mod controller;
pub mod messages;
pub mod text;

pub use controller::{CONSOLE_TARGET, FeedbackConfig, FeedbackDisplay};
pub use messages::DisplayMessages;
pub use text::{Alignment, align_text, marquee_frames, sanitize_text, truncate_text};
