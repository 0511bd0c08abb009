//! Display messages shown at the kiosk.
//!
//! Lines are written for a 16-column panel. Anything longer scrolls, so a
//! message that names a participant or code is built at runtime instead of
//! being listed here.
//!
//! ```
//! use checkin_feedback::messages::DisplayMessages;
//!
//! assert_eq!(DisplayMessages::RECORDED, "Recorded");
//! ```

/// Compile-time message catalogue.
pub struct DisplayMessages;

impl DisplayMessages {
    /// Idle text when no session is active.
    pub const SYSTEM_READY: &'static str = "System Ready";

    /// A session was armed; first line is the session name.
    pub const SCAN_ID_CARD: &'static str = "Scan ID card";

    /// Identity verified; the participant must present the booklet.
    pub const SCAN_BOOKLET: &'static str = "Scan booklet";

    /// Booklet recorded against the verified participant.
    pub const RECORDED: &'static str = "Recorded";

    /// Identity code unknown.
    pub const ID_NOT_FOUND: &'static str = "ID not found";

    /// Participant not registered for the session (enforce policy only).
    pub const NOT_ELIGIBLE: &'static str = "Not registered";

    /// Booklet code already claimed in this session.
    pub const DUPLICATE: &'static str = "Duplicate!";

    /// Verified identity missing when a booklet arrived.
    pub const STATE_LOST: &'static str = "State lost";

    /// Second line of [`Self::STATE_LOST`].
    pub const RESCAN_ID: &'static str = "Rescan ID";

    /// Record could not be stored.
    pub const SAVE_FAILED: &'static str = "Save failed";

    /// Second line asking the operator to repeat the scan.
    pub const TRY_AGAIN: &'static str = "Try again";

    /// Booklet sheet could not be printed.
    pub const PRINT_FAILED: &'static str = "Print failed";

    /// Scan arrived with the wrong kind for the current step.
    pub const WRONG_SCAN: &'static str = "Wrong scan";

    /// Session closed.
    pub const SESSION_CLOSED: &'static str = "Session closed";
}
