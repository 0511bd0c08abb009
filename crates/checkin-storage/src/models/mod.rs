pub mod participant;
pub mod scan_record;
pub mod session;

pub use participant::{NewParticipant, Participant};
pub use scan_record::{NewScanRecord, ScanClaim, ScanRecord};
pub use session::Session;
