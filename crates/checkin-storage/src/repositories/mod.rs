pub mod eligibility;
pub mod participant;
pub mod scan_record;
pub mod session;

pub use eligibility::{EligibilityRepository, SqliteEligibilityRepository};
pub use participant::{ParticipantRepository, SqliteParticipantRepository};
pub use scan_record::{ScanRecordRepository, SqliteScanRecordRepository};
pub use session::{SessionRepository, SqliteSessionRepository};
