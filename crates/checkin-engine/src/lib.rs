//! Scan Processing Engine for the check-in kiosk.
//!
//! [`ScanEngine`] validates completed scans against the active session,
//! records booklet claims exactly once per session and keeps the Status Store
//! and the display in step with its [`StateMachine`].
//!
//! A check-in is two scans:
//!
//! 1. the participant's ID card: the participant must exist (and, under
//!    [`EligibilityPolicy::Enforce`], be registered for the session)
//! 2. the exam booklet: its code must not be claimed yet in this session
//!
//! # Examples
//!
//! ```no_run
//! use checkin_core::{CodeKind, StatusStore, Submission};
//! use checkin_engine::{EngineConfig, ScanEngine};
//! use checkin_feedback::FeedbackDisplay;
//! use checkin_storage::Database;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::in_memory().await?;
//! let store = StatusStore::new("scan_status.json");
//! let mut engine = ScanEngine::start(db, store, FeedbackDisplay::console(), EngineConfig::default()).await?;
//!
//! engine.activate_session(1).await?;
//! let accepted = engine.submit(Submission::new("S100", CodeKind::Identity, 1)).await?;
//! println!("{accepted}");
//! # Ok(())
//! # }
//! ```

pub mod engine;
pub mod error;
pub mod issuer;
pub mod policy;
pub mod state_machine;

pub use engine::{EngineConfig, ScanAccepted, ScanEngine, ScanOutcome};
pub use error::{ScanError, ScanResult};
pub use issuer::{ArtifactIssuer, IssueError, IssuedArtifact, IssuerConfig};
pub use policy::EligibilityPolicy;
pub use state_machine::{ScanPhase, StateMachine, StateTransition};
