//! SQLite persistence for the check-in kiosk.
//!
//! Sessions, participants, eligibility and check-in records live in one
//! SQLite database managed by [`Database`]. Reads go through repository
//! traits; the booklet write path goes through [`transaction`] so the
//! duplicate check and the insert commit together.
//!
//! # Integrity
//!
//! The schema enforces the kiosk's invariants on its own:
//!
//! - a partial unique index allows one `authentication_active` session
//! - `UNIQUE(session_id, artifact_code)` keeps a booklet code to one claim
//!   per session
//!
//! # Examples
//!
//! ```no_run
//! use checkin_storage::Database;
//! use checkin_storage::repositories::{ParticipantRepository, SqliteParticipantRepository};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::in_memory().await?;
//! let participants = SqliteParticipantRepository::new(db.pool().clone());
//!
//! if let Some(p) = participants.find_by_code("S100").await? {
//!     println!("{} checked in", p.name);
//! }
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod error;
pub mod models;
pub mod repositories;
pub mod transaction;

pub use connection::{Database, DatabaseConfig};
pub use error::{StorageError, StorageResult};
