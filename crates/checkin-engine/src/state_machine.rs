//! Scan-session state machine.
//!
//! The kiosk cycles between two scan steps while a session is active:
//!
//! - `NoActiveSession`: nothing is accepted
//! - `AwaitingIdentity`: the next scan must be a participant ID
//! - `AwaitingArtifact`: the verified participant must present a booklet
//!
//! # Valid Transitions
//!
//! - NoActiveSession → AwaitingIdentity (session activated)
//! - AwaitingIdentity → AwaitingArtifact (identity verified)
//! - AwaitingArtifact → AwaitingIdentity (booklet recorded, or recovery)
//! - AwaitingIdentity | AwaitingArtifact → NoActiveSession (deactivated)
//!
//! The machine is in-process only. The durable form of the phase is the
//! Status Store's `expected_kind`; after a restart the engine rebuilds the
//! machine with [`StateMachine::restored`].
//!
//! # Examples
//!
//! ```
//! use checkin_engine::{ScanPhase, StateMachine};
//!
//! let mut machine = StateMachine::new();
//! assert_eq!(machine.current_state(), &ScanPhase::NoActiveSession);
//!
//! machine.transition_to(ScanPhase::AwaitingIdentity).unwrap();
//! assert!(machine.transition_to(ScanPhase::NoActiveSession).is_ok());
//! assert!(machine.transition_to(ScanPhase::AwaitingArtifact).is_err());
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::time::Instant;

use checkin_core::{Error, ExpectedKind, Result};
use serde::{Deserialize, Serialize};

/// Transitions kept in the log. One check-in is two transitions.
const LOG_CAPACITY: usize = 100;

/// Phase of the check-in cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanPhase {
    /// No session is accepting scans.
    NoActiveSession,

    /// Waiting for a participant identity code.
    AwaitingIdentity,

    /// Identity verified, waiting for the participant's artifact code.
    AwaitingArtifact,
}

impl fmt::Display for ScanPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = match self {
            ScanPhase::NoActiveSession => "NoActiveSession",
            ScanPhase::AwaitingIdentity => "AwaitingIdentity",
            ScanPhase::AwaitingArtifact => "AwaitingArtifact",
        };
        f.write_str(phase)
    }
}

impl ScanPhase {
    /// Check if transition to `target` is allowed from this phase.
    ///
    /// ```
    /// use checkin_engine::ScanPhase;
    ///
    /// assert!(ScanPhase::NoActiveSession.can_transition_to(&ScanPhase::AwaitingIdentity));
    /// assert!(!ScanPhase::NoActiveSession.can_transition_to(&ScanPhase::AwaitingArtifact));
    /// ```
    pub fn can_transition_to(&self, target: &ScanPhase) -> bool {
        matches!(
            (self, target),
            // Session activated
            (ScanPhase::NoActiveSession, ScanPhase::AwaitingIdentity)
            // Identity verified
            | (ScanPhase::AwaitingIdentity, ScanPhase::AwaitingArtifact)
            // Booklet recorded or state recovered
            | (ScanPhase::AwaitingArtifact, ScanPhase::AwaitingIdentity)
            // Session deactivated
            | (ScanPhase::AwaitingIdentity | ScanPhase::AwaitingArtifact, ScanPhase::NoActiveSession)
        )
    }

    /// Phase matching a persisted expectation.
    pub fn from_expected(kind: ExpectedKind) -> Self {
        match kind {
            ExpectedKind::None => ScanPhase::NoActiveSession,
            ExpectedKind::Identity => ScanPhase::AwaitingIdentity,
            ExpectedKind::Artifact => ScanPhase::AwaitingArtifact,
        }
    }

    /// The expectation this phase persists as.
    pub fn expected_kind(&self) -> ExpectedKind {
        match self {
            ScanPhase::NoActiveSession => ExpectedKind::None,
            ScanPhase::AwaitingIdentity => ExpectedKind::Identity,
            ScanPhase::AwaitingArtifact => ExpectedKind::Artifact,
        }
    }
}

/// One recorded phase change.
///
/// `at` is process-local and not serialized; a deserialized record carries
/// the time of deserialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub from: ScanPhase,
    pub to: ScanPhase,
    #[serde(skip, default = "Instant::now")]
    pub at: Instant,
}

impl StateTransition {
    pub fn new(from: ScanPhase, to: ScanPhase) -> Self {
        Self {
            from,
            to,
            at: Instant::now(),
        }
    }
}

/// Validated scan-phase machine with a bounded transition log.
///
/// Not synchronized; the engine owning it sits behind a
/// `tokio::sync::Mutex`.
#[derive(Debug)]
pub struct StateMachine {
    phase: ScanPhase,
    log: VecDeque<StateTransition>,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::restored(ScanPhase::NoActiveSession)
    }
}

impl StateMachine {
    /// Machine in `NoActiveSession` with an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Machine resumed in `phase`, e.g. from the Status Store after a restart.
    ///
    /// ```
    /// use checkin_engine::{ScanPhase, StateMachine};
    ///
    /// let machine = StateMachine::restored(ScanPhase::AwaitingArtifact);
    /// assert_eq!(machine.current_state(), &ScanPhase::AwaitingArtifact);
    /// assert!(machine.history().is_empty());
    /// ```
    pub fn restored(phase: ScanPhase) -> Self {
        Self {
            phase,
            log: VecDeque::with_capacity(LOG_CAPACITY),
        }
    }

    pub fn current_state(&self) -> &ScanPhase {
        &self.phase
    }

    /// Logged transitions, oldest first.
    pub fn history(&self) -> &VecDeque<StateTransition> {
        &self.log
    }

    /// Move to `target` if the transition table allows it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidStateTransition`] and leaves the machine
    /// untouched if the move is not allowed.
    pub fn transition_to(&mut self, target: ScanPhase) -> Result<StateTransition> {
        if !self.phase.can_transition_to(&target) {
            return Err(Error::InvalidStateTransition {
                from: self.phase.to_string(),
                to: target.to_string(),
            });
        }
        Ok(self.record(target))
    }

    /// Move to `target` unless already there.
    ///
    /// Returns `Ok(None)` when the machine is already in `target`.
    ///
    /// # Errors
    ///
    /// Same as [`StateMachine::transition_to`].
    pub fn ensure_state(&mut self, target: ScanPhase) -> Result<Option<StateTransition>> {
        if self.phase == target {
            return Ok(None);
        }
        self.transition_to(target).map(Some)
    }

    /// Jump to `phase` without consulting the table, keeping the log.
    ///
    /// Used when the Status Store was changed behind the engine's back; the
    /// jump itself is logged.
    pub fn force(&mut self, phase: ScanPhase) -> StateTransition {
        self.record(phase)
    }

    /// Force the machine into `NoActiveSession`.
    pub fn reset(&mut self) -> StateTransition {
        self.force(ScanPhase::NoActiveSession)
    }

    fn record(&mut self, target: ScanPhase) -> StateTransition {
        let transition = StateTransition::new(self.phase, target);
        self.phase = target;
        if self.log.len() == LOG_CAPACITY {
            self.log.pop_front();
        }
        self.log.push_back(transition.clone());
        transition
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const ALL: [ScanPhase; 3] = [
        ScanPhase::NoActiveSession,
        ScanPhase::AwaitingIdentity,
        ScanPhase::AwaitingArtifact,
    ];

    #[test]
    fn test_new_machine_has_no_session() {
        let machine = StateMachine::new();
        assert_eq!(machine.current_state(), &ScanPhase::NoActiveSession);
        assert!(machine.history().is_empty());
    }

    #[rstest]
    #[case(ScanPhase::NoActiveSession, ScanPhase::AwaitingIdentity, true)]
    #[case(ScanPhase::NoActiveSession, ScanPhase::AwaitingArtifact, false)]
    #[case(ScanPhase::AwaitingIdentity, ScanPhase::AwaitingArtifact, true)]
    #[case(ScanPhase::AwaitingIdentity, ScanPhase::NoActiveSession, true)]
    #[case(ScanPhase::AwaitingArtifact, ScanPhase::AwaitingIdentity, true)]
    #[case(ScanPhase::AwaitingArtifact, ScanPhase::NoActiveSession, true)]
    fn test_transition_table(
        #[case] from: ScanPhase,
        #[case] to: ScanPhase,
        #[case] allowed: bool,
    ) {
        assert_eq!(from.can_transition_to(&to), allowed);
    }

    #[test]
    fn test_self_transitions_are_invalid() {
        for phase in ALL {
            assert!(!phase.can_transition_to(&phase), "{phase} -> {phase}");
        }
    }

    #[test]
    fn test_full_check_in_cycle() {
        let mut machine = StateMachine::new();
        machine.transition_to(ScanPhase::AwaitingIdentity).unwrap();
        machine.transition_to(ScanPhase::AwaitingArtifact).unwrap();
        machine.transition_to(ScanPhase::AwaitingIdentity).unwrap();
        machine.transition_to(ScanPhase::NoActiveSession).unwrap();

        let phases: Vec<_> = machine.history().iter().map(|t| t.to).collect();
        assert_eq!(
            phases,
            vec![
                ScanPhase::AwaitingIdentity,
                ScanPhase::AwaitingArtifact,
                ScanPhase::AwaitingIdentity,
                ScanPhase::NoActiveSession,
            ]
        );
    }

    #[test]
    fn test_invalid_transition_leaves_machine_untouched() {
        let mut machine = StateMachine::new();
        let err = machine
            .transition_to(ScanPhase::AwaitingArtifact)
            .unwrap_err();

        assert!(matches!(
            err,
            Error::InvalidStateTransition { ref from, ref to }
                if from == "NoActiveSession" && to == "AwaitingArtifact"
        ));
        assert_eq!(machine.current_state(), &ScanPhase::NoActiveSession);
        assert!(machine.history().is_empty());
    }

    #[test]
    fn test_ensure_state_is_noop_when_already_there() {
        let mut machine = StateMachine::restored(ScanPhase::AwaitingIdentity);

        assert!(
            machine
                .ensure_state(ScanPhase::AwaitingIdentity)
                .unwrap()
                .is_none()
        );
        assert!(machine.history().is_empty());
        assert!(
            machine
                .ensure_state(ScanPhase::AwaitingArtifact)
                .unwrap()
                .is_some()
        );
    }

    #[test]
    fn test_reset_from_any_phase() {
        for phase in ALL {
            let mut machine = StateMachine::restored(phase);
            let transition = machine.reset();
            assert_eq!(transition.from, phase);
            assert_eq!(machine.current_state(), &ScanPhase::NoActiveSession);
        }
    }

    #[test]
    fn test_log_drops_oldest() {
        let mut machine = StateMachine::restored(ScanPhase::AwaitingIdentity);
        machine.transition_to(ScanPhase::NoActiveSession).unwrap();
        machine.transition_to(ScanPhase::AwaitingIdentity).unwrap();

        for _ in 0..LOG_CAPACITY / 2 {
            machine.transition_to(ScanPhase::AwaitingArtifact).unwrap();
            machine.transition_to(ScanPhase::AwaitingIdentity).unwrap();
        }

        assert_eq!(machine.history().len(), LOG_CAPACITY);
        assert!(machine.history().iter().all(|t| t.from != ScanPhase::NoActiveSession));
        assert_eq!(machine.history().back().unwrap().to, ScanPhase::AwaitingIdentity);
    }

    #[test]
    fn test_force_skips_table_but_is_logged() {
        let mut machine = StateMachine::new();
        let transition = machine.force(ScanPhase::AwaitingArtifact);

        assert_eq!(transition.from, ScanPhase::NoActiveSession);
        assert_eq!(machine.current_state(), &ScanPhase::AwaitingArtifact);
        assert_eq!(machine.history().len(), 1);
    }

    #[test]
    fn test_expected_kind_mapping() {
        for phase in ALL {
            assert_eq!(ScanPhase::from_expected(phase.expected_kind()), phase);
        }
    }

    #[test]
    fn test_transition_serialization_skips_instant() {
        let transition = StateTransition::new(ScanPhase::AwaitingIdentity, ScanPhase::AwaitingArtifact);
        let json = serde_json::to_value(&transition).unwrap();

        assert_eq!(json["from"], "awaiting_identity");
        assert_eq!(json["to"], "awaiting_artifact");
        assert!(json.get("at").is_none());
    }
}
