//! Failure handshake state machine.
//!
//! ```text
//! RUNNING ──► EXCEPTION_RAISED ──► AWAITING_DECISION ──► ATTACHED ─┐
//!    │                                      │                       ├─► FINISHED
//!    │                                      └─────────► DETACHED ───┘
//!    └──────────────────────────────────────────────────────────────► FINISHED
//! ```
//!
//! Both ends of a worker track the same machine. Any other transition is a
//! protocol violation.

use crate::result::{FuzzError, FuzzResult};

/// Handshake state of one worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HandshakeState {
    /// Test body executing
    #[default]
    Running,
    /// Exception captured, envelope being sent
    ExceptionRaised,
    /// Orchestrator deciding whether to attach a debugger
    AwaitingDecision,
    /// Debugger session running in the worker
    Attached,
    /// No debugger; worker tearing down
    Detached,
    /// Done; the worker may be reaped
    Finished,
}

/// Tracks one worker's progress through the handshake
#[derive(Debug, Clone, Default)]
pub struct Handshake {
    state: HandshakeState,
}

impl Handshake {
    /// Start in `Running`
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// Whether the handshake completed
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state == HandshakeState::Finished
    }

    fn advance(&mut self, from: &[HandshakeState], to: HandshakeState) -> FuzzResult<()> {
        if from.contains(&self.state) {
            self.state = to;
            Ok(())
        } else {
            Err(FuzzError::protocol(format!(
                "illegal handshake transition {:?} -> {:?}",
                self.state, to
            )))
        }
    }

    /// The test body raised
    pub fn raise(&mut self) -> FuzzResult<()> {
        self.advance(&[HandshakeState::Running], HandshakeState::ExceptionRaised)
    }

    /// The envelope reached the orchestrator
    pub fn await_decision(&mut self) -> FuzzResult<()> {
        self.advance(
            &[HandshakeState::ExceptionRaised],
            HandshakeState::AwaitingDecision,
        )
    }

    /// The attach decision was made
    pub fn resolve(&mut self, attach: bool) -> FuzzResult<()> {
        let to = if attach {
            HandshakeState::Attached
        } else {
            HandshakeState::Detached
        };
        self.advance(&[HandshakeState::AwaitingDecision], to)
    }

    /// The worker is done
    pub fn finish(&mut self) -> FuzzResult<()> {
        self.advance(
            &[
                HandshakeState::Running,
                HandshakeState::Attached,
                HandshakeState::Detached,
            ],
            HandshakeState::Finished,
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_completion() {
        let mut hs = Handshake::new();
        hs.finish().unwrap();
        assert!(hs.is_finished());
    }

    #[test]
    fn test_detached_path() {
        let mut hs = Handshake::new();
        hs.raise().unwrap();
        hs.await_decision().unwrap();
        hs.resolve(false).unwrap();
        assert_eq!(hs.state(), HandshakeState::Detached);
        hs.finish().unwrap();
        assert!(hs.is_finished());
    }

    #[test]
    fn test_attached_path() {
        let mut hs = Handshake::new();
        hs.raise().unwrap();
        hs.await_decision().unwrap();
        hs.resolve(true).unwrap();
        assert_eq!(hs.state(), HandshakeState::Attached);
        hs.finish().unwrap();
    }

    #[test]
    fn test_cannot_finish_while_awaiting_decision() {
        let mut hs = Handshake::new();
        hs.raise().unwrap();
        hs.await_decision().unwrap();
        let err = hs.finish().unwrap_err();
        assert!(matches!(err, FuzzError::Protocol { .. }));
        assert_eq!(hs.state(), HandshakeState::AwaitingDecision);
    }

    #[test]
    fn test_at_most_one_exception() {
        let mut hs = Handshake::new();
        hs.raise().unwrap();
        assert!(hs.raise().is_err());
    }

    #[test]
    fn test_no_transitions_after_finish() {
        let mut hs = Handshake::new();
        hs.finish().unwrap();
        assert!(hs.raise().is_err());
        assert!(hs.finish().is_err());
    }

    #[test]
    fn test_decision_requires_pending_exception() {
        let mut hs = Handshake::new();
        assert!(hs.resolve(true).is_err());
    }
}
