//! Pure state machine for a single job's lifecycle
//!
//! No I/O here. The orchestrator feeds progress events in and emits whatever
//! stage comes out.
//!
//! - `transition(state, event) -> state` is total and never panics
//! - Stages only move forward: planning → architecting → coding → complete
//! - A stage may repeat (several progress messages in the same phase)
//! - `Fail` reaches `Error` from every non-terminal state
//! - Anything else, including events after a terminal state, lands in `Error`

use forge_core::Stage;

/// Where a job is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// Accepted, nothing reported yet
    Received,
    Planning,
    Architecting,
    Coding,
    Complete,
    Error,
}

/// Progress reported by the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobEvent {
    Plan,
    Architect,
    Code,
    Finish,
    Fail,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Complete | JobState::Error)
    }

    /// Stage reported to the client, `None` before the first event
    pub fn stage(&self) -> Option<Stage> {
        match self {
            JobState::Received => None,
            JobState::Planning => Some(Stage::Planning),
            JobState::Architecting => Some(Stage::Architecting),
            JobState::Coding => Some(Stage::Coding),
            JobState::Complete => Some(Stage::Complete),
            JobState::Error => Some(Stage::Error),
        }
    }
}

/// Advance a job
pub fn transition(state: JobState, event: JobEvent) -> JobState {
    use JobEvent::*;
    use JobState::*;

    match (state, event) {
        (Received | Planning, Plan) => Planning,
        (Planning | Architecting, Architect) => Architecting,
        (Architecting | Coding, Code) => Coding,
        (Coding, Finish) => Complete,
        (Received | Planning | Architecting | Coding, Fail) => Error,
        _ => Error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let mut state = JobState::Received;
        for event in [
            JobEvent::Plan,
            JobEvent::Plan,
            JobEvent::Architect,
            JobEvent::Code,
            JobEvent::Finish,
        ] {
            state = transition(state, event);
        }
        assert_eq!(state, JobState::Complete);
        assert_eq!(state.stage(), Some(Stage::Complete));
    }

    #[test]
    fn test_fail_from_every_non_terminal_state() {
        for state in [
            JobState::Received,
            JobState::Planning,
            JobState::Architecting,
            JobState::Coding,
        ] {
            assert_eq!(transition(state, JobEvent::Fail), JobState::Error);
        }
    }

    #[test]
    fn test_skipping_a_stage_is_an_error() {
        assert_eq!(
            transition(JobState::Received, JobEvent::Code),
            JobState::Error
        );
        assert_eq!(
            transition(JobState::Planning, JobEvent::Finish),
            JobState::Error
        );
    }

    #[test]
    fn test_going_backwards_is_an_error() {
        assert_eq!(
            transition(JobState::Coding, JobEvent::Plan),
            JobState::Error
        );
    }

    #[test]
    fn test_terminal_states() {
        assert!(JobState::Complete.is_terminal());
        assert!(JobState::Error.is_terminal());
        assert!(!JobState::Coding.is_terminal());
        assert_eq!(JobState::Received.stage(), None);
        assert_eq!(
            transition(JobState::Complete, JobEvent::Finish),
            JobState::Error
        );
    }
}
