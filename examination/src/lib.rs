//! Oral Examination Core
//!
//! This library drives one oral exam from first question to completion:
//! ask → await answer → grade → branch, with bounded remediation and at
//! most one follow-up probe per main question.
//!
//! The library owns the progression logic only. Everything that talks to
//! the outside world (the grading backend, the follow-up generator, and
//! the user-facing surface) is injected through the port traits in
//! [`ports`], so the whole session is testable with deterministic stubs.
//!
//! # Modules
//! - [`plan`]: the immutable exam plan consumed by a session
//! - [`policy`]: the pure scoring/branching decision function
//! - [`state`]: mutable per-session state (index, retries, history)
//! - [`machine`]: the exam phase machine with legal-transition guards
//! - [`ports`]: capability contracts for grading, follow-ups, and I/O
//! - [`runner`]: the async loop wiring phases, state, and ports together

pub mod error;
pub mod machine;
pub mod plan;
pub mod policy;
pub mod ports;
pub mod runner;
pub mod state;

pub use error::ExamError;
pub use machine::{ExamPhase, IllegalTransition, PhaseMachine, TransitionRecord};
pub use plan::{BloomsLevel, ExamPlan, ExamQuestion, FollowupQuestion, GradingRubric};
pub use policy::{decide, Outcome, MAX_RETRIES, PARTIAL_FLOOR, PASS_THRESHOLD};
pub use ports::{
    AdapterError, FollowupError, FollowupPort, GradingError, GradingPort, InteractionPort, Verdict,
};
pub use runner::{ExamReport, ExamRunner, ExamSession};
pub use state::{SessionState, Speaker, Turn};
