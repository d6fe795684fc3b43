//! Session-level error taxonomy.
//!
//! Callers can query `is_recoverable()` without string matching:
//!
//! | Error                 | Recoverable | Session effect |
//! |-----------------------|-------------|----------------|
//! | PlanInvalid           | no          | exam never starts |
//! | GradingUnavailable    | yes         | resumable at `Grading` |
//! | GradingTimeout        | yes         | resumable at `Grading` |
//! | GradingFormat         | yes         | degraded to a FAIL-range verdict |
//! | FollowupGeneration    | yes         | generic fallback follow-up |
//! | AdapterDisconnected   | no          | no further answers can arrive |
//! | IllegalTransition     | no          | progression bug, fail loudly |

use thiserror::Error;

use crate::machine::IllegalTransition;
use crate::ports::{AdapterError, FollowupError, GradingError};

/// Unified error type for exam session operations.
#[derive(Debug, Error)]
pub enum ExamError {
    /// The exam plan cannot back a session (empty, or a rubric is missing).
    #[error("invalid exam plan: {0}")]
    PlanInvalid(String),

    /// The grading backend could not be reached.
    #[error("grading backend unavailable: {0}")]
    GradingUnavailable(String),

    /// The grading backend exceeded its deadline.
    #[error("grading timed out: {0}")]
    GradingTimeout(String),

    /// The grading backend produced no usable numeric score.
    #[error("grading response unusable: {0}")]
    GradingFormat(String),

    /// Follow-up synthesis failed and no fallback could be applied.
    #[error("follow-up generation failed: {0}")]
    FollowupGeneration(String),

    /// The interaction surface can no longer collect answers.
    #[error("interaction adapter disconnected: {0}")]
    AdapterDisconnected(String),

    /// The phase machine was asked to make an illegal move.
    #[error(transparent)]
    IllegalTransition(#[from] IllegalTransition),
}

impl ExamError {
    /// Whether the session can continue (or be resumed) after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::GradingUnavailable(_)
                | Self::GradingTimeout(_)
                | Self::GradingFormat(_)
                | Self::FollowupGeneration(_)
        )
    }
}

impl From<GradingError> for ExamError {
    fn from(err: GradingError) -> Self {
        match err {
            GradingError::Unavailable(msg) => Self::GradingUnavailable(msg),
            GradingError::Timeout(msg) => Self::GradingTimeout(msg),
            GradingError::Format(msg) => Self::GradingFormat(msg),
        }
    }
}

impl From<FollowupError> for ExamError {
    fn from(err: FollowupError) -> Self {
        Self::FollowupGeneration(err.0)
    }
}

impl From<AdapterError> for ExamError {
    fn from(err: AdapterError) -> Self {
        match err {
            AdapterError::Disconnected(msg) => Self::AdapterDisconnected(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grading_failures_are_recoverable() {
        assert!(ExamError::GradingUnavailable("conn refused".into()).is_recoverable());
        assert!(ExamError::GradingTimeout("120s".into()).is_recoverable());
        assert!(ExamError::GradingFormat("not json".into()).is_recoverable());
        assert!(ExamError::FollowupGeneration("empty".into()).is_recoverable());
    }

    #[test]
    fn plan_and_adapter_failures_are_fatal() {
        assert!(!ExamError::PlanInvalid("no questions".into()).is_recoverable());
        assert!(!ExamError::AdapterDisconnected("stdin closed".into()).is_recoverable());
    }

    #[test]
    fn port_errors_convert() {
        let err: ExamError = GradingError::Timeout("deadline".into()).into();
        assert!(matches!(err, ExamError::GradingTimeout(_)));

        let err: ExamError = FollowupError("blank question".into()).into();
        assert!(matches!(err, ExamError::FollowupGeneration(_)));

        let err: ExamError = AdapterError::Disconnected("eof".into()).into();
        assert!(!err.is_recoverable());
    }
}
