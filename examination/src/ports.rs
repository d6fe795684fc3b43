//! Capability contracts consumed by the session runner.
//!
//! The core never depends on a concrete scoring backend or user surface,
//! only on these traits. Implementations live in adapter crates (console,
//! HTTP judge) or in test stubs.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::plan::FollowupQuestion;

/// Normalized grading result for one answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verdict {
    /// Score in `[0, 10]`.
    pub score: f64,
    /// Human-readable grading feedback.
    pub feedback: String,
    /// Per-metric scores behind the blended `score`.
    pub metric_breakdown: HashMap<String, f64>,
}

impl Verdict {
    /// A FAIL-range verdict used when the backend answered but produced no
    /// usable score.
    pub fn fail_range(feedback: impl Into<String>) -> Self {
        Self {
            score: 0.0,
            feedback: feedback.into(),
            metric_breakdown: HashMap::new(),
        }
    }
}

/// Failures of the grading backend.
#[derive(Debug, Clone, Error)]
pub enum GradingError {
    /// The scoring backend cannot be reached.
    #[error("grading backend unavailable: {0}")]
    Unavailable(String),
    /// The backend exceeded the configured deadline.
    #[error("grading timed out: {0}")]
    Timeout(String),
    /// The backend responded but no numeric score could be extracted.
    /// Callers must degrade this to a FAIL-range verdict, never skip
    /// grading.
    #[error("grading response unusable: {0}")]
    Format(String),
}

/// Failure of follow-up synthesis. Callers substitute
/// [`FollowupQuestion::fallback`] rather than propagate.
#[derive(Debug, Clone, Error)]
#[error("follow-up generation failed: {0}")]
pub struct FollowupError(pub String);

/// Failures of the interaction surface.
#[derive(Debug, Clone, Error)]
pub enum AdapterError {
    /// The surface can no longer display questions or collect answers.
    #[error("interaction adapter disconnected: {0}")]
    Disconnected(String),
}

/// Grades one answer against a rubric, grounded in a context excerpt.
#[async_trait]
pub trait GradingPort: Send + Sync {
    /// `exemplar`, when present, is preferred over `criteria` as grading
    /// ground truth.
    async fn evaluate<'a>(
        &self,
        question: &'a str,
        answer: &'a str,
        context: &'a str,
        criteria: &'a str,
        exemplar: Option<&'a str>,
    ) -> Result<Verdict, GradingError>;
}

/// Synthesizes a narrower follow-up targeting the concepts an answer missed.
#[async_trait]
pub trait FollowupPort: Send + Sync {
    async fn generate_followup(
        &self,
        question: &str,
        answer: &str,
        rubric_criteria: &str,
        context: &str,
    ) -> Result<FollowupQuestion, FollowupError>;
}

/// Presents questions and collects free-text answers.
///
/// `collect_answer` is the session's single suspension point; it may block
/// (console) or await an external event (web, GUI). Returned answers are
/// trimmed by the adapter. Empty answers are valid and get graded.
#[async_trait]
pub trait InteractionPort: Send + Sync {
    async fn present(&self, text: &str) -> Result<(), AdapterError>;
    async fn collect_answer(&self) -> Result<String, AdapterError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fail_range_verdict_is_a_fail() {
        let verdict = Verdict::fail_range("no score in response");
        assert_eq!(verdict.score, 0.0);
        assert!(verdict.score < crate::policy::PARTIAL_FLOOR);
        assert!(verdict.metric_breakdown.is_empty());
    }
}
