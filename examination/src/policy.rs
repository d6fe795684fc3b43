//! Scoring/branching policy.
//!
//! A pure, total function over `(score, has_active_followup, retry_count)`.
//! The runner consults it after every graded answer; keeping it free of
//! I/O makes the subtlest logic in the system exhaustively unit-testable.

use serde::{Deserialize, Serialize};

/// Scores strictly above this pass the active question.
pub const PASS_THRESHOLD: f64 = 7.0;

/// Scores in `[PARTIAL_FLOOR, PASS_THRESHOLD]` are partial; below is a fail.
pub const PARTIAL_FLOOR: f64 = 3.0;

/// Hints given per question before the session gives up and advances.
pub const MAX_RETRIES: u32 = 2;

/// What to do with the answer that was just graded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Good enough: clear any follow-up and advance to the next question.
    Pass,
    /// Partial on a main question: synthesize a narrower follow-up.
    Probe,
    /// Hint from the active rubric and let the student retry.
    Remediate,
    /// Retry budget exhausted: concede and advance.
    GiveUp,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pass => write!(f, "pass"),
            Self::Probe => write!(f, "probe"),
            Self::Remediate => write!(f, "remediate"),
            Self::GiveUp => write!(f, "give_up"),
        }
    }
}

/// Decide the branch for a graded answer.
///
/// Rules, first match wins:
/// 1. score > 7.0 → `Pass`
/// 2. score in [3.0, 7.0] with no active follow-up → `Probe`
/// 3. everything else (fail, or a follow-up that scored ≤ 7.0) →
///    `Remediate` while hints remain, `GiveUp` once the budget is spent.
///
/// A partially-correct follow-up is never probed again; recursion depth
/// is bounded at one.
pub fn decide(score: f64, has_active_followup: bool, retry_count: u32) -> Outcome {
    if score > PASS_THRESHOLD {
        return Outcome::Pass;
    }
    if score >= PARTIAL_FLOOR && !has_active_followup {
        return Outcome::Probe;
    }
    if retry_count >= MAX_RETRIES {
        Outcome::GiveUp
    } else {
        Outcome::Remediate
    }
}
