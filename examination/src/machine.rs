//! Exam phase machine: explicit phases and legal transition guards.
//!
//! The session runner calls `advance()` to move between phases. Each call
//! validates the move against the transition table and records it, so a
//! finished session carries a complete, replayable phase log.

use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};

/// The set of exam session phases.
///
/// Every session starts at `AskingMain` and terminates at `Complete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExamPhase {
    /// Emitting the current main question.
    AskingMain,
    /// Suspended until the student supplies an answer.
    AwaitingAnswer,
    /// Invoking the grading port on the pending answer.
    Grading,
    /// Applying the scoring policy to the fresh verdict.
    Branching,
    /// Emitting a synthesized follow-up question.
    AskingFollowup,
    /// Hinting and retrying, or conceding the question.
    Remediating,
    /// Exam finished; terminal phase.
    Complete,
}

impl ExamPhase {
    /// Whether this is the terminal phase (no further transitions).
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete)
    }
}

impl fmt::Display for ExamPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AskingMain => write!(f, "AskingMain"),
            Self::AwaitingAnswer => write!(f, "AwaitingAnswer"),
            Self::Grading => write!(f, "Grading"),
            Self::Branching => write!(f, "Branching"),
            Self::AskingFollowup => write!(f, "AskingFollowup"),
            Self::Remediating => write!(f, "Remediating"),
            Self::Complete => write!(f, "Complete"),
        }
    }
}

/// Legal transitions between exam phases.
///
/// ```text
/// AskingMain     → AwaitingAnswer
/// AskingFollowup → AwaitingAnswer
/// AwaitingAnswer → Grading
/// Grading        → Branching
/// Branching      → AskingMain | AskingFollowup | Remediating | Complete
/// Remediating    → AwaitingAnswer | AskingMain | Complete
/// ```
fn is_legal_transition(from: ExamPhase, to: ExamPhase) -> bool {
    use ExamPhase::*;

    matches!(
        (from, to),
        (AskingMain, AwaitingAnswer)
            | (AskingFollowup, AwaitingAnswer)
            | (AwaitingAnswer, Grading)
            | (Grading, Branching)
            // Branching: pass-advance, probe, remediation, or exam end
            | (Branching, AskingMain)
            | (Branching, AskingFollowup)
            | (Branching, Remediating)
            | (Branching, Complete)
            // Remediating: hint-and-retry, or give-up advance
            | (Remediating, AwaitingAnswer)
            | (Remediating, AskingMain)
            | (Remediating, Complete)
    )
}

/// A single recorded phase transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from: ExamPhase,
    pub to: ExamPhase,
    /// Number of answers collected so far at the time of the transition.
    pub answer_cycle: u32,
    /// Milliseconds since the session began.
    pub elapsed_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Error returned when an illegal transition is attempted.
#[derive(Debug, Clone)]
pub struct IllegalTransition {
    pub from: ExamPhase,
    pub to: ExamPhase,
}

impl fmt::Display for IllegalTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "illegal exam phase transition: {} → {}", self.from, self.to)
    }
}

impl std::error::Error for IllegalTransition {}

/// Tracks the current phase, enforces legal transitions, and keeps the
/// full transition log for replay and diagnostics.
#[derive(Debug)]
pub struct PhaseMachine {
    current: ExamPhase,
    answer_cycle: u32,
    created_at: Instant,
    transitions: Vec<TransitionRecord>,
}

impl PhaseMachine {
    /// Create a new machine starting at `AskingMain`.
    pub fn new() -> Self {
        Self {
            current: ExamPhase::AskingMain,
            answer_cycle: 0,
            created_at: Instant::now(),
            transitions: Vec::new(),
        }
    }

    pub fn current(&self) -> ExamPhase {
        self.current
    }

    pub fn answer_cycle(&self) -> u32 {
        self.answer_cycle
    }

    /// Count one collected answer.
    pub fn count_answer(&mut self) {
        self.answer_cycle += 1;
    }

    pub fn is_terminal(&self) -> bool {
        self.current.is_terminal()
    }

    pub fn transitions(&self) -> &[TransitionRecord] {
        &self.transitions
    }

    /// Attempt to advance to the next phase.
    pub fn advance(
        &mut self,
        to: ExamPhase,
        reason: Option<&str>,
    ) -> Result<(), IllegalTransition> {
        if !is_legal_transition(self.current, to) {
            return Err(IllegalTransition {
                from: self.current,
                to,
            });
        }

        let record = TransitionRecord {
            from: self.current,
            to,
            answer_cycle: self.answer_cycle,
            elapsed_ms: self.created_at.elapsed().as_millis() as u64,
            reason: reason.map(String::from),
        };

        tracing::debug!(
            from = %self.current,
            to = %to,
            answer_cycle = self.answer_cycle,
            "Phase transition"
        );

        self.transitions.push(record);
        self.current = to;
        Ok(())
    }

    /// One-line history summary for logs.
    pub fn summary(&self) -> String {
        format!(
            "{} → {} ({} answers, {} transitions)",
            ExamPhase::AskingMain,
            self.current,
            self.answer_cycle,
            self.transitions.len(),
        )
    }
}

impl Default for PhaseMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_phase() {
        let machine = PhaseMachine::new();
        assert_eq!(machine.current(), ExamPhase::AskingMain);
        assert!(!machine.is_terminal());
        assert_eq!(machine.transitions().len(), 0);
    }

    #[test]
    fn clean_pass_path() {
        let mut machine = PhaseMachine::new();

        machine.advance(ExamPhase::AwaitingAnswer, None).unwrap();
        machine.count_answer();
        machine.advance(ExamPhase::Grading, None).unwrap();
        machine.advance(ExamPhase::Branching, Some("score 9.0")).unwrap();
        machine.advance(ExamPhase::Complete, Some("last question passed")).unwrap();

        assert!(machine.is_terminal());
        assert_eq!(machine.answer_cycle(), 1);
        assert_eq!(machine.transitions().len(), 4);
    }

    #[test]
    fn probe_path() {
        let mut machine = PhaseMachine::new();

        machine.advance(ExamPhase::AwaitingAnswer, None).unwrap();
        machine.advance(ExamPhase::Grading, None).unwrap();
        machine.advance(ExamPhase::Branching, None).unwrap();
        // Partial → follow-up
        machine.advance(ExamPhase::AskingFollowup, Some("score 5.0")).unwrap();
        machine.advance(ExamPhase::AwaitingAnswer, None).unwrap();
        machine.advance(ExamPhase::Grading, None).unwrap();
        machine.advance(ExamPhase::Branching, None).unwrap();
        machine.advance(ExamPhase::Complete, Some("follow-up passed")).unwrap();

        assert!(machine.is_terminal());
    }

    #[test]
    fn remediation_loops_back_to_awaiting() {
        let mut machine = PhaseMachine::new();

        machine.advance(ExamPhase::AwaitingAnswer, None).unwrap();
        machine.advance(ExamPhase::Grading, None).unwrap();
        machine.advance(ExamPhase::Branching, None).unwrap();
        machine.advance(ExamPhase::Remediating, Some("score 2.0")).unwrap();
        // Hint issued; the same question stays active, no re-ask.
        machine.advance(ExamPhase::AwaitingAnswer, Some("hint issued")).unwrap();

        assert_eq!(machine.current(), ExamPhase::AwaitingAnswer);
    }

    #[test]
    fn give_up_advances_to_next_main_question() {
        let mut machine = PhaseMachine::new();

        machine.advance(ExamPhase::AwaitingAnswer, None).unwrap();
        machine.advance(ExamPhase::Grading, None).unwrap();
        machine.advance(ExamPhase::Branching, None).unwrap();
        machine.advance(ExamPhase::Remediating, None).unwrap();
        machine.advance(ExamPhase::AskingMain, Some("retries exhausted")).unwrap();

        assert_eq!(machine.current(), ExamPhase::AskingMain);
    }

    #[test]
    fn no_transition_out_of_complete() {
        let mut machine = PhaseMachine::new();
        machine.advance(ExamPhase::AwaitingAnswer, None).unwrap();
        machine.advance(ExamPhase::Grading, None).unwrap();
        machine.advance(ExamPhase::Branching, None).unwrap();
        machine.advance(ExamPhase::Complete, None).unwrap();

        for to in [
            ExamPhase::AskingMain,
            ExamPhase::AwaitingAnswer,
            ExamPhase::Grading,
            ExamPhase::Branching,
            ExamPhase::AskingFollowup,
            ExamPhase::Remediating,
        ] {
            let err = machine.advance(to, None).unwrap_err();
            assert_eq!(err.from, ExamPhase::Complete);
            assert_eq!(err.to, to);
        }
    }

    #[test]
    fn illegal_skips_are_rejected() {
        let mut machine = PhaseMachine::new();

        // Cannot grade before an answer arrives.
        assert!(machine.advance(ExamPhase::Grading, None).is_err());
        // Cannot branch straight from asking.
        assert!(machine.advance(ExamPhase::Branching, None).is_err());

        machine.advance(ExamPhase::AwaitingAnswer, None).unwrap();
        // Cannot go back to asking while awaiting.
        assert!(machine.advance(ExamPhase::AskingMain, None).is_err());
    }

    #[test]
    fn transition_record_carries_reason_and_cycle() {
        let mut machine = PhaseMachine::new();
        machine.count_answer();
        machine
            .advance(ExamPhase::AwaitingAnswer, Some("question 1 asked"))
            .unwrap();

        let record = &machine.transitions()[0];
        assert_eq!(record.from, ExamPhase::AskingMain);
        assert_eq!(record.to, ExamPhase::AwaitingAnswer);
        assert_eq!(record.answer_cycle, 1);
        assert_eq!(record.reason.as_deref(), Some("question 1 asked"));
    }

    #[test]
    fn transition_record_serde_roundtrip() {
        let record = TransitionRecord {
            from: ExamPhase::Branching,
            to: ExamPhase::Remediating,
            answer_cycle: 2,
            elapsed_ms: 420,
            reason: Some("score 1.5".into()),
        };

        let json = serde_json::to_string(&record).unwrap();
        let restored: TransitionRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.from, ExamPhase::Branching);
        assert_eq!(restored.to, ExamPhase::Remediating);
        assert_eq!(restored.answer_cycle, 2);
    }

    #[test]
    fn summary_mentions_current_phase() {
        let mut machine = PhaseMachine::new();
        machine.advance(ExamPhase::AwaitingAnswer, None).unwrap();
        let summary = machine.summary();
        assert!(summary.contains("AwaitingAnswer"));
        assert!(summary.contains("1 transitions"));
    }
}
