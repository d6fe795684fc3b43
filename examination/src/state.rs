//! Mutable per-session state.
//!
//! One `SessionState` exists per exam attempt. It is mutated exclusively
//! by the session runner's phase handlers; ports and adapters never touch
//! it. History is append-only and exists for audit/replay; the only thing
//! control logic ever reads back from it is the most recent answer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ExamError;
use crate::plan::{ExamPlan, ExamQuestion, FollowupQuestion};

/// Who produced a history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    /// Questions and hints emitted by the examiner.
    Examiner,
    /// Answers collected from the student.
    Student,
    /// Progression notices ("moving on", exam finished).
    System,
}

/// One appended transcript entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub speaker: Speaker,
    pub text: String,
    pub at: DateTime<Utc>,
}

/// Borrowed view of whatever question is currently being graded against:
/// the active follow-up when one is present, else the current main question.
#[derive(Debug, Clone, Copy)]
pub struct ActiveQuestion<'a> {
    pub question: &'a str,
    pub context_snippet: &'a str,
    pub criteria: &'a str,
    pub exemplar: Option<&'a str>,
    pub is_followup: bool,
}

/// The mutable core of one exam attempt.
///
/// Invariants:
/// - `current_index <= plan.questions.len()`; equality means complete.
/// - `active_followup` is only present while probing the current question
///   and is cleared on every advance.
/// - `retry_count` resets to 0 on every advance. It can transiently reach
///   `MAX_RETRIES + 1` when a probe follows a spent hint budget; the
///   policy treats anything at or past the budget as give-up territory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    session_id: Uuid,
    plan: ExamPlan,
    current_index: usize,
    retry_count: u32,
    active_followup: Option<FollowupQuestion>,
    history: Vec<Turn>,
    last_score: Option<f64>,
    give_ups: u32,
}

impl SessionState {
    /// Create state for a fresh attempt. Fails if the plan cannot back a
    /// session.
    pub fn new(plan: ExamPlan) -> Result<Self, ExamError> {
        plan.validate()?;
        Ok(Self {
            session_id: Uuid::new_v4(),
            plan,
            current_index: 0,
            retry_count: 0,
            active_followup: None,
            history: Vec::new(),
            last_score: None,
            give_ups: 0,
        })
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn topic(&self) -> &str {
        &self.plan.topic
    }

    pub fn questions_total(&self) -> usize {
        self.plan.questions.len()
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn last_score(&self) -> Option<f64> {
        self.last_score
    }

    pub fn give_ups(&self) -> u32 {
        self.give_ups
    }

    pub fn has_active_followup(&self) -> bool {
        self.active_followup.is_some()
    }

    pub fn is_complete(&self) -> bool {
        self.current_index >= self.plan.questions.len()
    }

    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    /// The current main question, or `None` once the exam is complete.
    pub fn current_question(&self) -> Option<&ExamQuestion> {
        self.plan.questions.get(self.current_index)
    }

    /// The question the next answer will be graded against.
    pub fn active_question(&self) -> Option<ActiveQuestion<'_>> {
        if let Some(fu) = &self.active_followup {
            return Some(ActiveQuestion {
                question: &fu.question,
                context_snippet: &fu.context_snippet,
                criteria: &fu.rubric.criteria,
                exemplar: fu.rubric.exemplar.as_deref(),
                is_followup: true,
            });
        }
        self.current_question().map(|q| ActiveQuestion {
            question: &q.question,
            context_snippet: &q.context_snippet,
            criteria: &q.rubric.criteria,
            exemplar: q.rubric.exemplar.as_deref(),
            is_followup: false,
        })
    }

    /// Append a transcript entry.
    pub fn record(&mut self, speaker: Speaker, text: impl Into<String>) {
        self.history.push(Turn {
            speaker,
            text: text.into(),
            at: Utc::now(),
        });
    }

    /// The most recently collected answer, if any.
    pub fn last_answer(&self) -> Option<&str> {
        self.history
            .iter()
            .rev()
            .find(|t| t.speaker == Speaker::Student)
            .map(|t| t.text.as_str())
    }

    pub fn set_last_score(&mut self, score: f64) {
        self.last_score = Some(score);
    }

    /// Enter the probe branch: store the synthesized follow-up and spend
    /// one retry.
    pub fn begin_probe(&mut self, followup: FollowupQuestion) {
        debug_assert!(!self.is_complete());
        self.active_followup = Some(followup);
        self.retry_count += 1;
    }

    /// A hint was issued; spend one retry.
    pub fn note_hint(&mut self) {
        self.retry_count += 1;
    }

    /// The current question was conceded without a passing answer.
    pub fn note_give_up(&mut self) {
        self.give_ups += 1;
    }

    /// Move to the next main question: discard any follow-up, reset the
    /// retry budget, clear the last score.
    pub fn advance_question(&mut self) {
        debug_assert!(!self.is_complete());
        self.current_index += 1;
        self.retry_count = 0;
        self.active_followup = None;
        self.last_score = None;
    }

    /// One-line progression summary for logs.
    pub fn summary(&self) -> String {
        format!(
            "session={} question={}/{} retries={} followup={} give_ups={}",
            self.session_id,
            self.current_index,
            self.plan.questions.len(),
            self.retry_count,
            self.active_followup.is_some(),
            self.give_ups,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{BloomsLevel, GradingRubric};

    fn two_question_plan() -> ExamPlan {
        ExamPlan {
            topic: "unit test".into(),
            questions: vec![
                ExamQuestion {
                    blooms_level: BloomsLevel::Recall,
                    question: "first?".into(),
                    context_snippet: "ctx one".into(),
                    rubric: GradingRubric::new("criteria one"),
                },
                ExamQuestion {
                    blooms_level: BloomsLevel::Apply,
                    question: "second?".into(),
                    context_snippet: "ctx two".into(),
                    rubric: GradingRubric::new("criteria two"),
                },
            ],
        }
    }

    #[test]
    fn new_state_starts_at_first_question() {
        let state = SessionState::new(two_question_plan()).unwrap();
        assert_eq!(state.current_index(), 0);
        assert_eq!(state.retry_count(), 0);
        assert!(!state.has_active_followup());
        assert!(state.history().is_empty());
        assert!(state.last_score().is_none());
        assert!(!state.is_complete());
    }

    #[test]
    fn empty_plan_is_rejected() {
        let plan = ExamPlan {
            topic: "empty".into(),
            questions: Vec::new(),
        };
        assert!(matches!(
            SessionState::new(plan),
            Err(ExamError::PlanInvalid(_))
        ));
    }

    #[test]
    fn active_question_prefers_followup() {
        let mut state = SessionState::new(two_question_plan()).unwrap();
        assert!(!state.active_question().unwrap().is_followup);

        state.begin_probe(FollowupQuestion::fallback("probe ctx"));
        let active = state.active_question().unwrap();
        assert!(active.is_followup);
        assert_eq!(active.context_snippet, "probe ctx");
        assert_eq!(state.retry_count(), 1);
    }

    #[test]
    fn advance_clears_followup_and_retries() {
        let mut state = SessionState::new(two_question_plan()).unwrap();
        state.begin_probe(FollowupQuestion::fallback("ctx"));
        state.note_hint();
        state.set_last_score(4.0);

        state.advance_question();
        assert_eq!(state.current_index(), 1);
        assert_eq!(state.retry_count(), 0);
        assert!(!state.has_active_followup());
        assert!(state.last_score().is_none());

        state.advance_question();
        assert!(state.is_complete());
        assert!(state.active_question().is_none());
    }

    #[test]
    fn last_answer_reads_most_recent_student_turn() {
        let mut state = SessionState::new(two_question_plan()).unwrap();
        assert!(state.last_answer().is_none());

        state.record(Speaker::Examiner, "first?");
        state.record(Speaker::Student, "answer one");
        state.record(Speaker::Examiner, "hint");
        state.record(Speaker::Student, "answer two");
        assert_eq!(state.last_answer(), Some("answer two"));
    }
}
