//! Session runner: the async loop wiring phases, state, and ports.
//!
//! One strictly sequential pipeline per session: ask → await answer →
//! grade → branch. The runner owns no I/O of its own; the interaction
//! surface and both AI-backed ports are injected, so the same loop drives
//! a blocking console and an event-resumed web surface alike.
//!
//! Failure semantics: a grading failure propagates without applying the
//! transition, leaving the session parked at `Grading`; calling `run`
//! again re-grades the same pending answer. A follow-up generation failure
//! never propagates; the session degrades to a generic probe instead.

use tracing::{debug, info, warn};

use crate::error::ExamError;
use crate::machine::{ExamPhase, PhaseMachine};
use crate::plan::{ExamPlan, FollowupQuestion};
use crate::policy::{self, Outcome, MAX_RETRIES};
use crate::ports::{FollowupPort, GradingError, GradingPort, InteractionPort, Verdict};
use crate::state::{SessionState, Speaker};

/// Message emitted when the retry budget for a question is exhausted.
pub const GIVE_UP_MESSAGE: &str = "We seem to be stuck. Let's move to the next topic.";

/// One exam attempt: progression state plus the phase machine guarding it.
#[derive(Debug)]
pub struct ExamSession {
    state: SessionState,
    machine: PhaseMachine,
}

impl ExamSession {
    /// Create a session for a fresh attempt. Fails with
    /// [`ExamError::PlanInvalid`] if the plan cannot back an exam.
    pub fn new(plan: ExamPlan) -> Result<Self, ExamError> {
        Ok(Self {
            state: SessionState::new(plan)?,
            machine: PhaseMachine::new(),
        })
    }

    pub fn phase(&self) -> ExamPhase {
        self.machine.current()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn machine(&self) -> &PhaseMachine {
        &self.machine
    }

    pub fn is_complete(&self) -> bool {
        self.machine.is_terminal()
    }

    /// Completion summary for the surrounding application.
    pub fn report(&self) -> ExamReport {
        ExamReport {
            session_id: self.state.session_id(),
            topic: self.state.topic().to_string(),
            questions_total: self.state.questions_total(),
            answer_cycles: self.machine.answer_cycle(),
            give_ups: self.state.give_ups(),
            transitions: self.machine.transitions().len(),
        }
    }
}

/// Summary of a finished (or abandoned) session.
#[derive(Debug, Clone)]
pub struct ExamReport {
    pub session_id: uuid::Uuid,
    pub topic: String,
    pub questions_total: usize,
    pub answer_cycles: u32,
    pub give_ups: u32,
    pub transitions: usize,
}

impl ExamReport {
    pub fn summary(&self) -> String {
        format!(
            "topic=\"{}\" questions={} answers={} give_ups={}",
            self.topic, self.questions_total, self.answer_cycles, self.give_ups,
        )
    }
}

// Owned copy of the active question, so port calls don't hold a borrow on
// the session state.
struct ActiveCopy {
    question: String,
    context_snippet: String,
    criteria: String,
    exemplar: Option<String>,
    is_followup: bool,
}

/// Drives sessions using the injected ports.
pub struct ExamRunner<'a> {
    grader: &'a dyn GradingPort,
    followups: &'a dyn FollowupPort,
    io: &'a dyn InteractionPort,
}

impl<'a> ExamRunner<'a> {
    pub fn new(
        grader: &'a dyn GradingPort,
        followups: &'a dyn FollowupPort,
        io: &'a dyn InteractionPort,
    ) -> Self {
        Self {
            grader,
            followups,
            io,
        }
    }

    /// Run the session until completion or the first non-degradable failure.
    ///
    /// Safe to call again after an `Err`: the phase machine is only
    /// advanced past a step once that step has fully succeeded, so a
    /// resumed run repeats exactly the failed step.
    pub async fn run(&self, session: &mut ExamSession) -> Result<ExamReport, ExamError> {
        info!(
            session = %session.state.session_id(),
            topic = session.state.topic(),
            questions = session.state.questions_total(),
            "Exam session starting"
        );

        while !session.machine.is_terminal() {
            match session.machine.current() {
                ExamPhase::AskingMain | ExamPhase::AskingFollowup => {
                    self.ask(session).await?;
                }
                ExamPhase::AwaitingAnswer => {
                    self.collect(session).await?;
                }
                ExamPhase::Grading => {
                    self.grade(session).await?;
                }
                ExamPhase::Branching => {
                    self.branch(session).await?;
                }
                ExamPhase::Remediating => {
                    self.remediate(session).await?;
                }
                ExamPhase::Complete => break,
            }
        }

        let report = session.report();
        info!(summary = %report.summary(), "Exam session complete");
        Ok(report)
    }

    fn active_copy(session: &ExamSession) -> Option<ActiveCopy> {
        session.state.active_question().map(|aq| ActiveCopy {
            question: aq.question.to_string(),
            context_snippet: aq.context_snippet.to_string(),
            criteria: aq.criteria.to_string(),
            exemplar: aq.exemplar.map(str::to_string),
            is_followup: aq.is_followup,
        })
    }

    async fn ask(&self, session: &mut ExamSession) -> Result<(), ExamError> {
        let Some(active) = Self::active_copy(session) else {
            return self.recover_out_of_sync(session, "asking with no active question");
        };

        let text = if active.is_followup {
            format!("[Follow-up]: {}", active.question)
        } else {
            active.question
        };

        self.io.present(&text).await?;
        session.state.record(Speaker::Examiner, text);
        session.machine.advance(ExamPhase::AwaitingAnswer, None)?;
        Ok(())
    }

    async fn collect(&self, session: &mut ExamSession) -> Result<(), ExamError> {
        let answer = self.io.collect_answer().await?;
        session.machine.count_answer();
        session.state.record(Speaker::Student, answer);
        session.machine.advance(ExamPhase::Grading, None)?;
        Ok(())
    }

    async fn grade(&self, session: &mut ExamSession) -> Result<(), ExamError> {
        let Some(active) = Self::active_copy(session) else {
            return self.recover_out_of_sync(session, "grading with no active question");
        };
        let answer = session.state.last_answer().unwrap_or_default().to_string();

        let verdict = match self
            .grader
            .evaluate(
                &active.question,
                &answer,
                &active.context_snippet,
                &active.criteria,
                active.exemplar.as_deref(),
            )
            .await
        {
            Ok(verdict) => verdict,
            // No usable score is a grading result, not a crash: treat it
            // as a FAIL-range answer so the student gets a hint.
            Err(GradingError::Format(msg)) => {
                warn!(error = %msg, "Grader produced no usable score, degrading to FAIL range");
                Verdict::fail_range(msg)
            }
            // Unavailable/timeout: leave the session parked at Grading so
            // the caller can retry the same pending answer.
            Err(err) => return Err(err.into()),
        };

        let score = verdict.score.clamp(0.0, 10.0);
        info!(
            score,
            followup = active.is_followup,
            feedback = %verdict.feedback,
            "Answer graded"
        );

        session.state.set_last_score(score);
        session
            .machine
            .advance(ExamPhase::Branching, Some(&format!("score {score:.1}")))?;
        Ok(())
    }

    async fn branch(&self, session: &mut ExamSession) -> Result<(), ExamError> {
        let score = session.state.last_score().unwrap_or(0.0);
        let outcome = policy::decide(
            score,
            session.state.has_active_followup(),
            session.state.retry_count(),
        );
        debug!(
            score,
            outcome = %outcome,
            state = %session.state.summary(),
            "Branch decision"
        );

        match outcome {
            Outcome::Pass => {
                session.state.advance_question();
                self.enter_next_question(session, "answer passed").await
            }
            Outcome::Probe => {
                let Some(active) = Self::active_copy(session) else {
                    return self.recover_out_of_sync(session, "probing with no active question");
                };
                let answer = session.state.last_answer().unwrap_or_default().to_string();

                let followup = match self
                    .followups
                    .generate_followup(
                        &active.question,
                        &answer,
                        &active.criteria,
                        &active.context_snippet,
                    )
                    .await
                {
                    Ok(fu) if !fu.question.trim().is_empty() => fu,
                    Ok(_) => {
                        warn!("Follow-up generator returned a blank question, using fallback");
                        FollowupQuestion::fallback(&active.context_snippet)
                    }
                    Err(err) => {
                        warn!(error = %err, "Follow-up generation failed, using fallback");
                        FollowupQuestion::fallback(&active.context_snippet)
                    }
                };

                session.state.begin_probe(followup);
                session
                    .machine
                    .advance(ExamPhase::AskingFollowup, Some("partial answer, probing"))?;
                Ok(())
            }
            Outcome::Remediate | Outcome::GiveUp => {
                session
                    .machine
                    .advance(ExamPhase::Remediating, Some(&format!("score {score:.1}")))?;
                Ok(())
            }
        }
    }

    async fn remediate(&self, session: &mut ExamSession) -> Result<(), ExamError> {
        if session.state.retry_count() >= MAX_RETRIES {
            self.io.present(GIVE_UP_MESSAGE).await?;
            session.state.record(Speaker::System, GIVE_UP_MESSAGE);
            session.state.note_give_up();
            session.state.advance_question();
            return self.enter_next_question(session, "retry budget exhausted").await;
        }

        let Some(active) = Self::active_copy(session) else {
            return self.recover_out_of_sync(session, "remediating with no active question");
        };

        // Hint from the active rubric; the same still-active question is
        // answered again, it is not re-asked.
        let hint = format!("Not quite. Hint: {}. Try again.", active.criteria);
        self.io.present(&hint).await?;
        session.state.record(Speaker::Examiner, hint);
        session.state.note_hint();
        session
            .machine
            .advance(ExamPhase::AwaitingAnswer, Some("hint issued"))?;
        Ok(())
    }

    /// After an advance: route to the next main question or finish.
    async fn enter_next_question(
        &self,
        session: &mut ExamSession,
        reason: &str,
    ) -> Result<(), ExamError> {
        if session.state.is_complete() {
            session.state.record(Speaker::System, "Exam finished");
            session.machine.advance(ExamPhase::Complete, Some(reason))?;
        } else {
            session.machine.advance(ExamPhase::AskingMain, Some(reason))?;
        }
        Ok(())
    }

    /// The phase machine and session state disagree about whether there is
    /// an active question. This indicates a progression bug; end the exam
    /// cleanly rather than loop.
    fn recover_out_of_sync(
        &self,
        session: &mut ExamSession,
        what: &str,
    ) -> Result<(), ExamError> {
        warn!(
            phase = %session.machine.current(),
            state = %session.state.summary(),
            "{what}, forcing completion"
        );
        while !session.machine.is_terminal() {
            let next = match session.machine.current() {
                ExamPhase::AskingMain | ExamPhase::AskingFollowup => ExamPhase::AwaitingAnswer,
                ExamPhase::AwaitingAnswer => ExamPhase::Grading,
                ExamPhase::Grading => ExamPhase::Branching,
                ExamPhase::Branching | ExamPhase::Remediating => ExamPhase::Complete,
                ExamPhase::Complete => break,
            };
            session.machine.advance(next, Some("out-of-sync recovery"))?;
        }
        Ok(())
    }
}
