//! Exam plan data model.
//!
//! Plans are produced upstream (planner output serialized as JSON) and
//! consumed read-only by the session. Field aliases match the planner's
//! historical key names so existing plan files load unchanged, and a
//! rubric given as a bare string normalizes to `criteria` only.

use serde::{Deserialize, Serialize};

use crate::error::ExamError;

/// Question text used when follow-up generation fails.
pub const FALLBACK_FOLLOWUP_QUESTION: &str = "Could you elaborate on that?";

/// Rubric criteria paired with the fallback follow-up.
pub const FALLBACK_FOLLOWUP_CRITERIA: &str =
    "A clear elaboration that addresses the parts the previous answer missed.";

/// Bloom's taxonomy level for a question. Informational only; it never
/// affects branching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "&'static str")]
pub enum BloomsLevel {
    Recall,
    Understand,
    Apply,
    Analyze,
    Evaluate,
}

impl Default for BloomsLevel {
    fn default() -> Self {
        Self::Recall
    }
}

// Planners emit free-form level strings; anything unrecognized degrades
// to Recall rather than rejecting the plan.
impl From<String> for BloomsLevel {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "understand" | "comprehension" => Self::Understand,
            "apply" | "application" => Self::Apply,
            "analyze" | "analysis" => Self::Analyze,
            "evaluate" | "evaluation" => Self::Evaluate,
            _ => Self::Recall,
        }
    }
}

impl From<BloomsLevel> for &'static str {
    fn from(level: BloomsLevel) -> Self {
        match level {
            BloomsLevel::Recall => "Recall",
            BloomsLevel::Understand => "Understand",
            BloomsLevel::Apply => "Apply",
            BloomsLevel::Analyze => "Analyze",
            BloomsLevel::Evaluate => "Evaluate",
        }
    }
}

impl std::fmt::Display for BloomsLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", <&'static str>::from(*self))
    }
}

/// Structured grading criteria for one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradingRubric {
    /// What a correct answer must contain. Required, non-empty.
    #[serde(alias = "grading_criteria")]
    pub criteria: String,
    /// Optional concept keywords the answer should touch.
    #[serde(default, alias = "concepts")]
    pub key_concepts: Vec<String>,
    /// Ideal answer, preferred over `criteria` as grading ground truth.
    #[serde(default, alias = "exemplar_answer")]
    pub exemplar: Option<String>,
}

impl GradingRubric {
    pub fn new(criteria: impl Into<String>) -> Self {
        Self {
            criteria: criteria.into(),
            key_concepts: Vec::new(),
            exemplar: None,
        }
    }
}

// Older plan revisions wrote the rubric as a plain criteria string.
#[derive(Deserialize)]
#[serde(untagged)]
enum RubricRepr {
    Bare(String),
    Full(GradingRubric),
}

fn rubric_lenient<'de, D>(deserializer: D) -> Result<GradingRubric, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match RubricRepr::deserialize(deserializer)? {
        RubricRepr::Bare(criteria) => GradingRubric::new(criteria),
        RubricRepr::Full(rubric) => rubric,
    })
}

/// One planned question with its grounding excerpt and rubric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamQuestion {
    /// Cognitive level targeted by the planner.
    #[serde(default, alias = "type")]
    pub blooms_level: BloomsLevel,
    /// The question as asked to the student.
    pub question: String,
    /// Verbatim excerpt from the source text, supplied to the grader so
    /// scoring stays grounded.
    pub context_snippet: String,
    /// How to grade the answer.
    #[serde(alias = "grading_rubric", deserialize_with = "rubric_lenient")]
    pub rubric: GradingRubric,
}

/// A narrower question synthesized mid-session to probe a partial answer.
///
/// Ephemeral: it lives only within the current main question's remediation
/// cycle and is discarded on advance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowupQuestion {
    pub question: String,
    pub context_snippet: String,
    #[serde(deserialize_with = "rubric_lenient")]
    pub rubric: GradingRubric,
}

impl FollowupQuestion {
    /// Generic catch-all probe used when the follow-up generator fails.
    /// Reuses the original question's context so grading stays grounded.
    pub fn fallback(context_snippet: impl Into<String>) -> Self {
        Self {
            question: FALLBACK_FOLLOWUP_QUESTION.to_string(),
            context_snippet: context_snippet.into(),
            rubric: GradingRubric::new(FALLBACK_FOLLOWUP_CRITERIA),
        }
    }
}

/// An ordered exam over one topic. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamPlan {
    pub topic: String,
    pub questions: Vec<ExamQuestion>,
}

impl ExamPlan {
    /// Check the plan can back a session: at least one question, and every
    /// question carries non-empty grading criteria.
    pub fn validate(&self) -> Result<(), ExamError> {
        if self.questions.is_empty() {
            return Err(ExamError::PlanInvalid("exam plan has no questions".into()));
        }
        for (i, q) in self.questions.iter().enumerate() {
            if q.rubric.criteria.trim().is_empty() {
                return Err(ExamError::PlanInvalid(format!(
                    "question {} has empty grading criteria",
                    i + 1
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan_json() -> &'static str {
        r#"{
            "topic": "Transformer architectures",
            "questions": [
                {
                    "type": "Understand",
                    "question": "Why does self-attention scale quadratically?",
                    "context_snippet": "Attention computes pairwise scores...",
                    "grading_rubric": {
                        "grading_criteria": "Mentions pairwise token interactions",
                        "concepts": ["attention", "quadratic"],
                        "exemplar_answer": "Each token attends to every other token."
                    }
                },
                {
                    "question": "Define positional encoding.",
                    "context_snippet": "Since the model contains no recurrence...",
                    "rubric": "States that position information is injected additively"
                }
            ]
        }"#
    }

    #[test]
    fn parses_planner_aliases() {
        let plan: ExamPlan = serde_json::from_str(plan_json()).unwrap();
        assert_eq!(plan.questions.len(), 2);

        let q1 = &plan.questions[0];
        assert_eq!(q1.blooms_level, BloomsLevel::Understand);
        assert_eq!(q1.rubric.criteria, "Mentions pairwise token interactions");
        assert_eq!(q1.rubric.key_concepts, vec!["attention", "quadratic"]);
        assert_eq!(
            q1.rubric.exemplar.as_deref(),
            Some("Each token attends to every other token.")
        );
    }

    #[test]
    fn bare_string_rubric_normalizes_to_criteria() {
        let plan: ExamPlan = serde_json::from_str(plan_json()).unwrap();
        let q2 = &plan.questions[1];
        assert_eq!(
            q2.rubric.criteria,
            "States that position information is injected additively"
        );
        assert!(q2.rubric.key_concepts.is_empty());
        assert!(q2.rubric.exemplar.is_none());
    }

    #[test]
    fn unknown_blooms_level_defaults_to_recall() {
        let plan: ExamPlan = serde_json::from_str(plan_json()).unwrap();
        assert_eq!(plan.questions[1].blooms_level, BloomsLevel::Recall);

        let level = BloomsLevel::from("Synthesize".to_string());
        assert_eq!(level, BloomsLevel::Recall);
    }

    #[test]
    fn validate_rejects_empty_plan() {
        let plan = ExamPlan {
            topic: "empty".into(),
            questions: Vec::new(),
        };
        let err = plan.validate().unwrap_err();
        assert!(matches!(err, ExamError::PlanInvalid(_)));
    }

    #[test]
    fn validate_rejects_blank_criteria() {
        let plan = ExamPlan {
            topic: "blank rubric".into(),
            questions: vec![ExamQuestion {
                blooms_level: BloomsLevel::Recall,
                question: "q".into(),
                context_snippet: "ctx".into(),
                rubric: GradingRubric::new("   "),
            }],
        };
        let err = plan.validate().unwrap_err();
        assert!(err.to_string().contains("question 1"));
    }

    #[test]
    fn fallback_followup_is_well_formed() {
        let fu = FollowupQuestion::fallback("the original excerpt");
        assert!(!fu.question.is_empty());
        assert_eq!(fu.context_snippet, "the original excerpt");
        assert!(!fu.rubric.criteria.is_empty());
    }
}
