//! LLM-backed judge: one endpoint serving both the grading port and the
//! follow-up generator port.
//!
//! Talks OpenAI-compatible `chat/completions` over plain HTTP. The model
//! returns per-metric scores in [0, 1] which are blended into the final
//! [0, 10] score: 0.5·correctness + 0.3·faithfulness + 0.2·relevancy.
//! Unparseable output fails closed as `GradingError::Format`, which the
//! session runner degrades to a FAIL-range verdict.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::debug;

use examination::{
    FollowupError, FollowupPort, FollowupQuestion, GradingError, GradingPort, Verdict,
};

use crate::config::ExaminerConfig;

/// Grader preamble. The judge sees the grounding excerpt and must not
/// reward claims the excerpt does not support.
const GRADER_PREAMBLE: &str = "\
You are a strict oral-exam grader. You receive a question, a student's \
spoken answer, a verbatim context excerpt from the source material, \
grading criteria, and sometimes an exemplar answer.

Score three metrics, each a float from 0.0 to 1.0:
- faithfulness: the answer's claims are supported by the context excerpt
- relevancy: the answer actually addresses the question asked
- correctness: the answer matches the exemplar when one is given, \
otherwise the grading criteria

Respond with exactly one JSON object and nothing else:
{\"faithfulness\": 0.0, \"relevancy\": 0.0, \"correctness\": 0.0, \
\"feedback\": \"one short sentence for the student\"}";

/// Follow-up generator preamble.
const FOLLOWUP_PREAMBLE: &str = "\
You are an oral examiner. The student's answer was only partially \
correct. Write ONE narrower follow-up question that targets only the \
concepts the answer missed, plus a simplified rubric for it. The \
context_snippet must be a verbatim quote from the provided context.

Respond with exactly one JSON object and nothing else:
{\"question\": \"...\", \"context_snippet\": \"...\", \
\"rubric\": {\"criteria\": \"...\", \"exemplar\": \"...\"}}";

const CORRECTNESS_WEIGHT: f64 = 0.5;
const FAITHFULNESS_WEIGHT: f64 = 0.3;
const RELEVANCY_WEIGHT: f64 = 0.2;

/// Judge backed by one OpenAI-compatible chat-completions endpoint.
pub struct LlmJudge {
    client: reqwest::Client,
    url: String,
    model: String,
    api_key: Option<String>,
}

impl LlmJudge {
    pub fn new(config: &ExaminerConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("Failed to build judge HTTP client")?;

        Ok(Self {
            client,
            url: config.judge.url.clone(),
            model: config.judge.model.clone(),
            api_key: config.judge.api_key.clone(),
        })
    }

    async fn chat(&self, system: &str, user: &str) -> Result<String, GradingError> {
        let request_body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user}
            ],
            "temperature": 0.0,
        });

        let mut request = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .json(&request_body);
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {key}"));
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                GradingError::Timeout(e.to_string())
            } else {
                GradingError::Unavailable(e.to_string())
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GradingError::Unavailable(format!(
                "judge endpoint error ({status}): {body}"
            )));
        }

        let resp_json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| GradingError::Format(e.to_string()))?;

        let content = resp_json["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or("")
            .to_string();
        if content.is_empty() {
            return Err(GradingError::Format("empty completion content".into()));
        }
        Ok(content)
    }
}

#[async_trait]
impl GradingPort for LlmJudge {
    async fn evaluate<'a>(
        &self,
        question: &'a str,
        answer: &'a str,
        context: &'a str,
        criteria: &'a str,
        exemplar: Option<&'a str>,
    ) -> Result<Verdict, GradingError> {
        let mut user_prompt = format!(
            "## Question\n{question}\n\n## Student answer\n{answer}\n\n\
             ## Context (verbatim source excerpt)\n{context}\n\n\
             ## Grading criteria\n{criteria}\n"
        );
        if let Some(exemplar) = exemplar {
            user_prompt.push_str(&format!("\n## Exemplar answer\n{exemplar}\n"));
        }

        let content = self.chat(GRADER_PREAMBLE, &user_prompt).await?;
        let verdict = parse_verdict(&content)?;
        debug!(score = verdict.score, "Judge verdict parsed");
        Ok(verdict)
    }
}

#[async_trait]
impl FollowupPort for LlmJudge {
    async fn generate_followup(
        &self,
        question: &str,
        answer: &str,
        rubric_criteria: &str,
        context: &str,
    ) -> Result<FollowupQuestion, FollowupError> {
        let user_prompt = format!(
            "## Original question\n{question}\n\n## Student answer\n{answer}\n\n\
             ## Rubric the answer was graded against\n{rubric_criteria}\n\n\
             ## Context (verbatim source excerpt)\n{context}\n"
        );

        let content = self
            .chat(FOLLOWUP_PREAMBLE, &user_prompt)
            .await
            .map_err(|e| FollowupError(e.to_string()))?;
        parse_followup(&content)
    }
}

/// Slice out the first top-level JSON object in possibly chatty model
/// output (code fences, preambles).
fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// A metric value from the model: NaN-guarded and clamped to [0, 1].
fn metric(value: &serde_json::Value, key: &str) -> f64 {
    let raw = value.get(key).and_then(serde_json::Value::as_f64).unwrap_or(0.0);
    if raw.is_nan() {
        0.0
    } else {
        raw.clamp(0.0, 1.0)
    }
}

fn parse_verdict(content: &str) -> Result<Verdict, GradingError> {
    let json_str = extract_json(content)
        .ok_or_else(|| GradingError::Format("no JSON object in grader response".into()))?;
    let value: serde_json::Value = serde_json::from_str(json_str)
        .map_err(|e| GradingError::Format(format!("grader JSON invalid: {e}")))?;

    if ["faithfulness", "relevancy", "correctness"]
        .iter()
        .all(|k| value.get(k).and_then(serde_json::Value::as_f64).is_none())
    {
        return Err(GradingError::Format(
            "grader JSON carries no metric scores".into(),
        ));
    }

    let faithfulness = metric(&value, "faithfulness");
    let relevancy = metric(&value, "relevancy");
    let correctness = metric(&value, "correctness");

    let blended = CORRECTNESS_WEIGHT * correctness
        + FAITHFULNESS_WEIGHT * faithfulness
        + RELEVANCY_WEIGHT * relevancy;
    let score = ((blended * 10.0) * 10.0).round() / 10.0;

    let feedback = value
        .get("feedback")
        .and_then(serde_json::Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| {
            format!("F: {faithfulness:.2}, R: {relevancy:.2}, C: {correctness:.2}")
        });

    let metric_breakdown = HashMap::from([
        ("faithfulness".to_string(), faithfulness),
        ("relevancy".to_string(), relevancy),
        ("correctness".to_string(), correctness),
    ]);

    Ok(Verdict {
        score,
        feedback,
        metric_breakdown,
    })
}

fn parse_followup(content: &str) -> Result<FollowupQuestion, FollowupError> {
    let json_str = extract_json(content)
        .ok_or_else(|| FollowupError("no JSON object in follow-up response".into()))?;
    let followup: FollowupQuestion = serde_json::from_str(json_str)
        .map_err(|e| FollowupError(format!("follow-up JSON invalid: {e}")))?;

    if followup.question.trim().is_empty() {
        return Err(FollowupError("follow-up question is blank".into()));
    }
    if followup.rubric.criteria.trim().is_empty() {
        return Err(FollowupError("follow-up rubric is blank".into()));
    }
    Ok(followup)
}
