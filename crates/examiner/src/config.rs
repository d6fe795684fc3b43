//! Examiner configuration, resolved from environment variables.

/// OpenAI-compatible chat-completions endpoint used for grading and
/// follow-up generation.
#[derive(Debug, Clone)]
pub struct JudgeEndpoint {
    pub url: String,
    pub model: String,
    /// Bearer token; local llama.cpp-style servers need none.
    pub api_key: Option<String>,
}

/// Top-level examiner configuration.
#[derive(Debug, Clone)]
pub struct ExaminerConfig {
    pub judge: JudgeEndpoint,
    /// Per-request deadline for judge calls.
    pub request_timeout_secs: u64,
}

impl Default for ExaminerConfig {
    fn default() -> Self {
        Self {
            judge: JudgeEndpoint {
                url: std::env::var("EXAMINER_JUDGE_URL")
                    .unwrap_or_else(|_| "http://localhost:8080/v1/chat/completions".into()),
                model: std::env::var("EXAMINER_JUDGE_MODEL")
                    .unwrap_or_else(|_| "gemini-2.5-flash".into()),
                api_key: std::env::var("EXAMINER_JUDGE_API_KEY").ok(),
            },
            request_timeout_secs: std::env::var("EXAMINER_JUDGE_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(120),
        }
    }
}
