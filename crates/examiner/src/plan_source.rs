//! Exam plan loading.
//!
//! The planner runs upstream and writes its plan as JSON; the examiner
//! consumes that file read-only. Structural validation happens when the
//! session is created.

use std::path::Path;

use anyhow::{Context, Result};

use examination::ExamPlan;

pub fn load_plan(path: &Path) -> Result<ExamPlan> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read exam plan {}", path.display()))?;
    let plan: ExamPlan = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse exam plan {}", path.display()))?;
    Ok(plan)
}
