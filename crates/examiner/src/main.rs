mod config;
mod console;
mod judge;
mod plan_source;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use examination::{ExamRunner, ExamSession, InteractionPort};

use config::ExaminerConfig;
use console::ConsoleIo;
use judge::LlmJudge;

/// Console oral examiner: asks the planned questions one by one, grades
/// each answer through the configured judge endpoint, and adapts with
/// follow-up probes and hints.
#[derive(Parser)]
#[command(name = "examiner", version, about)]
struct Cli {
    /// Path to the exam plan JSON produced by the planner.
    plan: PathBuf,

    /// Override the judge endpoint URL (EXAMINER_JUDGE_URL).
    #[arg(long)]
    judge_url: Option<String>,

    /// Override the judge model name (EXAMINER_JUDGE_MODEL).
    #[arg(long)]
    judge_model: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    let mut config = ExaminerConfig::default();
    if let Some(url) = cli.judge_url {
        config.judge.url = url;
    }
    if let Some(model) = cli.judge_model {
        config.judge.model = model;
    }
    info!(
        judge = %config.judge.url,
        model = %config.judge.model,
        "Examiner starting"
    );

    let plan = plan_source::load_plan(&cli.plan)?;
    let judge = LlmJudge::new(&config)?;
    let console = ConsoleIo::new();

    let mut session = ExamSession::new(plan)?;
    console
        .present(&format!("Starting exam on: {}", session.state().topic()))
        .await?;

    let runner = ExamRunner::new(&judge, &judge, &console);
    let report = runner.run(&mut session).await?;

    console.present("Exam complete.").await?;
    info!(summary = %report.summary(), "Examiner finished");
    Ok(())
}
