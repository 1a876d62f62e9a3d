//! Full automation run (`taskpilot run`).

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use super::super::Cli;

pub async fn cmd_run(cli: &Cli, only: &[String], max_tasks: Option<usize>, cooldown_secs: Option<u64>) -> Result<()> {
    use taskpilot::logging;
    use taskpilot::models::OutcomeStatus;
    use taskpilot::pipeline::{Collaborators, Pipeline, RunOptions};

    let config = super::load_config()?;
    let _guard = logging::init(&super::log_options(cli, Some(config.log_dir.as_path())));

    let config = Arc::new(config);
    let pipeline = Pipeline::new(config.clone(), Collaborators::from_config(&config));
    let options = RunOptions {
        only: only.to_vec(),
        max_tasks,
        cooldown: cooldown_secs.map(Duration::from_secs),
    };

    let report = pipeline.run(&options).await.context("Run aborted")?;

    println!();
    if report.results.is_empty() {
        println!("{}", console::style("No tasks to process.").dim());
        return Ok(());
    }
    for (task, result) in &report.results {
        let status = result.status();
        let marker = match status {
            OutcomeStatus::Success => console::style("✓").green(),
            OutcomeStatus::Partial => console::style("⚠").yellow(),
            OutcomeStatus::Failure => console::style("✗").red(),
        };
        let detail = result
            .error
            .clone()
            .or_else(|| result.review.as_ref().and_then(|r| r.url().map(str::to_string)))
            .or_else(|| result.review.as_ref().and_then(|r| r.message().map(str::to_string)))
            .unwrap_or_default();
        println!("  {} {} {} {}", marker, console::style(&task.key).bold(), status.label(), console::style(detail).dim());
    }
    println!();
    println!("{} {}", console::style("Summary:").bold(), report.summary);
    Ok(())
}
