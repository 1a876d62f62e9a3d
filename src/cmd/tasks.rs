//! Intake dry run (`taskpilot tasks`).

use std::sync::Arc;

use anyhow::{Context, Result};

use super::super::Cli;

pub async fn cmd_tasks(cli: &Cli) -> Result<()> {
    use taskpilot::logging;
    use taskpilot::pipeline::{Collaborators, Pipeline};

    let config = super::load_config()?;
    let _guard = logging::init(&super::log_options(cli, None));

    let config = Arc::new(config);
    let pipeline = Pipeline::new(config.clone(), Collaborators::from_config(&config));
    let tasks = pipeline.intake().await.context("Intake query failed")?;

    if tasks.is_empty() {
        println!("{}", console::style("No pending tasks.").dim());
        return Ok(());
    }
    for task in &tasks {
        println!(
            "{:<12} {:<10} {}",
            console::style(&task.key).bold(),
            task.priority.as_deref().unwrap_or("-"),
            task.summary
        );
    }
    println!();
    println!("{} task(s)", tasks.len());
    Ok(())
}
