use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cmd;

#[derive(Parser)]
#[command(name = "taskpilot")]
#[command(version, about = "Turns labelled tracker tasks into tested, review-ready branches")]
pub struct Cli {
    /// Log at debug level (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Load environment variables from this file instead of ./.env
    #[arg(long, global = true)]
    pub env_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Process every pending task: workspace, agent, tests, review request, status
    Run {
        /// Only process these task keys (comma-separated)
        #[arg(long, value_delimiter = ',')]
        only: Vec<String>,

        /// Stop after this many tasks
        #[arg(long)]
        max_tasks: Option<usize>,

        /// Pause between tasks, overriding TASK_COOLDOWN_SECS
        #[arg(long)]
        cooldown_secs: Option<u64>,
    },
    /// List the tasks the intake query currently returns
    Tasks,
    /// Show which test runner would be used for a directory
    Detect {
        /// Project directory to inspect
        dir: PathBuf,

        /// Also run the detected test command
        #[arg(long)]
        execute: bool,
    },
    /// Show the effective configuration with secrets masked
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    cmd::load_env_file(cli.env_file.as_deref())?;

    match &cli.command {
        Commands::Run {
            only,
            max_tasks,
            cooldown_secs,
        } => cmd::cmd_run(&cli, only, *max_tasks, *cooldown_secs).await?,
        Commands::Tasks => cmd::cmd_tasks(&cli).await?,
        Commands::Detect { dir, execute } => cmd::cmd_detect(&cli, dir, *execute).await?,
        Commands::Config => cmd::cmd_config()?,
    }

    Ok(())
}
