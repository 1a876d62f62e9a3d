//! CLI command implementations.
//!
//! | Module   | Commands handled |
//! |----------|------------------|
//! | `run`    | `Run`            |
//! | `tasks`  | `Tasks`          |
//! | `detect` | `Detect`         |
//! | `config` | `Config`         |

pub mod config;
pub mod detect;
pub mod run;
pub mod tasks;

use std::path::Path;

use anyhow::{Context, Result};

pub use config::cmd_config;
pub use detect::cmd_detect;
pub use run::cmd_run;
pub use tasks::cmd_tasks;

/// Load `path`, or `./.env` when no path is given. A missing default file is fine.
pub fn load_env_file(path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => {
            dotenvy::from_path(path).with_context(|| format!("Failed to load env file {}", path.display()))?;
        }
        None => {
            dotenvy::dotenv().ok();
        }
    }
    Ok(())
}

/// Load the configuration, turning a missing key into a readable CLI error.
pub fn load_config() -> Result<taskpilot::config::Config> {
    taskpilot::config::Config::from_env().context("Invalid configuration")
}

fn log_options(cli: &super::Cli, log_dir: Option<&Path>) -> taskpilot::logging::LogOptions {
    taskpilot::logging::LogOptions {
        verbose: cli.verbose,
        log_dir: log_dir.map(Path::to_path_buf),
    }
}
