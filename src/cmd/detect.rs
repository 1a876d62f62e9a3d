//! Test-runner detection (`taskpilot detect <DIR>`).

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use super::super::Cli;

pub async fn cmd_detect(cli: &Cli, dir: &Path, execute: bool) -> Result<()> {
    use taskpilot::logging;
    use taskpilot::process::SystemRunner;
    use taskpilot::test_runner::TestDetector;

    let _guard = logging::init(&super::log_options(cli, None));

    if !dir.is_dir() {
        anyhow::bail!("{} is not a directory", dir.display());
    }

    let detector = TestDetector::new(Arc::new(SystemRunner));
    let Some(plan) = detector.detect(dir) else {
        println!("Runner: none (no automated test setup detected)");
        return Ok(());
    };
    println!("Runner:  {}", console::style(plan.kind).bold());
    println!("Command: {}", plan.command_line());

    if execute {
        let outcome = detector.execute(&plan, dir).await;
        println!();
        print!("{}", outcome.stdout);
        eprint!("{}", outcome.stderr);
        if outcome.success {
            println!("{}", console::style("Tests passed").green());
        } else {
            anyhow::bail!("{} tests failed", outcome.kind);
        }
    }
    Ok(())
}
