//! Configuration view (`taskpilot config`).

use anyhow::Result;

pub fn cmd_config() -> Result<()> {
    let config = super::load_config()?;

    println!();
    println!("{}", console::style("Taskpilot Configuration").bold().cyan());
    println!();
    let width = config
        .redacted_summary()
        .iter()
        .map(|(name, _)| name.len())
        .max()
        .unwrap_or(0);
    for (name, value) in config.redacted_summary() {
        println!("  {:<width$}  {}", name, value, width = width);
    }
    println!();
    Ok(())
}
