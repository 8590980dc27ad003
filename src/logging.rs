use anyhow::Result;
use tracing_subscriber::fmt;

pub fn init(verbose: bool) -> Result<()> {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    let _ = fmt()
        .with_target(false)
        .with_level(true)
        .with_max_level(level)
        .try_init();
    Ok(())
}
