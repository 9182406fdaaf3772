use anyhow::{Result, anyhow};
use tracing_subscriber::{filter::EnvFilter, fmt};

use crate::config::Config;

pub fn init_tracing(cfg: &Config) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .compact()
        .try_init()
        .map_err(|e| anyhow!("init tracing: {e}"))?;
    tracing::debug!(bus = %cfg.bus, storage = %cfg.storage, "tracing initialised");
    Ok(())
}
