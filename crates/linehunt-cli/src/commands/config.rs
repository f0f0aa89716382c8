use anyhow::{Context, Result};
use linehunt_core::Config;

pub fn run(config: &Config) -> Result<()> {
    let rendered = toml::to_string_pretty(config).context("Failed to render config")?;
    print!("{}", rendered);
    Ok(())
}
