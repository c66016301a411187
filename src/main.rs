mod bridge;
mod core;
mod engine;
mod input;
mod player;
mod window;

use crate::core::{AppConfig, OptionParser};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let parser = OptionParser::from_env();
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config, using defaults: {}", e);
        AppConfig::default()
    });

    window::host::run(config, parser)
}
