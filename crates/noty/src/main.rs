// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use anyhow::Context;
use clap::Parser;
use tracing::error;

use noty::config::RelayConfig;

#[tokio::main]
async fn main() {
    let config = RelayConfig::parse();

    if let Err(e) = init_tracing(&config) {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }

    if let Err(e) = noty::run(config).await {
        error!("fatal: {e:#}");
        std::process::exit(1);
    }
}

fn init_tracing(config: &RelayConfig) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let json = config.log_format == "json";

    match config.log_file {
        Some(ref path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("open log file {}", path.display()))?;
            let builder = fmt::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file));
            if json {
                builder.json().init();
            } else {
                builder.init();
            }
        }
        None => {
            let builder = fmt::fmt().with_env_filter(filter);
            if json {
                builder.json().init();
            } else {
                builder.init();
            }
        }
    }
    Ok(())
}
