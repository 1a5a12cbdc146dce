// SPDX-License-Identifier: Apache-2.0 OR MIT
// Demonstrates configuring the engine logger and logging from many threads
//
// Run with: cargo run --example log_burst [config.json5]

use anyhow::{Context, Result};
use engine_log::config::LogConfig;
use engine_log::logging::{self, Category, FlushMode, Severity};
use engine_log::{log_info, log_warning};
use std::path::Path;
use std::thread;

const DEFAULT_CONFIG: &str = r#"
{
    // Background drain thread, everything at info and above to stderr
    mode: "async",
    level: "info",
    console: "stderr",
}
"#;

fn main() -> Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => LogConfig::load_from_file(Path::new(&path))
            .with_context(|| format!("loading {}", path))?,
        None => LogConfig::parse(DEFAULT_CONFIG).context("parsing built-in config")?,
    };

    let sinks = config
        .apply(logging::global())
        .context("applying logging config")?;
    logging::install_log_bridge(logging::global().clone(), Category::Core)
        .context("installing log bridge")?;

    log_info!(Category::Core, "logger up with {} sink(s)", sinks.len());

    // Bursts larger than the queue stall producers instead of losing lines
    let workers: Vec<_> = (0..4)
        .map(|worker| {
            thread::spawn(move || {
                for i in 0..200 {
                    log_info!(Category::Game, "worker {} event {}", worker, i);
                }
            })
        })
        .collect();
    for worker in workers {
        worker
            .join()
            .map_err(|_| anyhow::anyhow!("worker thread panicked"))?;
    }

    log::warn!(target: "game", "routed through the log facade");
    log_warning!(Category::Core, "{} producer stalls", logging::global().stalls());
    logging::log_message(Severity::Info, "shutting down\ncleanly", Category::Core);

    logging::log_flush(FlushMode::Sync);
    logging::deinit_log();
    for sink in &sinks {
        logging::unregister_sink(sink);
    }
    Ok(())
}
