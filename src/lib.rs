pub mod artifacts;
pub mod db;
pub mod detector;
pub mod error;
pub mod models;
pub mod run_log;
pub mod scheduler;
pub mod session;
pub mod settings;
pub mod utils;
pub mod watcher;

use std::io::Write;

use anyhow::Result;
use clap::Parser;
use log::{error, info};
use tokio::signal;
use tokio_util::sync::CancellationToken;

use artifacts::HttpDownloader;
use session::HttpProfileFetcher;
use settings::Cli;
use watcher::ProfileWatcher;

fn level_label(level: log::Level) -> &'static str {
    match level {
        log::Level::Warn => "WARNING",
        other => other.as_str(),
    }
}

/// Run-log events get a colored banner; everything else a plain line.
fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let style = buf.default_level_style(record.level());
            let label = level_label(record.level());
            if record.target() == run_log::LOG_TARGET {
                writeln!(
                    buf,
                    "-----------------\n{style}{label}: {}{style:#}\n-----------------",
                    record.args()
                )
            } else {
                writeln!(buf, "{style}[{label}]{style:#} {}: {}", record.target(), record.args())
            }
        })
        .init();
}

pub async fn run() -> Result<()> {
    init_logging();

    let config = Cli::parse().into_config()?;
    info!(
        "profile-watcher v{} starting (target={}, interval={}s)",
        env!("CARGO_PKG_VERSION"),
        config.target,
        config.interval_secs
    );

    let fetcher = HttpProfileFetcher::new(&config.profile_base_url, config.credentials.clone())?;
    let downloader = HttpDownloader::new()?;
    let watcher = ProfileWatcher::start(config, fetcher, downloader).await?;

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown signal received");
                shutdown.cancel();
            }
            Err(err) => error!("Failed to listen for ctrl-c: {err}"),
        }
    });

    let scheduler = watcher.scheduler();
    watcher.run(scheduler, cancel).await?;
    Ok(())
}
