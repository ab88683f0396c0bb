//! CLI entry point for the caption crawler.

use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use capcrawl_core::{ClientConfig, Crawler, CrawlerConfig};
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::fmt::format::{DefaultFields, Format};
use tracing_subscriber::fmt::SubscriberBuilder;
use tracing_subscriber::EnvFilter;

mod cli;
mod prompt;
mod settings;

use cli::Args;
use prompt::{confirm, ConsolePrompt};
use settings::{Settings, DEFAULT_SETTINGS_FILE};

fn main() -> ExitCode {
    // Parse before installing the subscriber so --help prints cleanly
    let args = Args::parse();

    // Priority: RUST_LOG > --quiet > --verbose > info
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(args.log_level()));
    log_subscriber(filter).init();

    debug!(?args, "CLI arguments parsed");

    let result = block_on_detached(run(args)).map_err(anyhow::Error::from);
    match result.and_then(|inner| inner) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Log lines go to stderr so they never mix with prompts on stdout.
fn log_subscriber(
    filter: EnvFilter,
) -> SubscriberBuilder<DefaultFields, Format, EnvFilter, fn() -> io::Stderr> {
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr as fn() -> io::Stderr)
}

/// Drive `future` to completion on a fresh runtime.
///
/// Blocking tasks still running afterwards (a review prompt waiting on stdin)
/// are left behind instead of being waited for.
fn block_on_detached<F: Future>(future: F) -> io::Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let output = runtime.block_on(future);
    runtime.shutdown_background();
    Ok(output)
}

async fn run(args: Args) -> Result<()> {
    let (settings_path, explicit) = match &args.config {
        Some(path) => (path.clone(), true),
        None => (PathBuf::from(DEFAULT_SETTINGS_FILE), false),
    };
    let resolved = Settings::load(&settings_path, explicit)?.resolve(&args)?;
    info!(
        proxy = %resolved.proxy,
        concurrency = resolved.concurrency,
        "Settings loaded"
    );

    let resume = match args.resume_flag() {
        Some(resume) => resume,
        None => tokio::task::spawn_blocking(|| confirm("Load the previous crawl ledger?"))
            .await
            .context("resume prompt task failed")?
            .context("failed to read resume answer")?,
    };

    let config = CrawlerConfig {
        client: ClientConfig {
            concurrency: resolved.concurrency,
            proxy: Some(resolved.proxy),
            ..ClientConfig::default()
        },
        output_dir: args.output.clone(),
        inspection_dir: args.check_dir.clone(),
        ..CrawlerConfig::default()
    };

    let crawler = Crawler::new(config, Arc::new(ConsolePrompt))?;
    let summary = crawler.run(&args.ledger, resume).await?;

    info!(
        seasons = summary.seasons,
        episodes = summary.episodes,
        ledger = %args.ledger.display(),
        "Crawl complete"
    );
    println!("{summary}");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::{Duration, Instant};

    #[test]
    fn test_block_on_detached_does_not_wait_for_blocking_tasks() {
        // The sender outlives the call, so the blocking task never finishes
        let (tx, rx) = mpsc::channel::<()>();
        let started = Instant::now();

        let output = block_on_detached(async move {
            tokio::task::spawn_blocking(move || {
                let _ = rx.recv();
            });
            tokio::time::sleep(Duration::from_millis(10)).await;
            Err::<(), _>(anyhow::anyhow!("fatal"))
        })
        .unwrap();

        assert!(output.is_err());
        assert!(started.elapsed() < Duration::from_secs(5));
        drop(tx);
    }

    #[test]
    fn test_log_subscriber_writes_to_stderr() {
        let subscriber = log_subscriber(EnvFilter::new("info")).finish();
        tracing::subscriber::with_default(subscriber, || {
            info!("routed to stderr");
        });
    }
}
