mod checkpoint;
mod crawler;
mod db;
mod discovery;
mod error;
mod extract;
mod models;
mod parser;
mod pipeline;
mod sanitize;
mod settings;
#[cfg(test)]
mod testing;
mod transport;

use std::future::Future;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::{error, warn};

use checkpoint::CheckpointStore;
use error::CrawlError;
use settings::Settings;
use transport::{Fetch, HttpTransport};

#[derive(Parser)]
#[command(name = "hn_hiring", about = "Hacker News 'Who is hiring?' crawler and job post extractor")]
struct Cli {
    /// Data directory (overrides the config file)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Config file (default: ./hn_hiring.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover threads, crawl them into per-thread files, then merge
    Crawl {
        /// Skip threads older than this month (YYYY-MM-DD)
        #[arg(long)]
        since: Option<NaiveDate>,
    },
    /// Sanitize the merged raw data and extract structured fields
    Transform {
        /// Raw dataset (default: the most recent merged file)
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// Output file (default: <data-dir>/hn_jobs_structured.sqlite)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Only process the first N rows and print them instead of saving
        #[arg(short = 'n', long)]
        sample: Option<usize>,
    },
    /// Crawl + transform in one go
    Run {
        #[arg(long)]
        since: Option<NaiveDate>,
    },
    /// Show checkpoint and dataset statistics
    Stats,
}

#[derive(Debug, PartialEq, Eq)]
enum CrawlOutcome {
    Completed,
    Interrupted,
    Failed,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let mut settings = settings::load(cli.config.as_deref())?;
    if let Some(dir) = cli.data_dir {
        settings.data_dir = dir;
    }

    let code = match cli.command {
        Commands::Crawl { since } => {
            if let Some(since) = since {
                settings.since = since;
            }
            match crawl(&settings).await? {
                CrawlOutcome::Failed => ExitCode::FAILURE,
                _ => ExitCode::SUCCESS,
            }
        }
        Commands::Transform {
            input,
            output,
            sample,
        } => {
            let summary =
                pipeline::run_transform(&settings, input.as_deref(), output.as_deref(), sample)?;
            summary.print();
            ExitCode::SUCCESS
        }
        Commands::Run { since } => {
            if let Some(since) = since {
                settings.since = since;
            }
            match crawl(&settings).await? {
                CrawlOutcome::Completed => {
                    let summary = pipeline::run_transform(&settings, None, None, None)?;
                    summary.print();
                    ExitCode::SUCCESS
                }
                CrawlOutcome::Interrupted => ExitCode::SUCCESS,
                CrawlOutcome::Failed => ExitCode::FAILURE,
            }
        }
        Commands::Stats => {
            pipeline::stats(&settings)?.print();
            ExitCode::SUCCESS
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    Ok(code)
}

/// Crawl over HTTP until done or Ctrl-C.
async fn crawl(settings: &Settings) -> anyhow::Result<CrawlOutcome> {
    let mut transport = HttpTransport::new(settings).map_err(CrawlError::from)?;
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_err() {
            warn!("Could not listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };
    crawl_until(settings, &mut transport, ctrl_c).await
}

/// Crawl and merge, stopping early when `shutdown` resolves. Interrupts and
/// crawl errors both leave a saved checkpoint and skip the merge.
async fn crawl_until<F: Fetch>(
    settings: &Settings,
    fetcher: &mut F,
    shutdown: impl Future<Output = ()>,
) -> anyhow::Result<CrawlOutcome> {
    let checkpoint = CheckpointStore::new(settings.checkpoint_path());
    let mut state = checkpoint.load();

    let result = tokio::select! {
        biased;
        _ = shutdown => None,
        res = pipeline::run_crawl(fetcher, settings, &checkpoint, &mut state) => Some(res),
    };

    match result {
        None => {
            warn!("Interrupted by user, saving checkpoint");
            checkpoint.save(&state);
            println!(
                "Interrupted. {} threads processed so far; run again to resume.",
                state.processed_thread_ids.len()
            );
            Ok(CrawlOutcome::Interrupted)
        }
        Some(Err(e)) => {
            error!("Crawl stopped: {}", e);
            checkpoint.save(&state);
            println!("Crawl stopped: {}. Progress saved to {:?}.", e, checkpoint.path());
            Ok(CrawlOutcome::Failed)
        }
        Some(Ok(stats)) => {
            println!(
                "Crawled {} threads ({} comments), {} already done, {} failed writes.",
                stats.crawled, stats.comments, stats.skipped, stats.failed_writes
            );
            match pipeline::merge(settings)? {
                Some((path, rows)) => println!("Merged {} records into {:?}", rows, path),
                None => println!("No thread data to merge."),
            }
            Ok(CrawlOutcome::Completed)
        }
    }
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::TableStore;
    use crate::testing::{comments_html, thread_list_html, ScriptedFetcher};

    const LIST: &str = "https://news.ycombinator.com/submitted?id=whoishiring";
    const THREAD: &str = "https://news.ycombinator.com/item?id=300&p=1";

    fn settings(dir: &std::path::Path) -> Settings {
        Settings {
            data_dir: dir.to_path_buf(),
            error_cooldown_secs: 0,
            max_consecutive_errors: 3,
            ..Settings::default()
        }
    }

    fn list_page() -> String {
        thread_list_html(&[("300", "Ask HN: Who is hiring? (March 2024)")], None)
    }

    fn thread_page() -> String {
        comments_html(
            "300",
            &[("301", "alice", "Acme | Rust Engineer | Remote | $150k - $180k", 0)],
            false,
        )
    }

    #[tokio::test]
    async fn completed_crawl_merges() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path());
        let mut fetcher = ScriptedFetcher::new()
            .ok(LIST, list_page())
            .ok(THREAD, thread_page());

        let outcome = crawl_until(&settings, &mut fetcher, std::future::pending())
            .await
            .unwrap();

        assert_eq!(outcome, CrawlOutcome::Completed);
        let state = CheckpointStore::new(settings.checkpoint_path()).load();
        assert!(state.is_processed("300"));
        assert_eq!(TableStore::new(dir.path()).merged_files().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn shutdown_saves_checkpoint_and_skips_merge() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path());
        let mut fetcher = ScriptedFetcher::new()
            .ok(LIST, list_page())
            .ok(THREAD, thread_page());

        let outcome = crawl_until(&settings, &mut fetcher, std::future::ready(()))
            .await
            .unwrap();

        assert_eq!(outcome, CrawlOutcome::Interrupted);
        assert!(settings.checkpoint_path().exists());
        assert!(TableStore::new(dir.path()).merged_files().unwrap().is_empty());
    }

    #[tokio::test]
    async fn fatal_fetch_fails_with_checkpoint_saved() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path());
        let mut fetcher = ScriptedFetcher::new().ok(LIST, list_page()).fatal(THREAD);

        let outcome = crawl_until(&settings, &mut fetcher, std::future::pending())
            .await
            .unwrap();

        assert_eq!(outcome, CrawlOutcome::Failed);
        let state = CheckpointStore::new(settings.checkpoint_path()).load();
        assert_eq!(state.complete_thread_list().map(|t| t.len()), Some(1));
        assert!(!state.is_processed("300"));
        assert!(TableStore::new(dir.path()).merged_files().unwrap().is_empty());
    }

    #[test]
    fn durations_are_human_readable() {
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.5s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
        assert_eq!(format_duration(Duration::from_secs(3725)), "1h 2m 5s");
    }
}
