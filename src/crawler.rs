use std::time::Duration;

use indicatif::ProgressBar;
use tracing::{error, info, warn};

use crate::checkpoint::{CheckpointState, CheckpointStore};
use crate::db::TableStore;
use crate::error::CrawlError;
use crate::models::{RawComment, Thread};
use crate::parser::PageParser;
use crate::settings::Settings;
use crate::transport::{CircuitBreaker, Fetch};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CrawlStats {
    pub crawled: usize,
    pub skipped: usize,
    pub comments: usize,
    pub failed_writes: usize,
}

/// Crawls every unprocessed thread, committing one partition per thread.
pub struct ThreadCrawler<'a, F, P> {
    fetcher: &'a mut F,
    parser: &'a P,
    tables: &'a TableStore,
    checkpoint: &'a CheckpointStore,
    base_url: String,
    max_consecutive_errors: u32,
    cooldown: Duration,
    progress: ProgressBar,
}

impl<'a, F: Fetch, P: PageParser> ThreadCrawler<'a, F, P> {
    pub fn new(
        fetcher: &'a mut F,
        parser: &'a P,
        tables: &'a TableStore,
        checkpoint: &'a CheckpointStore,
        settings: &Settings,
    ) -> Self {
        ThreadCrawler {
            fetcher,
            parser,
            tables,
            checkpoint,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            max_consecutive_errors: settings.max_consecutive_errors,
            cooldown: settings.error_cooldown(),
            progress: ProgressBar::hidden(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    fn page_url(&self, thread_id: &str, page: u32) -> String {
        format!("{}/item?id={}&p={}", self.base_url, thread_id, page)
    }

    /// On any error the checkpoint is saved before returning.
    pub async fn crawl(
        &mut self,
        threads: &[Thread],
        state: &mut CheckpointState,
    ) -> Result<CrawlStats, CrawlError> {
        let pending: Vec<&Thread> = threads.iter().filter(|t| !state.is_processed(&t.id)).collect();
        let mut stats = CrawlStats {
            skipped: threads.len() - pending.len(),
            ..CrawlStats::default()
        };
        if stats.skipped > 0 {
            info!("Skipping {} already processed threads", stats.skipped);
        }
        self.progress.set_length(pending.len() as u64);

        for thread in pending {
            info!("Processing thread: {} ({})", thread.title, thread.thread_date);
            self.progress.set_message(thread.thread_date.format("%b %Y").to_string());

            let comments = match self.crawl_thread(thread).await {
                Ok(comments) => comments,
                Err(e) => {
                    error!("Stopping at thread {}: {}", thread.id, e);
                    self.checkpoint.save(state);
                    self.progress.abandon();
                    return Err(e);
                }
            };

            // Data first, then the checkpoint. A crash in between only costs a re-crawl.
            match self.tables.save_partition(&comments, &thread.id) {
                Ok(()) => {
                    stats.crawled += 1;
                    stats.comments += comments.len();
                    state.processed_thread_ids.insert(thread.id.clone());
                    self.checkpoint.save(state);
                }
                Err(e) => {
                    error!("Failed to store thread {}: {:#}; will retry next run", thread.id, e);
                    stats.failed_writes += 1;
                }
            }
            self.progress.inc(1);
        }

        self.progress.finish_and_clear();
        Ok(stats)
    }

    /// All top-level comments of one thread, following pagination from page 1.
    async fn crawl_thread(&mut self, thread: &Thread) -> Result<Vec<RawComment>, CrawlError> {
        let mut breaker = CircuitBreaker::new(self.max_consecutive_errors);
        let mut comments = Vec::new();
        let mut page = 1;

        loop {
            let url = self.page_url(&thread.id, page);
            let html = match self.fetcher.fetch(&url).await {
                Ok(html) => {
                    breaker.record_success();
                    html
                }
                Err(e) if e.is_transient() => {
                    let tripped = breaker.record_failure();
                    error!(
                        "Network error fetching thread {} page {} ({}/{})",
                        thread.id,
                        page,
                        breaker.failures(),
                        breaker.threshold()
                    );
                    if tripped {
                        return Err(CrawlError::CircuitBreakerTripped {
                            stage: format!("thread {}", thread.id),
                            failures: breaker.failures(),
                        });
                    }
                    tokio::time::sleep(self.cooldown).await;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            if html.trim().is_empty() {
                break;
            }
            let parsed = match self.parser.parse_comments(&html, thread.thread_date) {
                Ok(parsed) => parsed,
                Err(e) => {
                    warn!("Thread {} page {}: {}; treating as last page", thread.id, page, e);
                    break;
                }
            };

            comments.extend(parsed.comments);
            if !parsed.has_more {
                break;
            }
            page += 1;
        }

        Ok(comments)
    }
}

// ── Tests ──
