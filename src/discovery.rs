use std::collections::HashSet;
use std::time::Duration;

use chrono::NaiveDate;
use tracing::{error, info, warn};

use crate::checkpoint::{CheckpointState, CheckpointStore};
use crate::error::CrawlError;
use crate::models::Thread;
use crate::parser::PageParser;
use crate::settings::Settings;
use crate::transport::{CircuitBreaker, Fetch};

/// Walks the submissions list page by page until it runs out.
///
/// Progress is written to the checkpoint after every page, so a run stopped
/// by the circuit breaker picks up at the first page it had not seen.
pub struct ThreadDiscoverer<'a, F, P> {
    fetcher: &'a mut F,
    parser: &'a P,
    checkpoint: &'a CheckpointStore,
    base_url: String,
    submissions_url: String,
    max_pages: usize,
    max_consecutive_errors: u32,
    cooldown: Duration,
}

impl<'a, F: Fetch, P: PageParser> ThreadDiscoverer<'a, F, P> {
    pub fn new(
        fetcher: &'a mut F,
        parser: &'a P,
        checkpoint: &'a CheckpointStore,
        settings: &Settings,
    ) -> Self {
        ThreadDiscoverer {
            fetcher,
            parser,
            checkpoint,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            submissions_url: settings.submissions_url.clone(),
            max_pages: settings.max_discovery_pages,
            max_consecutive_errors: settings.max_consecutive_errors,
            cooldown: settings.error_cooldown(),
        }
    }

    fn page_url(&self, cursor: Option<&str>) -> String {
        match cursor {
            Some(token) => format!("{}/{}", self.base_url, token.trim_start_matches('/')),
            None => self.submissions_url.clone(),
        }
    }

    pub async fn discover(&mut self, state: &mut CheckpointState) -> Result<Vec<Thread>, CrawlError> {
        if let Some(threads) = state.complete_thread_list() {
            info!("Loaded {} threads from cache", threads.len());
            return Ok(threads.to_vec());
        }

        let mut threads = state.cached_thread_list.clone().unwrap_or_default();
        let mut cursor = state.discovery_cursor.clone();
        if cursor.is_some() {
            info!("Resuming discovery with {} threads already found", threads.len());
        } else {
            info!("No thread cache found, fetching from Hacker News");
        }

        let mut seen: HashSet<String> = threads.iter().map(|t| t.id.clone()).collect();
        let mut breaker = CircuitBreaker::new(self.max_consecutive_errors);
        let mut page = 1;

        while page <= self.max_pages {
            let url = self.page_url(cursor.as_deref());
            info!("Fetching submissions page {}", page);

            let html = match self.fetcher.fetch(&url).await {
                Ok(html) => {
                    breaker.record_success();
                    html
                }
                Err(e) if e.is_transient() => {
                    let tripped = breaker.record_failure();
                    error!(
                        "Network error fetching submissions page {} ({}/{})",
                        page,
                        breaker.failures(),
                        breaker.threshold()
                    );
                    if tripped {
                        self.save_partial(state, &threads, cursor);
                        return Err(CrawlError::CircuitBreakerTripped {
                            stage: "discovery".to_string(),
                            failures: breaker.failures(),
                        });
                    }
                    tokio::time::sleep(self.cooldown).await;
                    continue;
                }
                Err(e) => {
                    self.save_partial(state, &threads, cursor);
                    return Err(e.into());
                }
            };

            if html.trim().is_empty() {
                break;
            }
            let parsed = match self.parser.parse_thread_list(&html) {
                Ok(parsed) => parsed,
                Err(e) => {
                    warn!("Submissions page {}: {}; treating as last page", page, e);
                    break;
                }
            };

            threads.extend(
                parsed
                    .threads
                    .into_iter()
                    .filter(|t| seen.insert(t.id.clone())),
            );
            cursor = parsed.next;
            if cursor.is_none() {
                break;
            }
            self.save_partial(state, &threads, cursor.clone());
            page += 1;
        }

        state.discovery_cursor = None;
        state.cached_thread_list = (!threads.is_empty()).then(|| threads.clone());
        self.checkpoint.save(state);

        info!("Found {} 'Who is hiring' threads", threads.len());
        Ok(threads)
    }

    /// Without a cursor nothing past the first page was seen, so there is
    /// nothing worth caching.
    fn save_partial(&self, state: &mut CheckpointState, threads: &[Thread], cursor: Option<String>) {
        if cursor.is_some() {
            state.cached_thread_list = Some(threads.to_vec());
            state.discovery_cursor = cursor;
        }
        self.checkpoint.save(state);
    }
}

/// Threads dated on or after `since`.
pub fn filter_since(threads: &[Thread], since: NaiveDate) -> Vec<Thread> {
    threads
        .iter()
        .filter(|t| t.thread_date >= since)
        .cloned()
        .collect()
}

// ── Tests ──
