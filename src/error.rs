use thiserror::Error;

/// Outcome of a single fetch that did not produce a body.
///
/// `Transient` covers timeouts, connection resets, 403, 429 and 5xx once the
/// retry budget is spent. `Fatal` is anything that would fail the same way
/// again (bad URL, other 4xx).
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transient failure fetching {url}: {reason}")]
    Transient { url: String, reason: String },

    #[error("fatal failure fetching {url}: {reason}")]
    Fatal { url: String, reason: String },
}

impl FetchError {
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::Transient { .. })
    }
}

/// A page came back but did not have the markup we expect.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("expected markup not found: {0}")]
    MissingStructure(&'static str),
}

/// Conditions that stop a crawl run.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("{stage}: {failures} consecutive fetch failures, giving up")]
    CircuitBreakerTripped { stage: String, failures: u32 },

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("http client setup failed: {0}")]
    Client(#[from] reqwest::Error),
}
