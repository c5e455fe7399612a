use std::ops::RangeInclusive;
use std::time::{Duration, Instant};

use reqwest::{Client, StatusCode, Url};
use tracing::{debug, info, warn};

use crate::error::FetchError;
use crate::settings::Settings;

/// Anything that can turn a URL into a page body.
///
/// The crawl stages are generic over this so tests can script responses.
pub trait Fetch {
    async fn fetch(&mut self, url: &str) -> Result<String, FetchError>;
}

/// Spaces requests by `base_delay + jitter` measured from the previous fetch.
pub struct RateLimiter {
    base_delay: Duration,
    jitter_ms: RangeInclusive<u64>,
    last_request: Option<Instant>,
}

impl RateLimiter {
    pub fn new(base_delay: Duration, jitter_ms: RangeInclusive<u64>) -> Self {
        RateLimiter {
            base_delay,
            jitter_ms,
            last_request: None,
        }
    }

    pub async fn wait(&mut self) {
        let target = self.base_delay + Duration::from_millis(fastrand::u64(self.jitter_ms.clone()));
        if let Some(last) = self.last_request {
            let remaining = remaining_delay(target, last.elapsed());
            if !remaining.is_zero() {
                debug!("Rate limit: sleeping {:.2}s", remaining.as_secs_f64());
                tokio::time::sleep(remaining).await;
            }
        }
        self.last_request = Some(Instant::now());
    }
}

fn remaining_delay(target: Duration, elapsed: Duration) -> Duration {
    target.saturating_sub(elapsed)
}

/// Exponential backoff between attempts of one fetch.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_backoff: Duration,
}

impl RetryPolicy {
    /// Delay after the given failed attempt (1-based): base, 2×base, 4×base, ...
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_backoff.saturating_mul(factor)
    }
}

/// Counts consecutive failures across pages; trips once the threshold is hit.
#[derive(Debug)]
pub struct CircuitBreaker {
    threshold: u32,
    consecutive: u32,
}

impl CircuitBreaker {
    pub fn new(threshold: u32) -> Self {
        CircuitBreaker {
            threshold: threshold.max(1),
            consecutive: 0,
        }
    }

    pub fn record_success(&mut self) {
        self.consecutive = 0;
    }

    /// Returns true when this failure trips the breaker.
    pub fn record_failure(&mut self) -> bool {
        self.consecutive += 1;
        self.consecutive >= self.threshold
    }

    pub fn failures(&self) -> u32 {
        self.consecutive
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }
}

fn is_transient_status(status: StatusCode) -> bool {
    status == StatusCode::FORBIDDEN
        || status == StatusCode::TOO_MANY_REQUESTS
        || status.is_server_error()
}

fn classify_error(url: &str, e: &reqwest::Error) -> FetchError {
    if e.is_builder() {
        FetchError::Fatal {
            url: url.to_string(),
            reason: e.to_string(),
        }
    } else {
        FetchError::Transient {
            url: url.to_string(),
            reason: e.to_string(),
        }
    }
}

/// Rate-limited, retrying HTTP client used for every outbound request.
pub struct HttpTransport {
    client: Client,
    limiter: RateLimiter,
    retry: RetryPolicy,
}

impl HttpTransport {
    pub fn new(settings: &Settings) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(settings.request_timeout())
            .user_agent(settings.user_agent.as_str())
            .build()?;

        Ok(HttpTransport {
            client,
            limiter: RateLimiter::new(
                Duration::from_millis(settings.rate_limit_delay_ms),
                settings.jitter_min_ms..=settings.jitter_max_ms,
            ),
            retry: RetryPolicy {
                max_attempts: settings.max_retries.max(1),
                base_backoff: Duration::from_millis(settings.backoff_base_ms),
            },
        })
    }

    async fn attempt(&self, url: &Url) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| classify_error(url.as_str(), &e))?;

        let status = response.status();
        if status.is_success() {
            return response
                .text()
                .await
                .map_err(|e| classify_error(url.as_str(), &e));
        }

        let reason = format!("HTTP {}", status);
        if is_transient_status(status) {
            Err(FetchError::Transient {
                url: url.to_string(),
                reason,
            })
        } else {
            Err(FetchError::Fatal {
                url: url.to_string(),
                reason,
            })
        }
    }
}

impl Fetch for HttpTransport {
    async fn fetch(&mut self, url: &str) -> Result<String, FetchError> {
        let parsed = Url::parse(url).map_err(|e| FetchError::Fatal {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        self.limiter.wait().await;
        info!("Fetching {}", url);

        let mut attempt = 1;
        loop {
            match self.attempt(&parsed).await {
                Ok(body) => return Ok(body),
                Err(e) if e.is_transient() && attempt < self.retry.max_attempts => {
                    let backoff = self.retry.backoff(attempt);
                    warn!(
                        "{} (attempt {}/{}), backing off {:.1}s",
                        e,
                        attempt,
                        self.retry.max_attempts,
                        backoff.as_secs_f64()
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => {
                    warn!("Giving up on {} after {} attempt(s): {}", url, attempt, e);
                    return Err(e);
                }
            }
        }
    }
}

// ── Tests ──
