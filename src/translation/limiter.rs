/*!
 * Shared request limiter.
 *
 * One limiter is created per run and handed to the translation client. It bounds
 * the number of in-flight provider calls, spaces request starts to respect the
 * provider's rate limit, and counts attempts and retries for the run summary.
 */

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Semaphore, SemaphorePermit};
use tokio::time::Instant;

use crate::app_config::TranslationConfig;
use crate::errors::ProviderError;

/// Counters collected by the limiter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LimiterStats {
    /// Requests sent
    pub attempts: u64,
    /// Requests that were repeats of a failed one
    pub retries: u64,
}

/// Concurrency bound plus minimum spacing between request starts
#[derive(Debug)]
pub struct RequestLimiter {
    semaphore: Semaphore,
    min_interval: Duration,
    next_start: Mutex<Option<Instant>>,
    attempts: AtomicU64,
    retries: AtomicU64,
}

impl RequestLimiter {
    pub fn new(max_concurrent_requests: usize, min_interval: Duration) -> Self {
        Self {
            semaphore: Semaphore::new(max_concurrent_requests.max(1)),
            min_interval,
            next_start: Mutex::new(None),
            attempts: AtomicU64::new(0),
            retries: AtomicU64::new(0),
        }
    }

    /// Build a limiter for the active provider
    ///
    /// The spacing is the larger of the configured inter-request delay and the
    /// interval implied by the provider's requests-per-minute limit.
    pub fn from_config(config: &TranslationConfig) -> Self {
        let delay = Duration::from_millis(config.common.rate_limit_delay_ms);
        let rpm_interval = config
            .get_rate_limit()
            .filter(|rpm| *rpm > 0)
            .map_or(Duration::ZERO, |rpm| Duration::from_millis(60_000 / u64::from(rpm)));

        Self::new(config.optimal_concurrent_requests(), delay.max(rpm_interval))
    }

    /// Wait for a free slot and for the spacing window
    ///
    /// The returned permit must be held for the duration of the request.
    pub async fn acquire(&self) -> Result<SemaphorePermit<'_>, ProviderError> {
        let permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| ProviderError::RequestFailed(format!("Request limiter closed: {}", e)))?;

        if !self.min_interval.is_zero() {
            let wait = {
                let mut next_start = self.next_start.lock();
                let now = Instant::now();
                let start = next_start.map_or(now, |next| next.max(now));
                *next_start = Some(start + self.min_interval);
                start - now
            };
            if !wait.is_zero() {
                tokio::time::sleep(wait).await;
            }
        }

        self.attempts.fetch_add(1, Ordering::Relaxed);
        Ok(permit)
    }

    pub fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stats(&self) -> LimiterStats {
        LimiterStats {
            attempts: self.attempts.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
        }
    }

    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }
}
