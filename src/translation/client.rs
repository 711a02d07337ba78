/*!
 * Resilient translation of one unit.
 *
 * `TranslationClient::translate_unit` never fails: transient errors are retried
 * with exponential backoff, and a unit that cannot be translated keeps its
 * original text.
 */

use log::{debug, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

use super::limiter::RequestLimiter;
use super::retry::{FailureAction, RetryMachine, RetryPolicy};
use crate::errors::ProviderError;
use crate::providers::Translator;
use crate::segmentation::{FallbackReason, TranslatedUnit, TranslationUnit};

#[derive(Debug, Default)]
struct CancellationState {
    cancelled: AtomicBool,
    notify: Notify,
}

/// Cooperative stop signal shared by every task of a run
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<CancellationState>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.cancelled.store(true, Ordering::SeqCst);
        self.0.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once the token is cancelled
    pub async fn cancelled(&self) {
        loop {
            let notified = self.0.notify.notified();
            tokio::pin!(notified);
            // registered before the check so a concurrent cancel is not missed
            notified.as_mut().enable();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// Drives a translator through the retry policy
#[derive(Clone)]
pub struct TranslationClient {
    translator: Arc<dyn Translator>,
    policy: RetryPolicy,
    limiter: Arc<RequestLimiter>,
    cancellation: CancellationToken,
}

impl TranslationClient {
    pub fn new(translator: Arc<dyn Translator>, policy: RetryPolicy, limiter: Arc<RequestLimiter>) -> Self {
        Self {
            translator,
            policy,
            limiter,
            cancellation: CancellationToken::new(),
        }
    }

    /// Stop retrying once the token is cancelled
    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub fn limiter(&self) -> &RequestLimiter {
        &self.limiter
    }

    /// Translate a unit, falling back to its original text on failure
    pub async fn translate_unit(&self, unit: &TranslationUnit) -> TranslatedUnit {
        let mut machine = RetryMachine::new(self.policy.clone());

        loop {
            let attempt = machine.send();
            let result = self.send_once(&unit.combined_text).await;

            let error = match result {
                Ok(text) => {
                    machine.on_success();
                    debug!("Translated {} in {} attempt(s)", unit, attempt);
                    return TranslatedUnit::translated(unit.clone(), text, attempt);
                }
                Err(error) => error,
            };

            match machine.on_failure(&error) {
                FailureAction::Retry(delay) => {
                    debug!(
                        "Attempt {}/{} for {} failed ({}), retrying in {:?}",
                        attempt, self.policy.max_attempts, unit, error, delay
                    );
                    if !self.cancellation.is_cancelled() {
                        tokio::select! {
                            _ = tokio::time::sleep(delay) => {}
                            _ = self.cancellation.cancelled() => {}
                        }
                    }
                    if self.cancellation.is_cancelled() {
                        machine.cancel();
                        warn!("Run cancelled, keeping original text for {}", unit);
                        return TranslatedUnit::fallback(unit.clone(), FallbackReason::Cancelled, attempt);
                    }
                    self.limiter.record_retry();
                }
                FailureAction::GiveUp(reason) => {
                    warn!(
                        "Keeping original text for {} after {} attempt(s): {} ({})",
                        unit, attempt, reason, error
                    );
                    return TranslatedUnit::fallback(unit.clone(), reason, attempt);
                }
            }
        }
    }

    /// One request through the limiter; an empty answer counts as a failure
    async fn send_once(&self, text: &str) -> Result<String, ProviderError> {
        let _permit = self.limiter.acquire().await?;
        let translated = self.translator.translate(text).await?;
        let trimmed = translated.trim();
        if trimmed.is_empty() {
            return Err(ProviderError::EmptyResponse);
        }
        Ok(trimmed.to_string())
    }
}
