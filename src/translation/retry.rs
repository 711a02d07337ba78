/*!
 * Retry policy and per-unit retry state machine.
 *
 * The machine only decides; it never sleeps. The async driver in
 * `translation::client` performs the sends and the waits it asks for, so the
 * transitions can be tested without a runtime.
 *
 * ```text
 * Pending -> Sent -> Success
 *              |---> RetryableFailure -> Sent -> ...
 *              '---> FatalFailure
 * ```
 */

use rand::Rng;
use std::time::Duration;

use crate::app_config::TranslationCommonConfig;
use crate::errors::ProviderError;
use crate::segmentation::FallbackReason;

/// Backoff and attempt limits for one unit
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total sends allowed, at least 1
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub backoff_cap: Duration,
    /// Upper bound of the uniform random delay added to each backoff
    pub jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&TranslationCommonConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(common: &TranslationCommonConfig) -> Self {
        Self {
            max_attempts: common.max_attempts.max(1),
            base_delay: Duration::from_millis(common.base_delay_ms),
            backoff_cap: Duration::from_millis(common.backoff_cap_ms),
            jitter: Duration::from_millis(common.jitter_ms),
        }
    }

    /// `min(base * 2^n, cap)` without jitter, `n` counting earlier failures
    pub fn backoff(&self, n: u32) -> Duration {
        let factor = 1u32.checked_shl(n).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.backoff_cap)
            .min(self.backoff_cap)
    }

    /// Wait before the next send after the given failure
    ///
    /// An explicit `Retry-After` hint replaces the computed backoff.
    pub fn delay_after(&self, n: u32, error: &ProviderError) -> Duration {
        if let Some(hint) = error.retry_after() {
            return hint;
        }
        self.backoff(n) + self.random_jitter()
    }

    fn random_jitter(&self) -> Duration {
        let max_ms = self.jitter.as_millis() as u64;
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::rng().random_range(0..=max_ms))
    }
}

/// Where a unit stands in its retry cycle
#[derive(Debug, Clone, PartialEq)]
pub enum RetryState {
    Pending,
    /// Request number `attempt` (1-based) is in flight
    Sent { attempt: u32 },
    Success { attempts: u32 },
    /// Waiting `delay` before the next send
    RetryableFailure { attempts: u32, delay: Duration },
    /// Given up; the unit keeps its original text
    FatalFailure { attempts: u32, reason: FallbackReason },
}

/// What the driver should do after a failed send
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FailureAction {
    Retry(Duration),
    GiveUp(FallbackReason),
}

/// Retry state machine for one unit
#[derive(Debug, Clone)]
pub struct RetryMachine {
    policy: RetryPolicy,
    state: RetryState,
    attempts: u32,
}

impl RetryMachine {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            state: RetryState::Pending,
            attempts: 0,
        }
    }

    pub fn state(&self) -> &RetryState {
        &self.state
    }

    /// Requests sent so far
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.state, RetryState::Success { .. } | RetryState::FatalFailure { .. })
    }

    /// Record a send and return its 1-based attempt number
    pub fn send(&mut self) -> u32 {
        debug_assert!(
            matches!(self.state, RetryState::Pending | RetryState::RetryableFailure { .. }),
            "send from {:?}",
            self.state
        );
        self.attempts += 1;
        self.state = RetryState::Sent { attempt: self.attempts };
        self.attempts
    }

    pub fn on_success(&mut self) {
        self.state = RetryState::Success { attempts: self.attempts };
    }

    /// Classify a failed send
    pub fn on_failure(&mut self, error: &ProviderError) -> FailureAction {
        let action = if !error.is_retryable() {
            FailureAction::GiveUp(FallbackReason::FatalFailure)
        } else if self.attempts >= self.policy.max_attempts {
            FailureAction::GiveUp(FallbackReason::RetriesExhausted)
        } else {
            FailureAction::Retry(self.policy.delay_after(self.attempts.saturating_sub(1), error))
        };

        self.state = match action {
            FailureAction::Retry(delay) => RetryState::RetryableFailure {
                attempts: self.attempts,
                delay,
            },
            FailureAction::GiveUp(reason) => RetryState::FatalFailure {
                attempts: self.attempts,
                reason,
            },
        };
        action
    }

    /// Abandon the unit without another send
    pub fn cancel(&mut self) {
        self.state = RetryState::FatalFailure {
            attempts: self.attempts,
            reason: FallbackReason::Cancelled,
        };
    }
}
