/*!
 * Translation of subtitle units using AI providers.
 *
 * This module contains the resilient translation path and the pipeline that
 * ties segmentation, translation and realignment together:
 *
 * - `core`: provider-backed translation service and prompt rendering
 * - `retry`: retry policy and per-unit retry state machine
 * - `limiter`: shared concurrency and rate limiting for provider calls
 * - `client`: translation of one unit with retries and fallback
 * - `pipeline`: concurrent run over a whole subtitle file
 * - `assembler`: restores source order and checks coverage
 */

// Re-export main types for easier usage
pub use self::assembler::assemble;
pub use self::client::{CancellationToken, TranslationClient};
pub use self::core::TranslationService;
pub use self::limiter::{LimiterStats, RequestLimiter};
pub use self::pipeline::{LogEntry, PipelineOutput, RunSummary, TranslationPipeline};
pub use self::retry::{FailureAction, RetryMachine, RetryPolicy, RetryState};

// Submodules
pub mod assembler;
pub mod client;
pub mod core;
pub mod limiter;
pub mod pipeline;
pub mod retry;
