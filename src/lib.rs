/*!
 * # subweave - sentence-aware subtitle translation
 *
 * A Rust library that translates SRT subtitles one sentence at a time while
 * keeping every cue's timing intact.
 *
 * ## Features
 *
 * - Merge cues that belong to the same sentence into translation units,
 *   driven by a linguistic analyzer (built-in heuristics or an external model)
 * - Translate units concurrently through x.ai, OpenAI, Anthropic or LM Studio
 * - Retry transient provider failures with capped exponential backoff and jitter
 * - Split each translation back over its cues at clause, word or character
 *   boundaries, proportionally to the source text
 * - Keep the original text of any unit that cannot be translated
 * - ISO 639-1 and ISO 639-2 language code support
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `subtitle_processor`: SRT parsing and writing
 * - `analysis`: Tokenization, part-of-speech and dependency annotations
 * - `segmentation`: Cue combination and realignment:
 *   - `segmentation::combiner`: Groups cues into translation units
 *   - `segmentation::splitter`: Distributes a translation over the unit's cues
 * - `translation`: Resilient translation of units:
 *   - `translation::core`: Provider-backed translation service
 *   - `translation::client`: Retries, fallback and cancellation for one unit
 *   - `translation::pipeline`: Concurrent run over a whole file
 * - `file_utils`: File system operations
 * - `app_controller`: Main application controller
 * - `language_utils`: ISO language code utilities
 * - `providers`: Client implementations for the supported APIs
 * - `errors`: Custom error types for the application
 */

// Global lints configuration
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod analysis;
pub mod app_config;
pub mod app_controller;
pub mod errors;
pub mod file_utils;
pub mod language_utils;
pub mod providers;
pub mod segmentation;
pub mod subtitle_processor;
pub mod translation;

// Re-export main types for easier usage
pub use analysis::{Analyzer, HeuristicAnalyzer, LinguisticAnalyzer};
pub use app_config::Config;
pub use app_controller::{Controller, FileOutcome};
pub use errors::{AppError, ProviderError, RealignError, SubtitleError, TranslationError};
pub use language_utils::{get_language_name, language_codes_match, normalize_to_part2t};
pub use segmentation::{CueCombiner, RealignmentSplitter, TranslatedUnit, TranslationUnit};
pub use subtitle_processor::{SubtitleCollection, SubtitleEntry};
pub use translation::{CancellationToken, TranslationClient, TranslationPipeline, TranslationService};
