/*!
 * Error types for the subweave application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 */

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when working with provider APIs
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The request did not complete in time
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {message}")]
    RateLimitExceeded {
        /// Error message from the API
        message: String,
        /// Wait hint from the `Retry-After` header, in seconds
        retry_after_secs: Option<u64>,
    },

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// The provider refused to translate the content
    #[error("Content rejected: {0}")]
    ContentRejected(String),

    /// The provider answered with no text
    #[error("Provider returned an empty response")]
    EmptyResponse,
}

impl ProviderError {
    /// Classify an HTTP error status into a provider error
    pub fn from_status(status_code: u16, message: String, retry_after_secs: Option<u64>) -> Self {
        match status_code {
            429 => Self::RateLimitExceeded { message, retry_after_secs },
            401 | 403 => Self::AuthenticationError(message),
            408 => Self::Timeout(message),
            _ => Self::ApiError { status_code, message },
        }
    }

    /// Whether another attempt may succeed
    ///
    /// Timeouts, connection problems, server errors, throttling and garbled or
    /// empty answers are transient. Malformed requests, authentication problems
    /// and rejected content are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RequestFailed(_)
            | Self::ParseError(_)
            | Self::ConnectionError(_)
            | Self::Timeout(_)
            | Self::RateLimitExceeded { .. }
            | Self::EmptyResponse => true,
            Self::ApiError { status_code, .. } => *status_code >= 500,
            Self::AuthenticationError(_) | Self::ContentRejected(_) => false,
        }
    }

    /// Explicit wait hint carried by a rate limit response
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimitExceeded { retry_after_secs: Some(secs), .. } => {
                Some(Duration::from_secs(*secs))
            }
            _ => None,
        }
    }
}

/// Errors that can occur during subtitle processing
#[derive(Error, Debug)]
pub enum SubtitleError {
    /// A cue whose end does not come after its start
    #[error("Invalid time range for entry {seq_num}: end time {end_ms} <= start time {start_ms}")]
    InvalidTimeRange {
        /// Sequence number of the rejected entry
        seq_num: usize,
        /// Start time in milliseconds
        start_ms: u64,
        /// End time in milliseconds
        end_ms: u64,
    },

    /// A cue without any text
    #[error("Empty subtitle text for entry {0}")]
    EmptyText(usize),

    /// A timestamp that does not follow HH:MM:SS,mmm
    #[error("Invalid timestamp format: {0}")]
    InvalidTimestamp(String),

    /// Nothing usable in the input
    #[error("No valid subtitle entries were found in the SRT content")]
    NoEntries,
}

/// Errors raised by a linguistic analyzer
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// The analyzer command could not be run
    #[error("Analyzer command failed: {0}")]
    CommandFailed(String),

    /// The analyzer produced output we could not understand
    #[error("Invalid analyzer output: {0}")]
    InvalidOutput(String),

    /// The analyzer failed earlier in the run and is not tried again
    #[error("Analyzer unavailable: {0}")]
    Unavailable(String),
}

/// Errors raised while mapping translated text back onto cues
#[derive(Error, Debug, PartialEq)]
pub enum RealignError {
    /// The split pieces do not reproduce the translated text
    #[error("Split of unit starting at cue {first_seq_num} does not reproduce the translated text")]
    PartitionMismatch {
        /// First cue index of the unit
        first_seq_num: usize,
    },

    /// The translated text has fewer usable cut points than needed
    #[error("Unit starting at cue {first_seq_num} needs {cues} pieces but the translation offers only {available} cut points")]
    InsufficientText {
        /// First cue index of the unit
        first_seq_num: usize,
        /// Number of cues to fill
        cues: usize,
        /// Number of candidate cut points found
        available: usize,
    },
}

/// Errors raised when re-emitting the final cue sequence
#[derive(Error, Debug, PartialEq)]
pub enum AssemblyError {
    /// A source cue has no output cue
    #[error("Cue {0} is missing from the output")]
    MissingCue(usize),

    /// A source cue was emitted twice
    #[error("Cue {0} appears more than once in the output")]
    DuplicateCue(usize),

    /// An output cue does not belong to the source
    #[error("Cue {0} is not part of the source subtitles")]
    UnknownCue(usize),

    /// An output cue changed its timing
    #[error("Cue {0} changed its timing")]
    TimingMismatch(usize),
}

/// Errors that can occur during translation
#[derive(Error, Debug)]
pub enum TranslationError {
    /// Error from the provider API
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error with subtitle processing
    #[error("Subtitle error: {0}")]
    Subtitle(#[from] SubtitleError),

    /// Error while splitting a translated unit
    #[error("Realignment error: {0}")]
    Realign(#[from] RealignError),

    /// Error while assembling the final cues
    #[error("Assembly error: {0}")]
    Assembly(#[from] AssemblyError),
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from subtitle processing
    #[error("Subtitle error: {0}")]
    Subtitle(#[from] SubtitleError),

    /// Error from translation
    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
