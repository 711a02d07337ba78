/*!
 * Provider implementations for different translation services.
 *
 * This module contains client implementations for the supported LLM providers:
 * - OpenAI: any OpenAI-compatible chat completions API (x.ai, OpenAI, LM Studio)
 * - Anthropic: Anthropic messages API
 * - Mock: scripted provider used by the test suite
 */

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt::Debug;

use crate::errors::ProviderError;

/// Common trait for all LLM providers
///
/// This trait defines the interface that all provider implementations must follow,
/// allowing them to be used interchangeably in the translation service.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// The request type for this provider
    type Request: Send + Sync;

    /// The response type for this provider
    type Response: Send + Sync;

    /// Complete a request using this provider
    async fn complete(&self, request: Self::Request) -> Result<Self::Response, ProviderError>;

    /// Test the connection to the provider
    async fn test_connection(&self) -> Result<(), ProviderError>;

    /// Extract text from the provider response
    fn extract_text(response: &Self::Response) -> String;
}

/// Opaque text-in/text-out translation capability
///
/// This is the seam the translation client drives. Prompting and model
/// selection are the implementor's business.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate one block of text
    async fn translate(&self, text: &str) -> Result<String, ProviderError>;

    /// Short name used in logs
    fn name(&self) -> &str;
}

/// Classify a transport error from reqwest
pub(crate) fn error_from_reqwest(error: reqwest::Error) -> ProviderError {
    if error.is_timeout() {
        ProviderError::Timeout(error.to_string())
    } else if error.is_connect() {
        ProviderError::ConnectionError(error.to_string())
    } else if error.is_decode() {
        ProviderError::ParseError(error.to_string())
    } else {
        ProviderError::RequestFailed(error.to_string())
    }
}

/// Seconds to wait from a `Retry-After` value
///
/// Both forms are accepted: delay seconds and an HTTP date, which counts from
/// `now` and never goes below zero.
pub(crate) fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<u64> {
    let value = value.trim();
    if let Ok(seconds) = value.parse::<u64>() {
        return Some(seconds);
    }
    let date = DateTime::parse_from_rfc2822(value).ok()?;
    Some((date.with_timezone(&Utc) - now).num_seconds().max(0) as u64)
}

/// Turn a non-success HTTP response into a provider error
///
/// A `Retry-After` header is kept as a wait hint.
pub(crate) async fn error_from_response(response: reqwest::Response) -> ProviderError {
    let status = response.status().as_u16();
    let retry_after_secs = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| parse_retry_after(value, Utc::now()));
    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to get error response text".to_string());

    ProviderError::from_status(status, message, retry_after_secs)
}

pub mod anthropic;
pub mod mock;
pub mod openai;
