/*!
 * Mock provider implementations for testing.
 *
 * This module provides a mock provider that simulates different provider behaviors:
 * - `MockProvider::working()` - Always succeeds with translated text
 * - `MockProvider::intermittent(n)` - Fails with a server error every nth request
 * - `MockProvider::always_retryable()` - Always fails with a transient error
 * - `MockProvider::fatal()` - Always fails with an authentication error
 * - `MockProvider::scripted(...)` - Replays a fixed list of outcomes
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::errors::ProviderError;
use crate::providers::{Provider, Translator};

/// Mock request for testing
#[derive(Debug, Clone)]
pub struct MockRequest {
    /// The text to translate
    pub text: String,
    /// Source language
    pub source_language: String,
    /// Target language
    pub target_language: String,
}

/// Mock response for testing
#[derive(Debug, Clone)]
pub struct MockResponse {
    /// The translated text
    pub text: String,
}

/// Behavior mode for the mock provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds with a proper translation
    Working,
    /// Fails with a 503 every Nth request
    Intermittent { fail_every: usize },
    /// Always fails with a 503
    AlwaysRetryable,
    /// Always fails with an authentication error
    Fatal,
    /// Always answers 429 with the given wait hint
    RateLimited { retry_after_secs: Option<u64> },
    /// Returns empty response
    Empty,
    /// Simulates slow response (for timeout and concurrency testing)
    Slow { delay_ms: u64 },
    /// Replays the scripted outcomes, then behaves like `Working`
    Scripted,
}

/// Mock provider for testing translation behavior
#[derive(Debug)]
pub struct MockProvider {
    /// Behavior mode
    behavior: MockBehavior,
    /// Requests received so far, shared between clones
    request_count: Arc<AtomicUsize>,
    /// Custom response generator (optional)
    custom_response: Option<fn(&MockRequest) -> String>,
    /// Outcomes replayed by `MockBehavior::Scripted`, shared between clones
    script: Arc<Mutex<VecDeque<Result<String, ProviderError>>>>,
    source_language: String,
    target_language: String,
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            custom_response: None,
            script: Arc::new(Mutex::new(VecDeque::new())),
            source_language: "en".to_string(),
            target_language: "es".to_string(),
        }
    }

    /// Create a working mock provider that always succeeds
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Create an intermittently failing mock provider
    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent { fail_every })
    }

    /// Create a mock provider whose every request fails with a transient error
    pub fn always_retryable() -> Self {
        Self::new(MockBehavior::AlwaysRetryable)
    }

    /// Create a mock provider whose every request fails for good
    pub fn fatal() -> Self {
        Self::new(MockBehavior::Fatal)
    }

    /// Create a mock provider that is always throttled
    pub fn rate_limited(retry_after_secs: Option<u64>) -> Self {
        Self::new(MockBehavior::RateLimited { retry_after_secs })
    }

    /// Create a mock that returns empty responses
    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    /// Create a mock that answers after a delay
    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    /// Create a mock that replays the given outcomes in order
    pub fn scripted(outcomes: Vec<Result<String, ProviderError>>) -> Self {
        let provider = Self::new(MockBehavior::Scripted);
        provider.script.lock().extend(outcomes);
        provider
    }

    /// Set a custom response generator
    pub fn with_custom_response(mut self, generator: fn(&MockRequest) -> String) -> Self {
        self.custom_response = Some(generator);
        self
    }

    /// Set the languages reported in requests
    pub fn with_languages(mut self, source_language: &str, target_language: &str) -> Self {
        self.source_language = source_language.to_string();
        self.target_language = target_language.to_string();
        self
    }

    /// Number of requests received by this provider and its clones
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    fn working_text(&self, request: &MockRequest) -> String {
        match self.custom_response {
            Some(generator) => generator(request),
            None => format!("[TRANSLATED to {}] {}", request.target_language, request.text),
        }
    }
}

impl Clone for MockProvider {
    fn clone(&self) -> Self {
        Self {
            behavior: self.behavior,
            request_count: Arc::clone(&self.request_count),
            custom_response: self.custom_response,
            script: Arc::clone(&self.script),
            source_language: self.source_language.clone(),
            target_language: self.target_language.clone(),
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    type Request = MockRequest;
    type Response = MockResponse;

    async fn complete(&self, request: Self::Request) -> Result<Self::Response, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);

        let text = match self.behavior {
            MockBehavior::Working => self.working_text(&request),

            MockBehavior::Intermittent { fail_every } => {
                if fail_every > 0 && count % fail_every == fail_every - 1 {
                    return Err(ProviderError::ApiError {
                        message: format!("Simulated intermittent failure (request #{})", count + 1),
                        status_code: 503,
                    });
                }
                self.working_text(&request)
            }

            MockBehavior::AlwaysRetryable => {
                return Err(ProviderError::ApiError {
                    message: "Simulated overloaded server".to_string(),
                    status_code: 503,
                });
            }

            MockBehavior::Fatal => {
                return Err(ProviderError::AuthenticationError("Simulated invalid API key".to_string()));
            }

            MockBehavior::RateLimited { retry_after_secs } => {
                return Err(ProviderError::RateLimitExceeded {
                    message: "Simulated rate limit".to_string(),
                    retry_after_secs,
                });
            }

            MockBehavior::Empty => String::new(),

            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(tokio::time::Duration::from_millis(delay_ms)).await;
                self.working_text(&request)
            }

            MockBehavior::Scripted => {
                let next = self.script.lock().pop_front();
                match next {
                    Some(outcome) => outcome?,
                    None => self.working_text(&request),
                }
            }
        };

        Ok(MockResponse { text })
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        match self.behavior {
            MockBehavior::Fatal => Err(ProviderError::AuthenticationError(
                "Simulated invalid API key".to_string(),
            )),
            _ => Ok(()),
        }
    }

    fn extract_text(response: &Self::Response) -> String {
        response.text.clone()
    }
}

#[async_trait]
impl Translator for MockProvider {
    async fn translate(&self, text: &str) -> Result<String, ProviderError> {
        let request = MockRequest {
            text: text.to_string(),
            source_language: self.source_language.clone(),
            target_language: self.target_language.clone(),
        };
        let response = self.complete(request).await?;
        Ok(Self::extract_text(&response))
    }

    fn name(&self) -> &str {
        "mock"
    }
}
