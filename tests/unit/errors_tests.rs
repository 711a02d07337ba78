/*!
 * Tests for error classification and conversion
 */

use std::time::Duration;

use subweave::errors::{AppError, AssemblyError, ProviderError, RealignError, TranslationError};

#[test]
fn test_fromStatus_shouldClassifyHttpErrors() {
    assert!(matches!(
        ProviderError::from_status(429, "slow down".to_string(), Some(7)),
        ProviderError::RateLimitExceeded { retry_after_secs: Some(7), .. }
    ));
    assert!(matches!(
        ProviderError::from_status(401, "bad key".to_string(), None),
        ProviderError::AuthenticationError(_)
    ));
    assert!(matches!(
        ProviderError::from_status(408, "too slow".to_string(), None),
        ProviderError::Timeout(_)
    ));
    assert!(matches!(
        ProviderError::from_status(502, "bad gateway".to_string(), None),
        ProviderError::ApiError { status_code: 502, .. }
    ));
}

#[test]
fn test_isRetryable_shouldSeparateTransientFromFatal() {
    let transient = [
        ProviderError::Timeout("t".to_string()),
        ProviderError::ConnectionError("c".to_string()),
        ProviderError::ParseError("p".to_string()),
        ProviderError::EmptyResponse,
        ProviderError::ApiError { status_code: 503, message: "down".to_string() },
        ProviderError::RateLimitExceeded { message: "busy".to_string(), retry_after_secs: None },
    ];
    let fatal = [
        ProviderError::AuthenticationError("a".to_string()),
        ProviderError::ContentRejected("r".to_string()),
        ProviderError::ApiError { status_code: 400, message: "bad request".to_string() },
    ];

    assert!(transient.iter().all(ProviderError::is_retryable));
    assert!(!fatal.iter().any(ProviderError::is_retryable));
}

#[test]
fn test_retryAfter_shouldOnlyComeFromRateLimits() {
    let limited = ProviderError::RateLimitExceeded {
        message: "busy".to_string(),
        retry_after_secs: Some(3),
    };
    assert_eq!(limited.retry_after(), Some(Duration::from_secs(3)));
    assert_eq!(ProviderError::Timeout("t".to_string()).retry_after(), None);
}

#[test]
fn test_translationError_shouldWrapPipelineErrors() {
    let realign: TranslationError = RealignError::PartitionMismatch { first_seq_num: 4 }.into();
    assert!(realign.to_string().contains("cue 4"));

    let assembly: TranslationError = AssemblyError::MissingCue(9).into();
    assert_eq!(assembly.to_string(), "Assembly error: Cue 9 is missing from the output");
}

#[test]
fn test_appError_shouldConvertFromLowerLayers() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.srt");
    assert!(matches!(AppError::from(io), AppError::File(_)));

    let provider = AppError::from(ProviderError::EmptyResponse);
    assert_eq!(provider.to_string(), "Provider error: Provider returned an empty response");

    let other = AppError::from(anyhow::anyhow!("boom"));
    assert!(matches!(other, AppError::Unknown(message) if message == "boom"));
}
