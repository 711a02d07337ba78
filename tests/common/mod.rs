/*!
 * Common test utilities for the subweave test suite
 */

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

use subweave::app_config::Config;
use subweave::providers::mock::MockProvider;
use subweave::subtitle_processor::SubtitleEntry;
use subweave::translation::{LogEntry, RequestLimiter, RetryPolicy, TranslationClient};

/// Route library logs through the test harness, RUST_LOG=debug to see them
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// A short dialogue mixing split sentences, a scene pause and a music cue
pub const DIALOGUE_SRT: &str = "1
00:00:01,000 --> 00:00:02,500
I went to

2
00:00:02,600 --> 00:00:04,000
the store.

3
00:00:04,200 --> 00:00:06,000
It was closed, so I walked

4
00:00:06,100 --> 00:00:07,800
all the way home.

5
00:00:15,000 --> 00:00:16,000
♪ ♪

6
00:00:17,000 --> 00:00:18,500
- Where were you?

7
00:00:18,600 --> 00:00:20,000
- Out.
";

/// Creates a sample subtitle file for testing
pub fn create_test_subtitle(dir: &Path, filename: &str) -> Result<PathBuf> {
    create_test_file(dir, filename, DIALOGUE_SRT)
}

pub fn cue(seq_num: usize, start_ms: u64, end_ms: u64, text: &str) -> SubtitleEntry {
    SubtitleEntry::new(seq_num, start_ms, end_ms, text.to_string())
}

/// Retry policy with millisecond delays
pub fn fast_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        base_delay: Duration::from_millis(1),
        backoff_cap: Duration::from_millis(4),
        jitter: Duration::ZERO,
    }
}

/// Client around a mock provider with no spacing between requests
pub fn fast_client(provider: MockProvider, max_attempts: u32) -> TranslationClient {
    TranslationClient::new(
        Arc::new(provider),
        fast_policy(max_attempts),
        Arc::new(RequestLimiter::new(4, Duration::ZERO)),
    )
}

/// Configuration translating into Spanish without real waiting
pub fn fast_config() -> Config {
    let mut config = Config {
        target_language: "es".to_string(),
        ..Config::default()
    };
    config.translation.common.base_delay_ms = 1;
    config.translation.common.backoff_cap_ms = 2;
    config.translation.common.jitter_ms = 0;
    config.translation.common.rate_limit_delay_ms = 0;
    config.translation.active_provider_config_mut().rate_limit = None;
    config
}

pub fn log_capture() -> Arc<Mutex<Vec<LogEntry>>> {
    Arc::new(Mutex::new(Vec::new()))
}
