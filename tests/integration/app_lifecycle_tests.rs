/*!
 * Full app lifecycle tests: SRT in, translated SRT out
 */

use anyhow::Result;
use std::sync::Arc;

use subweave::app_controller::{Controller, FileOutcome, ISSUES_LOG_FILE};
use subweave::file_utils::FileManager;
use subweave::providers::mock::MockProvider;
use subweave::subtitle_processor::SubtitleCollection;

use crate::common;

fn controller(provider: MockProvider) -> Result<Controller> {
    common::init_test_logging();
    Ok(Controller::with_config(common::fast_config())?.with_translator(Arc::new(provider)))
}

#[tokio::test]
async fn test_runToFile_withDialogue_shouldRoundTripThroughSrt() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "episode.en.srt")?;
    let output = temp_dir.path().join("out/episode.translated.srt");

    let outcome = controller(MockProvider::working())?
        .run_to_file(input.clone(), output.clone(), false)
        .await?;

    let FileOutcome::Translated { output_path, summary } = outcome else {
        panic!("expected the file to be translated");
    };
    assert_eq!(output_path, output);
    assert_eq!(summary.fallback_units(), 0);

    let source = SubtitleCollection::from_srt_file(&input, "en")?;
    let translated = SubtitleCollection::from_srt_file(&output, "es")?;
    assert_eq!(translated.entries.len(), source.entries.len());
    for (out, src) in translated.entries.iter().zip(&source.entries) {
        assert_eq!((out.start_time_ms, out.end_time_ms), (src.start_time_ms, src.end_time_ms));
    }
    let all_text = translated
        .entries
        .iter()
        .map(|e| e.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    assert!(all_text.contains("TRANSLATED"));
    assert!(!FileManager::file_exists(temp_dir.path().join("out").join(ISSUES_LOG_FILE)));
    Ok(())
}

#[tokio::test]
async fn test_run_withEmptySubtitleFile_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "empty.srt", "\n\n")?;

    let result = controller(MockProvider::working())?
        .run(input, temp_dir.path().to_path_buf(), false)
        .await;

    assert!(result.is_err());
    Ok(())
}

#[tokio::test]
async fn test_run_withRateLimitedProvider_shouldWriteOriginalTextAndIssues() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "episode.srt")?;

    let mut config = common::fast_config();
    config.translation.common.max_attempts = 2;
    let controller = Controller::with_config(config)?
        .with_translator(Arc::new(MockProvider::rate_limited(Some(0))));

    let outcome = controller
        .run(input.clone(), temp_dir.path().to_path_buf(), false)
        .await?;

    let FileOutcome::Translated { output_path, summary } = outcome else {
        panic!("expected a written file");
    };
    assert_eq!(output_path, temp_dir.path().join("episode.es.srt"));
    assert_eq!(summary.translated_units, 0);

    let source = SubtitleCollection::from_srt_file(&input, "en")?;
    let written = SubtitleCollection::from_srt_file(&output_path, "es")?;
    assert_eq!(written.entries, source.entries);

    let issues = FileManager::read_to_string(temp_dir.path().join(ISSUES_LOG_FILE))?;
    assert!(issues.contains("retries exhausted"));
    Ok(())
}

#[tokio::test]
async fn test_runFolder_shouldTranslateOnceAndSkipOnRerun() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    common::create_test_subtitle(temp_dir.path(), "s01e01.en.srt")?;
    common::create_test_subtitle(temp_dir.path(), "extras/making-of.srt")?;
    let provider = MockProvider::working();

    let first = controller(provider.clone())?
        .run_folder(temp_dir.path().to_path_buf(), false)
        .await?;
    assert_eq!(first.len(), 2);
    assert!(first.iter().all(|o| matches!(o, FileOutcome::Translated { .. })));
    let requests_after_first_run = provider.request_count();

    let second = controller(provider.clone())?
        .run_folder(temp_dir.path().to_path_buf(), false)
        .await?;
    assert_eq!(second.len(), 2);
    assert!(second.iter().all(|o| matches!(o, FileOutcome::Skipped { .. })));
    assert_eq!(provider.request_count(), requests_after_first_run);

    assert!(FileManager::file_exists(temp_dir.path().join("s01e01.es.srt")));
    assert!(FileManager::file_exists(temp_dir.path().join("extras/making-of.es.srt")));
    Ok(())
}

#[tokio::test]
async fn test_run_whenCancelledBeforeStart_shouldNotContactProvider() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "episode.srt")?;
    let provider = MockProvider::working();
    let controller = controller(provider.clone())?;
    controller.cancellation_token().cancel();

    let outcome = controller.run(input, temp_dir.path().to_path_buf(), false).await?;

    assert_eq!(provider.request_count(), 0);
    let FileOutcome::Translated { summary, .. } = outcome else {
        panic!("expected a written file");
    };
    assert_eq!(summary.fallback_units(), summary.units);
    Ok(())
}

#[test]
fn test_testConnection_withInjectedTranslator_shouldSkipNetwork() -> Result<()> {
    let controller = controller(MockProvider::fatal())?;
    tokio_test::assert_ok!(tokio_test::block_on(controller.test_connection()));
    Ok(())
}
