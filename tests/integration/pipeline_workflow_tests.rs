/*!
 * Integration tests running the translation pipeline against mock providers
 */

use anyhow::Result;
use std::collections::HashSet;

use subweave::analysis::{Analyzer, FullAnalyzer, HeuristicAnalyzer};
use subweave::app_config::SegmentationConfig;
use subweave::errors::ProviderError;
use subweave::providers::mock::MockProvider;
use subweave::segmentation::{FallbackReason, UnitStatus};
use subweave::subtitle_processor::{SubtitleCollection, SubtitleEntry};
use subweave::translation::{CancellationToken, TranslationPipeline};

use crate::common::{self, cue};

fn dialogue() -> Result<Vec<SubtitleEntry>> {
    common::init_test_logging();
    Ok(SubtitleCollection::parse_srt_string(common::DIALOGUE_SRT)?)
}

/// Every source cue comes back once, in order, with its timing
fn assert_same_cue_identities(output: &[SubtitleEntry], source: &[SubtitleEntry]) {
    assert_eq!(output.len(), source.len());
    for (out, src) in output.iter().zip(source) {
        assert_eq!(out.seq_num, src.seq_num);
        assert_eq!(out.start_time_ms, src.start_time_ms);
        assert_eq!(out.end_time_ms, src.end_time_ms);
        assert!(!out.text.trim().is_empty(), "cue {} is empty", out.seq_num);
    }
}

#[tokio::test]
async fn test_run_withStoreScenario_shouldSpreadTranslationOverBothCues() -> Result<()> {
    let cues = vec![cue(1, 1_000, 2_500, "I went to"), cue(2, 2_600, 4_000, "the store.")];
    let client = common::fast_client(
        MockProvider::working().with_custom_response(|_| "Fui a la tienda.".to_string()),
        3,
    );
    let config = SegmentationConfig::default();
    let pipeline = TranslationPipeline::new(&client, &HeuristicAnalyzer, &config, "es", 2);

    let output = pipeline.run(&cues, common::log_capture(), |_, _| {}).await?;

    assert_same_cue_identities(&output.entries, &cues);
    assert_eq!(output.units.len(), 1);
    assert_eq!(output.units[0].status, UnitStatus::Translated);
    let joined = format!("{} {}", output.entries[0].text, output.entries[1].text);
    assert_eq!(joined, "Fui a la tienda.");
    Ok(())
}

#[tokio::test]
async fn test_run_withDialogue_shouldCoverEveryCueExactlyOnce() -> Result<()> {
    let cues = dialogue()?;
    let client = common::fast_client(MockProvider::working(), 3);
    let config = SegmentationConfig::default();
    let pipeline = TranslationPipeline::new(&client, &HeuristicAnalyzer, &config, "es", 4);

    let output = pipeline.run(&cues, common::log_capture(), |_, _| {}).await?;

    assert_same_cue_identities(&output.entries, &cues);
    let seen: HashSet<usize> = output.entries.iter().map(|c| c.seq_num).collect();
    assert_eq!(seen.len(), cues.len());
    assert_eq!(output.summary.cues, cues.len());
    assert_eq!(output.summary.units, output.units.len());
    assert_eq!(output.summary.translated_units, output.units.len());
    Ok(())
}

#[tokio::test]
async fn test_run_withAlwaysRetryableProvider_shouldKeepOriginalText() -> Result<()> {
    let cues = dialogue()?;
    let provider = MockProvider::always_retryable();
    let client = common::fast_client(provider.clone(), 3);
    let config = SegmentationConfig::default();
    let pipeline = TranslationPipeline::new(&client, &HeuristicAnalyzer, &config, "es", 4);

    let output = pipeline.run(&cues, common::log_capture(), |_, _| {}).await?;

    assert_eq!(output.entries, cues);
    let units = output.summary.units;
    assert_eq!(output.summary.fallback_count(FallbackReason::RetriesExhausted), units);
    assert_eq!(provider.request_count(), units * 3);
    assert_eq!(output.summary.attempts, (units * 3) as u64);
    assert_eq!(output.summary.retries, (units * 2) as u64);
    Ok(())
}

#[tokio::test]
async fn test_run_withIntermittentProvider_shouldRecoverEveryUnit() -> Result<()> {
    let cues = dialogue()?;
    let client = common::fast_client(MockProvider::intermittent(2), 4);
    let config = SegmentationConfig::default();
    let pipeline = TranslationPipeline::new(&client, &HeuristicAnalyzer, &config, "es", 1);

    let output = pipeline.run(&cues, common::log_capture(), |_, _| {}).await?;

    assert_same_cue_identities(&output.entries, &cues);
    assert_eq!(output.summary.fallback_units(), 0);
    assert!(output.summary.retries >= 1);
    assert!(output.units.iter().any(|u| u.attempts > 1));
    Ok(())
}

#[tokio::test]
async fn test_run_withMixedOutcomes_shouldOnlyDegradeFailingUnits() -> Result<()> {
    let cues = vec![
        cue(1, 0, 1_000, "Hello."),
        cue(2, 1_500, 2_500, "Goodbye."),
    ];
    let provider = MockProvider::scripted(vec![
        Ok("Hola.".to_string()),
        Err(ProviderError::AuthenticationError("revoked".to_string())),
    ]);
    let client = common::fast_client(provider, 3);
    let config = SegmentationConfig::default();
    let pipeline = TranslationPipeline::new(&client, &HeuristicAnalyzer, &config, "es", 1);
    let logs = common::log_capture();

    let output = pipeline.run(&cues, logs.clone(), |_, _| {}).await?;

    assert_eq!(output.entries[0].text, "Hola.");
    assert_eq!(output.entries[1].text, "Goodbye.");
    assert_eq!(output.summary.fallback_count(FallbackReason::FatalFailure), 1);
    let logs = logs.lock().map(|l| l.clone()).unwrap_or_default();
    assert!(logs.iter().any(|l| l.level == "WARN" && l.message.contains("fatal failure")));
    Ok(())
}

#[tokio::test]
async fn test_run_whenCancelledMidRun_shouldKeepOriginalTextForRemainingUnits() -> Result<()> {
    let cues = vec![
        cue(1, 0, 1_000, "First sentence."),
        cue(2, 1_500, 2_500, "Second sentence."),
        cue(3, 3_000, 4_000, "Third sentence."),
    ];
    let provider = MockProvider::working();
    let cancellation = CancellationToken::new();
    let client = common::fast_client(provider.clone(), 3).with_cancellation(cancellation.clone());
    let config = SegmentationConfig::default();
    let pipeline = TranslationPipeline::new(&client, &HeuristicAnalyzer, &config, "es", 1)
        .with_cancellation(cancellation.clone());

    let trigger = cancellation.clone();
    let output = pipeline
        .run(&cues, common::log_capture(), move |completed, _| {
            if completed == 1 {
                trigger.cancel();
            }
        })
        .await?;

    assert_same_cue_identities(&output.entries, &cues);
    assert_eq!(provider.request_count(), 1);
    assert_eq!(output.summary.translated_units, 1);
    assert_eq!(output.summary.fallback_count(FallbackReason::Cancelled), 2);
    assert_eq!(output.entries[1].text, "Second sentence.");
    assert_eq!(output.entries[2].text, "Third sentence.");
    Ok(())
}

#[tokio::test]
async fn test_run_withUnitSizeLimit_shouldSendOneRequestPerUnit() -> Result<()> {
    let cues = dialogue()?;
    let provider = MockProvider::working();
    let client = common::fast_client(provider.clone(), 2);
    let config = SegmentationConfig {
        max_unit_cues: Some(1),
        ..SegmentationConfig::default()
    };
    let pipeline = TranslationPipeline::new(&client, &HeuristicAnalyzer, &config, "es", 3);

    let output = pipeline.run(&cues, common::log_capture(), |_, _| {}).await?;

    assert_eq!(output.summary.units, cues.len());
    assert_eq!(provider.request_count(), cues.len());
    assert_same_cue_identities(&output.entries, &cues);
    Ok(())
}

#[tokio::test]
async fn test_run_withUnsplittableTranslation_shouldKeepOriginalCues() -> Result<()> {
    let cues = vec![cue(1, 1_000, 2_500, "I went to"), cue(2, 2_600, 4_000, "the store.")];
    let client = common::fast_client(
        MockProvider::working().with_custom_response(|_| "¡Fui!".to_string()),
        3,
    );
    let config = SegmentationConfig::default();
    let pipeline = TranslationPipeline::new(&client, &HeuristicAnalyzer, &config, "es", 2);
    let logs = common::log_capture();

    let output = pipeline.run(&cues, logs.clone(), |_, _| {}).await?;

    assert_eq!(output.entries, cues);
    assert_eq!(output.summary.fallback_count(FallbackReason::RealignmentFallback), 1);
    let logs = logs.lock().map(|l| l.clone()).unwrap_or_default();
    assert!(logs.iter().any(|l| l.level == "WARN" && l.message.contains("could not be spread")));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_run_withUnavailableFullAnalyzer_shouldMatchHeuristicRun() -> Result<()> {
    let cues = dialogue()?;
    let config = SegmentationConfig::default();
    let full = Analyzer::Full(FullAnalyzer::new(
        "subweave-missing-analyzer",
        vec![],
        vec!["en".to_string(), "es".to_string()],
    ));

    let heuristic_client = common::fast_client(MockProvider::working(), 2);
    let expected = TranslationPipeline::new(&heuristic_client, &HeuristicAnalyzer, &config, "es", 4)
        .run(&cues, common::log_capture(), |_, _| {})
        .await?;

    let full_client = common::fast_client(MockProvider::working(), 2);
    let output = TranslationPipeline::new(&full_client, &full, &config, "es", 4)
        .run(&cues, common::log_capture(), |_, _| {})
        .await?;

    assert_eq!(output.entries, expected.entries);
    assert_eq!(output.summary.units, expected.summary.units);
    Ok(())
}
