/*!
 * Concurrent translation pipeline.
 *
 * Cues are combined into units, every unit is translated and split back onto its
 * cues as an independent task, and the assembler restores source order. Tasks run
 * with bounded concurrency; completion order does not matter.
 */

use futures::stream::{self, StreamExt};
use log::{debug, error, warn};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use tokio::runtime::{Handle, RuntimeFlavor};

use super::assembler::assemble;
use super::client::{CancellationToken, TranslationClient};
use crate::analysis::LinguisticAnalyzer;
use crate::app_config::SegmentationConfig;
use crate::errors::{RealignError, TranslationError};
use crate::segmentation::{
    CueCombiner, FallbackReason, RealignmentSplitter, TranslatedUnit, TranslationUnit,
};
use crate::subtitle_processor::SubtitleEntry;

/// Log entry for capturing translation process logs
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub level: String,
    pub message: String,
}

fn push_log(log_capture: &StdMutex<Vec<LogEntry>>, level: &str, message: String) {
    if let Ok(mut logs) = log_capture.lock() {
        logs.push(LogEntry {
            level: level.to_string(),
            message,
        });
    }
}

/// Counts collected over one run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub cues: usize,
    pub units: usize,
    pub translated_units: usize,
    /// Units that kept their original text, by reason
    pub fallbacks: HashMap<FallbackReason, usize>,
    /// Requests sent to the provider
    pub attempts: u64,
    pub retries: u64,
}

impl RunSummary {
    pub fn fallback_units(&self) -> usize {
        self.fallbacks.values().sum()
    }

    pub fn fallback_count(&self, reason: FallbackReason) -> usize {
        self.fallbacks.get(&reason).copied().unwrap_or(0)
    }

    fn record(&mut self, unit: &TranslatedUnit) {
        self.units += 1;
        self.cues += unit.unit.len();
        match unit.fallback_reason {
            Some(reason) => *self.fallbacks.entry(reason).or_insert(0) += 1,
            None => self.translated_units += 1,
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} cues in {} units: {} translated, {} kept original \
             ({} retries exhausted, {} fatal, {} realignment, {} cancelled); {} requests, {} retries",
            self.cues,
            self.units,
            self.translated_units,
            self.fallback_units(),
            self.fallback_count(FallbackReason::RetriesExhausted),
            self.fallback_count(FallbackReason::FatalFailure),
            self.fallback_count(FallbackReason::RealignmentFallback),
            self.fallback_count(FallbackReason::Cancelled),
            self.attempts,
            self.retries
        )
    }
}

/// Result of a pipeline run
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Output cues in source order
    pub entries: Vec<SubtitleEntry>,
    /// Every unit with its final status, in source order
    pub units: Vec<TranslatedUnit>,
    pub summary: RunSummary,
}

/// Combine, translate, realign and assemble a list of cues
pub struct TranslationPipeline<'a> {
    client: &'a TranslationClient,
    analyzer: &'a dyn LinguisticAnalyzer,
    segmentation: &'a SegmentationConfig,
    target_language: String,
    max_concurrent_requests: usize,
    cancellation: CancellationToken,
}

impl<'a> TranslationPipeline<'a> {
    pub fn new(
        client: &'a TranslationClient,
        analyzer: &'a dyn LinguisticAnalyzer,
        segmentation: &'a SegmentationConfig,
        target_language: impl Into<String>,
        max_concurrent_requests: usize,
    ) -> Self {
        Self {
            client,
            analyzer,
            segmentation,
            target_language: target_language.into(),
            max_concurrent_requests: max_concurrent_requests.max(1),
            cancellation: CancellationToken::new(),
        }
    }

    /// Units not yet started when the token is cancelled keep their original text
    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// Group cues into translation units
    pub fn combine(&self, cues: &[SubtitleEntry]) -> Vec<TranslationUnit> {
        CueCombiner::new(self.analyzer, self.segmentation).combine(cues)
    }

    /// `combine` from async code, letting the runtime move other tasks away
    /// while a blocking analyzer works
    fn combine_in_place(&self, cues: &[SubtitleEntry]) -> Vec<TranslationUnit> {
        let multi_thread = Handle::try_current()
            .map(|handle| handle.runtime_flavor() == RuntimeFlavor::MultiThread)
            .unwrap_or(false);
        if multi_thread && self.analyzer.blocking_handle().is_some() {
            tokio::task::block_in_place(|| self.combine(cues))
        } else {
            self.combine(cues)
        }
    }

    /// Run the whole pipeline over the cues of one file
    ///
    /// Translation failures degrade to original text; only a broken partition
    /// or a coverage violation fails the run.
    pub async fn run(
        &self,
        cues: &[SubtitleEntry],
        log_capture: Arc<StdMutex<Vec<LogEntry>>>,
        progress_callback: impl Fn(usize, usize) + Clone + Send + 'static,
    ) -> Result<PipelineOutput, TranslationError> {
        let units = self.combine_in_place(cues);
        let total_units = units.len();
        let processed_units = Arc::new(AtomicUsize::new(0));
        let splitter = RealignmentSplitter::new(self.analyzer, self.target_language.as_str())
            .with_snap_ratio(self.segmentation.fragment_snap_ratio);
        let splitter = &splitter;

        let stats_before = self.client.limiter().stats();

        let results = stream::iter(units.into_iter().enumerate())
            .map(|(unit_index, unit)| {
                let log_capture = log_capture.clone();
                let processed_units = processed_units.clone();
                let progress_callback = progress_callback.clone();
                let cancellation = self.cancellation.clone();

                async move {
                    let start_time = Instant::now();
                    let translated = if cancellation.is_cancelled() {
                        TranslatedUnit::fallback(unit, FallbackReason::Cancelled, 0)
                    } else {
                        self.client.translate_unit(&unit).await
                    };

                    let result = realign(splitter, translated, &log_capture).await;

                    let current = processed_units.fetch_add(1, Ordering::SeqCst) + 1;
                    progress_callback(current, total_units);

                    match &result {
                        Ok((translated, _)) => {
                            if let Some(reason) = translated.fallback_reason {
                                push_log(
                                    &log_capture,
                                    "WARN",
                                    format!("{} kept its original text: {}", translated.unit, reason),
                                );
                            } else {
                                debug!(
                                    "Unit {} of {} completed in {:?}",
                                    unit_index + 1,
                                    total_units,
                                    start_time.elapsed()
                                );
                            }
                        }
                        Err(e) => push_log(&log_capture, "ERROR", format!("Unit {} failed: {}", unit_index + 1, e)),
                    }

                    (unit_index, result)
                }
            })
            .buffer_unordered(self.max_concurrent_requests)
            .collect::<Vec<_>>()
            .await;

        // Sort results by unit index to maintain original order
        let mut sorted_results = results;
        sorted_results.sort_by_key(|(index, _)| *index);

        let mut summary = RunSummary::default();
        let mut translated_units = Vec::with_capacity(sorted_results.len());
        let mut outputs = Vec::with_capacity(sorted_results.len());
        for (_, result) in sorted_results {
            let (translated, cues) = result.map_err(|e| {
                error!("{}", e);
                TranslationError::from(e)
            })?;
            summary.record(&translated);
            translated_units.push(translated);
            outputs.push(cues);
        }

        let stats_after = self.client.limiter().stats();
        summary.attempts = stats_after.attempts - stats_before.attempts;
        summary.retries = stats_after.retries - stats_before.retries;

        let entries = assemble(cues, outputs)?;

        Ok(PipelineOutput {
            entries,
            units: translated_units,
            summary,
        })
    }
}

/// Split a translated unit, degrading to the original cues when the text is too short
async fn realign(
    splitter: &RealignmentSplitter<'_>,
    translated: TranslatedUnit,
    log_capture: &StdMutex<Vec<LogEntry>>,
) -> Result<(TranslatedUnit, Vec<SubtitleEntry>), RealignError> {
    match splitter.split_async(&translated).await {
        Ok(realignment) => Ok((translated, realignment.cues)),
        Err(RealignError::InsufficientText {
            first_seq_num,
            cues,
            available,
        }) => {
            warn!(
                "Translation of unit at cue {} offers {} cut points for {} cues, keeping original text",
                first_seq_num, available, cues
            );
            push_log(
                log_capture,
                "WARN",
                format!(
                    "{}: translation \"{}\" could not be spread over {} cues",
                    translated.unit, translated.translated_text, cues
                ),
            );
            let attempts = translated.attempts;
            let fallback = TranslatedUnit::fallback(translated.unit, FallbackReason::RealignmentFallback, attempts);
            let cues = RealignmentSplitter::identity_split(&fallback).cues;
            Ok((fallback, cues))
        }
        Err(e) => Err(e),
    }
}
