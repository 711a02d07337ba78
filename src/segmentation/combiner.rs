use log::{debug, trace};

use super::rules::{CloseReason, MergeReason};
use super::unit::{TranslationUnit, UNIT_SEPARATOR};
use crate::analysis::{LinguisticAnalyzer, analyze_with_fallback};
use crate::app_config::SegmentationConfig;
use crate::subtitle_processor::SubtitleEntry;

/// Decision taken for the cue after the current unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeDecision {
    Merge(MergeReason),
    Close(CloseReason),
}

/// Groups consecutive cues that belong to the same sentence
///
/// Combination is pure: the same cues and analyzer output always give the same
/// units, whatever happens later in the pipeline.
pub struct CueCombiner<'a> {
    analyzer: &'a dyn LinguisticAnalyzer,
    config: &'a SegmentationConfig,
}

impl<'a> CueCombiner<'a> {
    pub fn new(analyzer: &'a dyn LinguisticAnalyzer, config: &'a SegmentationConfig) -> Self {
        Self { analyzer, config }
    }

    /// Group the cues into units covering every cue exactly once, in order
    pub fn combine(&self, cues: &[SubtitleEntry]) -> Vec<TranslationUnit> {
        let cue_texts: Vec<String> = cues.iter().map(SubtitleEntry::single_line_text).collect();
        self.analyzer
            .prefetch(&cue_texts.iter().map(String::as_str).collect::<Vec<_>>());

        let mut units = Vec::new();
        let mut current: Vec<SubtitleEntry> = Vec::new();
        let mut current_text = String::new();

        for cue in cues {
            if current.is_empty() {
                current_text = cue.single_line_text();
                current.push(cue.clone());
                continue;
            }

            match self.decide(&current, &current_text, cue) {
                MergeDecision::Merge(reason) => {
                    trace!("Merging cue {} into unit: {:?}", cue.seq_num, reason);
                    current_text.push_str(UNIT_SEPARATOR);
                    current_text.push_str(&cue.single_line_text());
                    current.push(cue.clone());
                }
                MergeDecision::Close(reason) => {
                    trace!("Closing unit before cue {}: {:?}", cue.seq_num, reason);
                    units.push(TranslationUnit::from_cues(std::mem::take(&mut current)));
                    current_text = cue.single_line_text();
                    current.push(cue.clone());
                }
            }
        }

        if !current.is_empty() {
            units.push(TranslationUnit::from_cues(current));
        }

        debug!(
            "Combined {} cues into {} translation units using the {} analyzer",
            cues.len(),
            units.len(),
            self.analyzer.name()
        );
        units
    }

    /// Whether `next` continues the unit made of `current`
    pub fn decide(
        &self,
        current: &[SubtitleEntry],
        current_text: &str,
        next: &SubtitleEntry,
    ) -> MergeDecision {
        let Some(last) = current.last() else {
            return MergeDecision::Close(CloseReason::Complete);
        };

        // A long pause usually means a scene change
        if let Some(max_gap_seconds) = self.config.max_gap_seconds {
            let gap_ms = next.start_time_ms.saturating_sub(last.end_time_ms);
            if gap_ms as f64 > max_gap_seconds * 1000.0 {
                return MergeDecision::Close(CloseReason::TimingGap);
            }
        }

        if let Some(max_unit_cues) = self.config.max_unit_cues {
            if current.len() >= max_unit_cues {
                return MergeDecision::Close(CloseReason::SizeLimit);
            }
        }

        let next_text = next.single_line_text();
        let current_analysis = analyze_with_fallback(self.analyzer, current_text);
        let next_analysis = analyze_with_fallback(self.analyzer, &next_text);

        if current_analysis.has_no_words() || next_analysis.has_no_words() {
            return MergeDecision::Close(CloseReason::NoLinguisticContent);
        }

        let rules = &self.config.rules;
        let terminated = rules.is_terminated(&current_analysis);

        if let Some(reason) = rules.blocker(
            &current_analysis,
            &next_analysis,
            current_text,
            &next_text,
            terminated,
        ) {
            return MergeDecision::Close(reason);
        }

        if let Some(reason) = rules.trailing_incomplete(&current_analysis) {
            return MergeDecision::Merge(reason);
        }

        if !terminated && rules.merge_open_endings {
            return MergeDecision::Merge(MergeReason::OpenEnding);
        }

        if let Some(reason) = rules.leading_continuation(&next_analysis, terminated) {
            return MergeDecision::Merge(reason);
        }

        if rules.merge_without_root_verb && !current_analysis.has_root_verb() {
            return MergeDecision::Merge(MergeReason::NoMainVerb);
        }

        MergeDecision::Close(CloseReason::Complete)
    }
}
