use std::fmt;

use crate::subtitle_processor::SubtitleEntry;

/// Text placed between cues when they are merged into one unit
pub const UNIT_SEPARATOR: &str = " ";

/// Span of one cue inside a unit's combined text (byte offsets)
///
/// The separator that follows a cue belongs to that cue's span, so the spans of
/// a unit are contiguous and cover the combined text exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CueSpan {
    pub seq_num: usize,
    pub start: usize,
    pub end: usize,
}

impl CueSpan {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// One or more contiguous cues merged into a single block of text
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationUnit {
    // @field: Source cues in index order
    pub cues: Vec<SubtitleEntry>,

    // @field: Cue texts joined with UNIT_SEPARATOR
    pub combined_text: String,

    // @field: One span per cue into combined_text
    pub boundaries: Vec<CueSpan>,
}

impl TranslationUnit {
    /// Build a unit from a non-empty run of cues
    pub fn from_cues(cues: Vec<SubtitleEntry>) -> Self {
        let mut combined_text = String::new();
        let mut boundaries = Vec::with_capacity(cues.len());

        for (i, cue) in cues.iter().enumerate() {
            let start = combined_text.len();
            combined_text.push_str(&cue.single_line_text());
            if i + 1 < cues.len() {
                combined_text.push_str(UNIT_SEPARATOR);
            }
            boundaries.push(CueSpan {
                seq_num: cue.seq_num,
                start,
                end: combined_text.len(),
            });
        }

        Self {
            cues,
            combined_text,
            boundaries,
        }
    }

    /// Index of the first cue in the unit
    pub fn first_seq_num(&self) -> usize {
        self.cues.first().map_or(0, |cue| cue.seq_num)
    }

    /// Index of the last cue in the unit
    pub fn last_seq_num(&self) -> usize {
        self.cues.last().map_or(0, |cue| cue.seq_num)
    }

    pub fn len(&self) -> usize {
        self.cues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }
}

impl fmt::Display for TranslationUnit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.len() > 1 {
            write!(f, "cues {}-{}", self.first_seq_num(), self.last_seq_num())
        } else {
            write!(f, "cue {}", self.first_seq_num())
        }
    }
}

/// Outcome of translating a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitStatus {
    Translated,
    FallbackOriginal,
}

/// Why a unit kept its original text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FallbackReason {
    /// Every attempt failed with a transient error
    RetriesExhausted,
    /// The provider refused the request for good
    FatalFailure,
    /// The translation could not be spread over the unit's cues
    RealignmentFallback,
    /// The run was interrupted before the unit was sent
    Cancelled,
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let label = match self {
            Self::RetriesExhausted => "retries exhausted",
            Self::FatalFailure => "fatal failure",
            Self::RealignmentFallback => "realignment fallback",
            Self::Cancelled => "cancelled",
        };
        f.write_str(label)
    }
}

/// A unit together with its translation
#[derive(Debug, Clone, PartialEq)]
pub struct TranslatedUnit {
    pub unit: TranslationUnit,
    pub translated_text: String,
    pub status: UnitStatus,
    /// Number of requests sent for this unit
    pub attempts: u32,
    pub fallback_reason: Option<FallbackReason>,
}

impl TranslatedUnit {
    pub fn translated(unit: TranslationUnit, translated_text: String, attempts: u32) -> Self {
        Self {
            unit,
            translated_text,
            status: UnitStatus::Translated,
            attempts,
            fallback_reason: None,
        }
    }

    /// Keep the original text of the unit
    pub fn fallback(unit: TranslationUnit, reason: FallbackReason, attempts: u32) -> Self {
        Self {
            translated_text: unit.combined_text.clone(),
            unit,
            status: UnitStatus::FallbackOriginal,
            attempts,
            fallback_reason: Some(reason),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.status == UnitStatus::FallbackOriginal
    }
}
