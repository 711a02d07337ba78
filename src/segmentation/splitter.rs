/*!
 * Realignment of translated text onto the original cue time slots.
 *
 * The translated text of a unit is cut into one piece per source cue. Cuts are
 * taken from a ranked pool of candidate positions:
 *
 * 1. fragment boundaries (after sentence ends and clause punctuation)
 * 2. whitespace between words outside named entities
 * 3. whitespace inside multi-word named entities
 * 4. boundaries between letters of scripts written without spaces (Chinese,
 *    Japanese, Thai...)
 * 5. any other boundary touching such a script
 *
 * The first two tiers are always available; the others only join the pool when
 * it still holds fewer positions than cuts are needed. Text written with spaces
 * is never cut inside a word: when it runs out of word boundaries the split
 * fails with `InsufficientText`. Positions and shares are counted in extended
 * grapheme clusters, so a cut never separates a base letter from its marks.
 *
 * Each cut goes to the candidate closest to the cue's proportional share of the
 * text, with fragment boundaries winning inside a snap window.
 */

use std::collections::{BTreeMap, HashSet};

use log::trace;
use unicode_segmentation::UnicodeSegmentation;

use super::unit::{TranslatedUnit, UNIT_SEPARATOR};
use crate::analysis::heuristic::{is_closing_mark, is_ellipsis};
use crate::analysis::{
    Analysis, EntityIob, HeuristicAnalyzer, LinguisticAnalyzer, analyze_with_fallback,
    analyze_with_fallback_async,
};
use crate::errors::RealignError;
use crate::subtitle_processor::SubtitleEntry;

const CLAUSE_PUNCTUATION: &[&str] = &[
    ",", ";", ":", "、", "，", "；", "：", "。", "！", "？", "—", "–",
];

/// Default share of the text within which a fragment boundary beats a closer word boundary
pub const DEFAULT_FRAGMENT_SNAP_RATIO: f64 = 0.15;

/// Kind of position a cut can be made at, best first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CutTier {
    Fragment,
    Word,
    EntityWord,
    Unspaced,
    Character,
}

impl CutTier {
    /// Tiers sharing a rank are equally acceptable
    fn rank(self) -> u8 {
        match self {
            Self::Fragment | Self::Word => 0,
            Self::EntityWord => 1,
            Self::Unspaced => 2,
            Self::Character => 3,
        }
    }
}

/// A place where the translated text may be cut
///
/// The piece before the cut ends at `end`; the next piece resumes at `resume`.
/// Whatever lies between them (whitespace or nothing) is the separator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CutCandidate {
    end: usize,
    resume: usize,
    tier: CutTier,
    /// Position of `end` in grapheme clusters
    position: usize,
}

/// Output of a split: one cue per source cue plus the separators between them
#[derive(Debug, Clone, PartialEq)]
pub struct Realignment {
    pub cues: Vec<SubtitleEntry>,
    pub pieces: Vec<String>,
    pub separators: Vec<String>,
}

impl Realignment {
    /// Pieces joined with their separators
    pub fn joined_text(&self) -> String {
        let mut text = String::new();
        for (i, piece) in self.pieces.iter().enumerate() {
            text.push_str(piece);
            if let Some(separator) = self.separators.get(i) {
                text.push_str(separator);
            }
        }
        text
    }
}

/// Distributes a unit's translated text over the unit's cues
pub struct RealignmentSplitter<'a> {
    analyzer: &'a dyn LinguisticAnalyzer,
    target_language: String,
    snap_ratio: f64,
}

impl<'a> RealignmentSplitter<'a> {
    pub fn new(analyzer: &'a dyn LinguisticAnalyzer, target_language: impl Into<String>) -> Self {
        Self {
            analyzer,
            target_language: target_language.into(),
            snap_ratio: DEFAULT_FRAGMENT_SNAP_RATIO,
        }
    }

    pub fn with_snap_ratio(mut self, snap_ratio: f64) -> Self {
        self.snap_ratio = snap_ratio;
        self
    }

    /// Split a translated unit into one output cue per source cue
    ///
    /// Timings always come from the source cues.
    pub fn split(&self, translated: &TranslatedUnit) -> Result<Realignment, RealignError> {
        if let Some(realignment) = Self::split_without_analysis(translated) {
            return Ok(realignment);
        }
        let analysis = if self.analyzer.supports_language(&self.target_language) {
            analyze_with_fallback(self.analyzer, &translated.translated_text)
        } else {
            HeuristicAnalyzer.analyze_text(&translated.translated_text)
        };
        self.split_analyzed(translated, &analysis)
    }

    /// `split` for async callers; a blocking analyzer runs on a blocking thread
    pub async fn split_async(&self, translated: &TranslatedUnit) -> Result<Realignment, RealignError> {
        if let Some(realignment) = Self::split_without_analysis(translated) {
            return Ok(realignment);
        }
        let analysis = if self.analyzer.supports_language(&self.target_language) {
            analyze_with_fallback_async(self.analyzer, &translated.translated_text).await
        } else {
            HeuristicAnalyzer.analyze_text(&translated.translated_text)
        };
        self.split_analyzed(translated, &analysis)
    }

    /// Splits that need no cut points: fallbacks, untouched text and single cues
    fn split_without_analysis(translated: &TranslatedUnit) -> Option<Realignment> {
        let unit = &translated.unit;

        if translated.is_fallback() || translated.translated_text == unit.combined_text {
            return Some(Self::identity_split(translated));
        }

        if unit.cues.len() == 1 {
            let text = translated.translated_text.clone();
            return Some(Realignment {
                cues: vec![unit.cues[0].with_text(text.clone())],
                pieces: vec![text],
                separators: Vec::new(),
            });
        }

        None
    }

    fn split_analyzed(&self, translated: &TranslatedUnit, analysis: &Analysis) -> Result<Realignment, RealignError> {
        let unit = &translated.unit;
        let text = translated.translated_text.as_str();
        let needed = unit.cues.len() - 1;
        let pool = candidate_pool(text, analysis, needed);

        if pool.len() < needed {
            return Err(RealignError::InsufficientText {
                first_seq_num: unit.first_seq_num(),
                cues: unit.cues.len(),
                available: pool.len(),
            });
        }

        let text_len = grapheme_count(text);
        let targets = proportional_targets(translated, text_len);
        let snap_window = self.snap_ratio * text_len as f64;
        let mut chosen: Vec<usize> = targets
            .iter()
            .map(|&target| pick_candidate(&pool, target, snap_window))
            .collect();
        chosen.sort_unstable();

        resolve_collisions(&mut chosen, &pool, text_len);

        let mut pieces = Vec::with_capacity(unit.cues.len());
        let mut separators = Vec::with_capacity(needed);
        let mut piece_start = 0;
        for &index in &chosen {
            let cut = pool[index];
            pieces.push(text[piece_start..cut.end].to_string());
            separators.push(text[cut.end..cut.resume].to_string());
            piece_start = cut.resume;
        }
        pieces.push(text[piece_start..].to_string());

        let realignment = Realignment {
            cues: unit
                .cues
                .iter()
                .zip(&pieces)
                .map(|(cue, piece)| cue.with_text(piece.clone()))
                .collect(),
            pieces,
            separators,
        };

        if realignment.joined_text() != text || realignment.pieces.iter().any(String::is_empty) {
            return Err(RealignError::PartitionMismatch {
                first_seq_num: unit.first_seq_num(),
            });
        }

        trace!(
            "Split {} into {:?}",
            unit,
            realignment.pieces
        );
        Ok(realignment)
    }

    /// Each cue keeps its own original text
    pub fn identity_split(translated: &TranslatedUnit) -> Realignment {
        let unit = &translated.unit;
        Realignment {
            cues: unit.cues.clone(),
            pieces: unit.cues.iter().map(SubtitleEntry::single_line_text).collect(),
            separators: vec![UNIT_SEPARATOR.to_string(); unit.cues.len().saturating_sub(1)],
        }
    }
}

/// Candidate cut positions sorted by position
fn candidate_pool(text: &str, analysis: &Analysis, needed: usize) -> Vec<CutCandidate> {
    let candidates = collect_candidates(text, analysis);

    let mut pool: Vec<CutCandidate> = candidates
        .iter()
        .filter(|c| c.tier <= CutTier::Word)
        .copied()
        .collect();

    for tier in [CutTier::EntityWord, CutTier::Unspaced, CutTier::Character] {
        if pool.len() >= needed {
            break;
        }
        pool.extend(candidates.iter().filter(|c| c.tier == tier).copied());
    }

    pool.sort_by_key(|c| c.end);
    pool
}

/// Scripts that do not separate words with spaces
///
/// Hangul is absent on purpose: Korean is written with spaces.
fn is_unspaced_script(c: char) -> bool {
    matches!(c as u32,
        0x0E00..=0x0EFF     // thai, lao
        | 0x1000..=0x109F   // myanmar
        | 0x1780..=0x17FF   // khmer
        | 0x3040..=0x30FF   // kana
        | 0x3400..=0x4DBF   // CJK extension A
        | 0x4E00..=0x9FFF   // CJK unified ideographs
        | 0xF900..=0xFAFF   // compatibility ideographs
    )
}

fn grapheme_count(text: &str) -> usize {
    text.graphemes(true).count()
}

fn first_char(cluster: &str) -> char {
    cluster.chars().next().unwrap_or(' ')
}

fn is_blank(cluster: &str) -> bool {
    cluster.chars().all(char::is_whitespace)
}

fn ends_fragment(surface: &str, sentence_boundary: bool) -> bool {
    sentence_boundary || CLAUSE_PUNCTUATION.contains(&surface) || is_ellipsis(surface)
}

/// Every cut position in the text, each with the best tier it qualifies for
fn collect_candidates(text: &str, analysis: &Analysis) -> Vec<CutCandidate> {
    let mut fragment_ends: HashSet<usize> = HashSet::new();
    let mut entity_starts: HashSet<usize> = HashSet::new();
    for (i, token) in analysis.tokens.iter().enumerate() {
        let after_fragment = i > 0
            && is_closing_mark(&token.surface)
            && fragment_ends.contains(&token.offset);
        if ends_fragment(&token.surface, token.sentence_boundary) || after_fragment {
            fragment_ends.insert(token.end());
        }
        if token.entity == EntityIob::Inside {
            entity_starts.insert(token.offset);
        }
    }

    let clusters: Vec<(usize, &str)> = text.grapheme_indices(true).collect();
    let mut candidates: BTreeMap<usize, CutCandidate> = BTreeMap::new();
    let mut offer = |candidate: CutCandidate| {
        candidates
            .entry(candidate.end)
            .and_modify(|existing| {
                if candidate.tier < existing.tier {
                    *existing = candidate;
                }
            })
            .or_insert(candidate);
    };

    let mut i = 0;
    while i < clusters.len() {
        let (byte, cluster) = clusters[i];

        if is_blank(cluster) {
            let run_start = i;
            while i < clusters.len() && is_blank(clusters[i].1) {
                i += 1;
            }
            // leading and trailing whitespace are never cuts
            if run_start > 0 && i < clusters.len() {
                let resume = clusters[i].0;
                let tier = if fragment_ends.contains(&byte) {
                    CutTier::Fragment
                } else if entity_starts.contains(&resume) {
                    CutTier::EntityWord
                } else {
                    CutTier::Word
                };
                offer(CutCandidate {
                    end: byte,
                    resume,
                    tier,
                    position: run_start,
                });
            }
            continue;
        }

        if i > 0 && !is_blank(clusters[i - 1].1) {
            let previous = first_char(clusters[i - 1].1);
            let c = first_char(cluster);
            let unspaced = is_unspaced_script(previous) || is_unspaced_script(c);
            let tier = if fragment_ends.contains(&byte) && c.is_alphanumeric() {
                Some(CutTier::Fragment)
            } else if unspaced && c.is_alphanumeric() {
                Some(CutTier::Unspaced)
            } else if unspaced {
                Some(CutTier::Character)
            } else {
                None
            };
            if let Some(tier) = tier {
                offer(CutCandidate {
                    end: byte,
                    resume: byte,
                    tier,
                    position: i,
                });
            }
        }

        i += 1;
    }

    candidates.into_values().collect()
}

/// Grapheme offsets where each cut should ideally fall
fn proportional_targets(translated: &TranslatedUnit, translated_len: usize) -> Vec<f64> {
    let unit = &translated.unit;
    let span_lens: Vec<usize> = unit
        .boundaries
        .iter()
        .map(|span| grapheme_count(&unit.combined_text[span.start..span.end]))
        .collect();
    let total: usize = span_lens.iter().sum::<usize>().max(1);

    let mut cumulative = 0;
    span_lens[..span_lens.len().saturating_sub(1)]
        .iter()
        .map(|&len| {
            cumulative += len;
            cumulative as f64 / total as f64 * translated_len as f64
        })
        .collect()
}

fn distance(candidate: &CutCandidate, target: f64) -> f64 {
    (candidate.position as f64 - target).abs()
}

fn nearest(
    pool: &[CutCandidate],
    target: f64,
    accept: impl Fn(&CutCandidate) -> bool,
) -> Option<usize> {
    pool.iter()
        .enumerate()
        .filter(|(_, c)| accept(*c))
        .min_by(|(_, a), (_, b)| distance(a, target).total_cmp(&distance(b, target)))
        .map(|(index, _)| index)
}

/// Index of the preferred candidate for one target
fn pick_candidate(pool: &[CutCandidate], target: f64, snap_window: f64) -> usize {
    let snapped = nearest(pool, target, |c| {
        c.tier == CutTier::Fragment && distance(c, target) <= snap_window
    });
    if let Some(index) = snapped {
        return index;
    }

    let best_rank = pool.iter().map(|c| c.tier.rank()).min().unwrap_or(0);
    nearest(pool, target, |c| c.tier.rank() == best_rank).unwrap_or(0)
}

/// Make the chosen candidates strictly increasing so that no piece is empty
///
/// When two cuts collide, the empty piece takes one candidate from its longer
/// neighbor. A final pass clamps whatever is left into a valid sequence.
fn resolve_collisions(chosen: &mut [usize], pool: &[CutCandidate], text_len: usize) {
    let needed = chosen.len();
    if needed == 0 {
        return;
    }
    let position = |index: usize| pool[index].position;

    for _ in 0..pool.len() * needed {
        let Some(k) = (1..needed).find(|&k| chosen[k] <= chosen[k - 1]) else {
            break;
        };

        let left_start = if k >= 2 { position(chosen[k - 2]) } else { 0 };
        let left_len = position(chosen[k - 1]).saturating_sub(left_start);
        let right_end = if k + 1 < needed {
            position(chosen[k + 1])
        } else {
            text_len
        };
        let right_len = right_end.saturating_sub(position(chosen[k]));

        let left_floor = if k >= 2 { chosen[k - 2] + 1 } else { 0 };
        let right_ceiling = if k + 1 < needed {
            chosen[k + 1]
        } else {
            pool.len()
        };
        let can_move_left = chosen[k - 1] > left_floor;
        let can_move_right = chosen[k] + 1 < right_ceiling;

        if left_len >= right_len && can_move_left {
            chosen[k - 1] -= 1;
        } else if can_move_right {
            chosen[k] += 1;
        } else if can_move_left {
            chosen[k - 1] -= 1;
        } else {
            break;
        }
    }

    for k in 1..needed {
        chosen[k] = chosen[k].max(chosen[k - 1] + 1);
    }
    chosen[needed - 1] = chosen[needed - 1].min(pool.len() - 1);
    for k in (0..needed - 1).rev() {
        chosen[k] = chosen[k].min(chosen[k + 1] - 1);
    }
}
