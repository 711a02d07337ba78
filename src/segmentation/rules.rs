/*!
 * Rule table driving the cue combiner.
 *
 * The tag sets that decide whether a cue ends in an incomplete phrase, or whether
 * the next cue continues it, are plain data so they can be tuned from the
 * configuration file without touching the combiner's control flow.
 */

use serde::{Deserialize, Serialize};

use crate::analysis::heuristic::{is_closing_mark, is_ellipsis, is_terminal_punctuation};
use crate::analysis::{Analysis, PosTag, Token};

/// Why two cues were merged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeReason {
    /// Unit ends with a word tagged as needing a complement
    TrailingPos,
    /// Unit ends with a conjunction outside the coordinating exceptions
    TrailingConjunction,
    /// Unit ends in a clause marker or preposition with no main clause
    TrailingDependency,
    /// Unit ends with an auxiliary verb phrase lacking its object
    IncompleteVerbPhrase,
    /// Unit has no terminal punctuation
    OpenEnding,
    /// Next cue opens with a lowercase function word
    LeadingContinuation,
    /// Next cue opens with a participle
    LeadingParticiple,
    /// Next cue opens with the object of the unit's last verb
    LeadingObject,
    /// Unit has no main verb yet
    NoMainVerb,
}

/// Why the current unit was closed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    TimingGap,
    SizeLimit,
    NoLinguisticContent,
    QuotedDialogue,
    SpeakerChange,
    NewSentence,
    IndependentClause,
    CompleteSentences,
    Complete,
}

/// Tag sets and switches for merge decisions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeRules {
    // @field: POS tags that leave a phrase open when they end a unit
    #[serde(default = "default_trailing_pos")]
    pub trailing_pos: Vec<PosTag>,

    // @field: Conjunctions that may end a complete unit
    #[serde(default = "default_coordinating_exceptions")]
    pub coordinating_exceptions: Vec<String>,

    // @field: Dependencies that need a main clause when they end a unit
    #[serde(default = "default_trailing_deps")]
    pub trailing_deps: Vec<String>,

    // @field: Dependencies that complete an auxiliary verb phrase
    #[serde(default = "default_object_deps")]
    pub object_deps: Vec<String>,

    // @field: POS tags of a lowercase first word that continues the unit
    #[serde(default = "default_leading_pos")]
    pub leading_pos: Vec<PosTag>,

    // @field: Fine tags of a first word that continues an open unit
    #[serde(default = "default_leading_tags")]
    pub leading_tags: Vec<String>,

    // @field: Dependencies of a first word that attach to the previous verb
    #[serde(default = "default_leading_deps")]
    pub leading_deps: Vec<String>,

    // @field: Merge whenever the unit lacks terminal punctuation
    #[serde(default = "default_true")]
    pub merge_open_endings: bool,

    // @field: Merge whenever the unit has no main verb
    #[serde(default)]
    pub merge_without_root_verb: bool,

    // @field: An ellipsis ends a sentence
    #[serde(default)]
    pub ellipsis_terminates: bool,

    #[serde(default = "default_true")]
    pub block_quoted_dialogue: bool,

    #[serde(default = "default_true")]
    pub block_dialogue_dash: bool,

    #[serde(default = "default_true")]
    pub block_capitalized_after_terminal: bool,

    #[serde(default = "default_true")]
    pub block_conjunction_after_terminal: bool,

    // @field: Keep two terminated clauses apart even when the next one continues
    #[serde(default)]
    pub block_complete_sentences: bool,
}

impl Default for MergeRules {
    fn default() -> Self {
        Self {
            trailing_pos: default_trailing_pos(),
            coordinating_exceptions: default_coordinating_exceptions(),
            trailing_deps: default_trailing_deps(),
            object_deps: default_object_deps(),
            leading_pos: default_leading_pos(),
            leading_tags: default_leading_tags(),
            leading_deps: default_leading_deps(),
            merge_open_endings: true,
            merge_without_root_verb: false,
            ellipsis_terminates: false,
            block_quoted_dialogue: true,
            block_dialogue_dash: true,
            block_capitalized_after_terminal: true,
            block_conjunction_after_terminal: true,
            block_complete_sentences: false,
        }
    }
}

impl MergeRules {
    /// Whether the analyzed text ends a sentence
    ///
    /// Closing quotes and brackets after the final mark are skipped.
    pub fn is_terminated(&self, analysis: &Analysis) -> bool {
        let Some(last) = analysis
            .tokens
            .iter()
            .rev()
            .find(|t| !is_closing_mark(&t.surface))
        else {
            return false;
        };

        if is_ellipsis(&last.surface) {
            return self.ellipsis_terminates;
        }
        is_terminal_punctuation(&last.surface) && last.sentence_boundary
    }

    /// Something that prevents merging the next cue into the unit
    pub fn blocker(
        &self,
        current: &Analysis,
        next: &Analysis,
        current_text: &str,
        next_text: &str,
        terminated: bool,
    ) -> Option<CloseReason> {
        if self.block_quoted_dialogue
            && current_text.ends_with(['"', '”', '»'])
            && next_text.starts_with(['"', '“', '«'])
        {
            return Some(CloseReason::QuotedDialogue);
        }

        if self.block_dialogue_dash && next_text.starts_with(['-', '–', '—']) {
            return Some(CloseReason::SpeakerChange);
        }

        if !terminated {
            return None;
        }

        if self.block_capitalized_after_terminal
            && next_text.chars().next().is_some_and(char::is_uppercase)
        {
            return Some(CloseReason::NewSentence);
        }

        if self.block_conjunction_after_terminal
            && next
                .first_word()
                .is_some_and(|t| self.is_coordinating(t))
        {
            return Some(CloseReason::IndependentClause);
        }

        if self.block_complete_sentences && current.has_root() && next.has_root() {
            return Some(CloseReason::CompleteSentences);
        }

        None
    }

    /// Whether the unit ends in a phrase that needs a complement
    pub fn trailing_incomplete(&self, current: &Analysis) -> Option<MergeReason> {
        let last = current.last_token()?;

        if self.trailing_pos.contains(&last.pos) {
            return Some(MergeReason::TrailingPos);
        }

        if last.pos == PosTag::Cconj && !self.is_coordinating(last) {
            return Some(MergeReason::TrailingConjunction);
        }

        if self.trailing_deps.contains(&last.dep) && !current.has_root() {
            return Some(MergeReason::TrailingDependency);
        }

        let has_aux = current.has_dep("aux");
        let has_object = current
            .tokens
            .iter()
            .any(|t| self.object_deps.contains(&t.dep));
        if last.pos == PosTag::Verb && has_aux && !has_object {
            return Some(MergeReason::IncompleteVerbPhrase);
        }

        None
    }

    /// Whether the next cue opens as a dependent of the unit
    pub fn leading_continuation(&self, next: &Analysis, terminated: bool) -> Option<MergeReason> {
        let first = next.first_token()?;

        if self.leading_pos.contains(&first.pos) && first.is_lowercase_start() {
            return Some(MergeReason::LeadingContinuation);
        }

        if terminated {
            return None;
        }

        if self.leading_tags.contains(&first.tag) {
            return Some(MergeReason::LeadingParticiple);
        }

        if self.leading_deps.contains(&first.dep) && first.is_lowercase_start() {
            return Some(MergeReason::LeadingObject);
        }

        None
    }

    fn is_coordinating(&self, token: &Token) -> bool {
        let lower = token.lower();
        self.coordinating_exceptions.iter().any(|c| *c == lower)
    }
}

fn default_trailing_pos() -> Vec<PosTag> {
    vec![PosTag::Adp, PosTag::Part, PosTag::Det]
}

fn default_coordinating_exceptions() -> Vec<String> {
    ["and", "or", "but"].iter().map(|s| s.to_string()).collect()
}

fn default_trailing_deps() -> Vec<String> {
    vec!["mark".to_string(), "prep".to_string()]
}

fn default_object_deps() -> Vec<String> {
    ["dobj", "attr", "prep"].iter().map(|s| s.to_string()).collect()
}

fn default_leading_pos() -> Vec<PosTag> {
    vec![PosTag::Adp, PosTag::Det, PosTag::Sconj]
}

fn default_leading_tags() -> Vec<String> {
    vec!["VBG".to_string(), "VBN".to_string()]
}

fn default_leading_deps() -> Vec<String> {
    ["pobj", "dobj", "attr"].iter().map(|s| s.to_string()).collect()
}

fn default_true() -> bool {
    true
}
