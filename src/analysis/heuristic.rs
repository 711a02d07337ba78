use once_cell::sync::Lazy;
use regex::Regex;

use super::{Analysis, EntityIob, LinguisticAnalyzer, PosTag, Token};
use crate::errors::AnalysisError;

// @module: Rule-based analyzer used when no statistical model is available

// Words (with inner apostrophes), ellipsis runs and single punctuation marks
static TOKEN_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\w+(?:['’]\w+)*|\.{2,}|[^\w\s]").expect("token regex is valid")
});

const TERMINAL_PUNCTUATION: &[&str] = &[".", "!", "?", "。", "！", "？", "‼", "⁇", "؟"];

const CLOSING_MARKS: &[&str] = &["\"", "'", "”", "’", "»", ")", "]", "」", "』", "）"];

const OPENING_MARKS: &[&str] = &["\"", "'", "“", "‘", "«", "(", "[", "「", "『", "（"];

const ABBREVIATIONS: &[&str] = &["mr", "mrs", "ms", "dr", "st", "jr", "sr", "vs", "etc", "prof", "mt"];

/// Whether a token ends a sentence on its own
pub fn is_terminal_punctuation(surface: &str) -> bool {
    TERMINAL_PUNCTUATION.contains(&surface)
}

/// Whether a token is an ellipsis (`…` or two or more dots)
pub fn is_ellipsis(surface: &str) -> bool {
    surface == "…" || (surface.len() >= 2 && surface.chars().all(|c| c == '.'))
}

pub fn is_closing_mark(surface: &str) -> bool {
    CLOSING_MARKS.contains(&surface)
}

pub fn is_opening_mark(surface: &str) -> bool {
    OPENING_MARKS.contains(&surface)
}

/// Tokenizer and closed-class tagger for English-like text
///
/// Tokens of other languages still get offsets and punctuation-based sentence
/// boundaries, which is all the splitter needs from them.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicAnalyzer;

impl HeuristicAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Analyze text; this never fails
    pub fn analyze_text(&self, text: &str) -> Analysis {
        let mut tokens: Vec<Token> = tokenize(text)
            .into_iter()
            .map(|(offset, surface)| Token {
                surface: surface.to_string(),
                pos: PosTag::X,
                tag: String::new(),
                dep: String::new(),
                head: None,
                sentence_boundary: false,
                offset,
                entity: EntityIob::Outside,
            })
            .collect();

        mark_sentence_boundaries(text, &mut tokens);
        tag_parts_of_speech(&mut tokens);
        mark_entities(&mut tokens);
        assign_dependencies(&mut tokens);

        Analysis::new(tokens)
    }
}

impl LinguisticAnalyzer for HeuristicAnalyzer {
    fn analyze(&self, text: &str) -> Result<Analysis, AnalysisError> {
        Ok(self.analyze_text(text))
    }

    fn name(&self) -> &str {
        "heuristic"
    }
}

fn tokenize(text: &str) -> Vec<(usize, &str)> {
    let mut pieces = Vec::new();
    for m in TOKEN_REGEX.find_iter(text) {
        let surface = m.as_str();
        match clitic_split(surface) {
            Some(at) => {
                pieces.push((m.start(), &surface[..at]));
                pieces.push((m.start() + at, &surface[at..]));
            }
            None => pieces.push((m.start(), surface)),
        }
    }
    pieces
}

/// Byte position where a contraction splits ("do|n't", "I|'m")
fn clitic_split(word: &str) -> Option<usize> {
    for suffix in ["n't", "n’t"] {
        if word.len() > suffix.len() {
            let cut = word.len() - suffix.len();
            if word.is_char_boundary(cut) && word[cut..].eq_ignore_ascii_case(suffix) {
                return Some(cut);
            }
        }
    }

    let apostrophe = word.rfind(['\'', '’'])?;
    (apostrophe > 0).then_some(apostrophe)
}

fn mark_sentence_boundaries(text: &str, tokens: &mut [Token]) {
    for i in 0..tokens.len() {
        let surface = tokens[i].surface.as_str();

        if is_terminal_punctuation(surface) {
            // "3.5" or "U.S" keep going
            let glued = surface == "."
                && text[tokens[i].end()..]
                    .chars()
                    .next()
                    .is_some_and(char::is_alphanumeric);
            let abbreviation = surface == "."
                && i > 0
                && tokens[i - 1].end() == tokens[i].offset
                && ABBREVIATIONS.contains(&tokens[i - 1].lower().as_str());
            tokens[i].sentence_boundary = !glued && !abbreviation;
        } else if is_closing_mark(surface)
            && i > 0
            && tokens[i - 1].sentence_boundary
            && tokens[i - 1].end() == tokens[i].offset
        {
            tokens[i].sentence_boundary = true;
        }
    }
}

fn closed_class(word: &str) -> Option<(PosTag, &'static str)> {
    let entry = match word {
        "the" | "a" | "an" | "this" | "these" | "those" | "my" | "your" | "his" | "its"
        | "our" | "their" | "some" | "any" | "no" | "every" | "each" | "another" | "either"
        | "neither" => (PosTag::Det, "DT"),
        "to" | "of" | "in" | "on" | "at" | "by" | "for" | "with" | "about" | "against"
        | "between" | "into" | "through" | "during" | "before" | "after" | "above" | "below"
        | "from" | "up" | "down" | "out" | "off" | "over" | "under" | "around" | "near"
        | "without" | "within" | "along" | "across" | "behind" | "beyond" | "toward"
        | "towards" | "upon" | "among" | "like" | "than" => (PosTag::Adp, "IN"),
        "not" | "n't" | "n’t" => (PosTag::Part, "RB"),
        "and" | "or" | "but" | "nor" | "yet" | "plus" => (PosTag::Cconj, "CC"),
        "because" | "although" | "though" | "while" | "if" | "unless" | "since" | "whereas"
        | "whether" | "until" | "till" | "that" | "when" | "once" => (PosTag::Sconj, "IN"),
        "i" | "you" | "he" | "she" | "it" | "we" | "they" | "me" | "him" | "her" | "us"
        | "them" | "myself" | "yourself" | "himself" | "herself" | "itself" | "ourselves"
        | "themselves" | "what" | "who" | "whom" | "something" | "anything" | "nothing"
        | "everything" | "someone" | "anyone" | "everyone" | "nobody" | "mine" | "yours" => {
            (PosTag::Pron, "PRP")
        }
        "am" | "is" | "are" | "was" | "were" | "be" | "been" | "being" | "have" | "has"
        | "had" | "do" | "does" | "did" | "will" | "would" | "shall" | "should" | "can"
        | "could" | "may" | "might" | "must" | "ca" | "wo" | "'s" | "'re" | "'m" | "'ve"
        | "'ll" | "'d" | "’s" | "’re" | "’m" | "’ve" | "’ll" | "’d" => (PosTag::Aux, "MD"),
        "oh" | "hey" | "hi" | "hello" | "yes" | "yeah" | "okay" | "ok" | "wow" | "please"
        | "thanks" | "bye" | "huh" | "uh" | "um" => (PosTag::Intj, "UH"),
        "very" | "really" | "just" | "now" | "then" | "here" | "there" | "too" | "also"
        | "always" | "never" | "still" | "already" | "again" | "maybe" | "so" | "even"
        | "soon" | "away" | "back" | "where" | "why" | "how" => (PosTag::Adv, "RB"),
        "go" | "went" | "gone" | "come" | "came" | "get" | "got" | "know" | "knew" | "think"
        | "thought" | "see" | "saw" | "want" | "say" | "said" | "tell" | "told" | "make"
        | "made" | "take" | "took" | "give" | "gave" | "look" | "need" | "love" | "feel"
        | "felt" | "let" | "mean" | "meant" | "try" | "keep" | "kept" | "leave" | "left"
        | "find" | "found" | "put" | "call" | "run" | "ran" | "help" | "wait" | "stop"
        | "believe" | "remember" | "understand" | "talk" | "happen" | "work" | "live"
        | "die" | "kill" | "stay" | "listen" | "hear" | "heard" | "speak" | "ask" | "bring"
        | "brought" | "eat" | "ate" | "sleep" | "slept" | "play" | "move" | "turn" | "show"
        | "start" | "open" | "close" | "read" | "write" | "wrote" | "sit" | "sat" | "stand"
        | "stood" | "buy" | "bought" | "pay" | "paid" | "meet" | "met" | "lose" | "lost"
        | "win" | "won" | "walk" | "sing" | "sang" | "fall" | "fell" => (PosTag::Verb, "VB"),
        _ => return None,
    };
    Some(entry)
}

fn classify(surface: &str, sentence_start: bool) -> (PosTag, &'static str) {
    if !surface.chars().any(char::is_alphanumeric) {
        if surface.chars().all(|c| "$%&#@+=*/\\<>|~^€£¥".contains(c)) {
            return (PosTag::Sym, "SYM");
        }
        let tag = if is_terminal_punctuation(surface) {
            "."
        } else if surface == "," {
            ","
        } else {
            ":"
        };
        return (PosTag::Punct, tag);
    }

    if surface.chars().all(|c| c.is_ascii_digit()) {
        return (PosTag::Num, "CD");
    }

    let lower = surface.to_lowercase();
    if let Some(entry) = closed_class(&lower) {
        return entry;
    }

    let length = lower.chars().count();
    if length > 4 && lower.ends_with("ing") {
        (PosTag::Verb, "VBG")
    } else if length > 3 && lower.ends_with("ed") {
        (PosTag::Verb, "VBN")
    } else if length > 3 && lower.ends_with("ly") {
        (PosTag::Adv, "RB")
    } else if !sentence_start && surface.chars().next().is_some_and(char::is_uppercase) {
        (PosTag::Propn, "NNP")
    } else {
        (PosTag::Noun, "NN")
    }
}

fn tag_parts_of_speech(tokens: &mut [Token]) {
    let mut sentence_start = true;
    for token in tokens.iter_mut() {
        let (pos, tag) = classify(&token.surface, sentence_start);
        token.pos = pos;
        token.tag = tag.to_string();

        if token.sentence_boundary {
            sentence_start = true;
        } else if token.is_word() {
            sentence_start = false;
        }
    }

    // "to" before a verb is the infinitive marker
    for i in 0..tokens.len() {
        if tokens[i].lower() != "to" {
            continue;
        }
        let next_is_verb = tokens[i + 1..]
            .iter()
            .find(|t| t.is_word())
            .is_some_and(|t| matches!(t.pos, PosTag::Verb | PosTag::Aux));
        if next_is_verb {
            tokens[i].pos = PosTag::Part;
            tokens[i].tag = "TO".to_string();
        }
    }
}

/// Runs of proper nouns become entities; a capitalized unknown word at the start
/// of a sentence joins the run that follows it ("New York")
fn mark_entities(tokens: &mut [Token]) {
    for i in 0..tokens.len().saturating_sub(1) {
        if tokens[i].pos == PosTag::Noun
            && tokens[i].is_capitalized()
            && tokens[i + 1].pos == PosTag::Propn
        {
            tokens[i].pos = PosTag::Propn;
            tokens[i].tag = "NNP".to_string();
        }
    }

    let mut in_entity = false;
    for token in tokens.iter_mut() {
        if token.pos == PosTag::Propn {
            token.entity = if in_entity {
                EntityIob::Inside
            } else {
                EntityIob::Begin
            };
            in_entity = true;
        } else {
            in_entity = false;
        }
    }
}

fn sentence_ranges(tokens: &[Token]) -> Vec<std::ops::Range<usize>> {
    let mut ranges = Vec::new();
    let mut start = 0;
    for i in 0..tokens.len() {
        let ends_here = tokens[i].sentence_boundary
            && tokens.get(i + 1).is_none_or(|next| !next.sentence_boundary);
        if ends_here {
            ranges.push(start..i + 1);
            start = i + 1;
        }
    }
    if start < tokens.len() {
        ranges.push(start..tokens.len());
    }
    ranges
}

fn assign_dependencies(tokens: &mut [Token]) {
    for range in sentence_ranges(tokens) {
        let root = range
            .clone()
            .find(|&i| tokens[i].pos == PosTag::Verb)
            .or_else(|| range.clone().find(|&i| tokens[i].pos == PosTag::Aux))
            .or_else(|| range.clone().find(|&i| tokens[i].is_word()));
        let root_pos = root.map(|r| tokens[r].pos);

        let mut previous_word: Option<usize> = None;
        for i in range {
            let mut head = root;
            let dep = if Some(i) == root {
                "ROOT"
            } else {
                match tokens[i].pos {
                    PosTag::Noun | PosTag::Pron | PosTag::Propn => {
                        match previous_word {
                            Some(prev) if tokens[prev].pos == PosTag::Adp => {
                                head = Some(prev);
                                "pobj"
                            }
                            _ if root.is_none_or(|r| i < r) => "nsubj",
                            _ if root_pos == Some(PosTag::Aux) => "attr",
                            _ => "dobj",
                        }
                    }
                    PosTag::Adj => {
                        if root_pos == Some(PosTag::Aux) && root.is_some_and(|r| i > r) {
                            "acomp"
                        } else {
                            "amod"
                        }
                    }
                    PosTag::Verb => "xcomp",
                    PosTag::Aux => "aux",
                    PosTag::Part if tokens[i].tag == "TO" => "aux",
                    PosTag::Part => "neg",
                    PosTag::Adp => "prep",
                    PosTag::Det => "det",
                    PosTag::Cconj => "cc",
                    PosTag::Sconj => "mark",
                    PosTag::Adv => "advmod",
                    PosTag::Intj => "intj",
                    PosTag::Num => "nummod",
                    PosTag::Punct | PosTag::Sym => "punct",
                    PosTag::X => "dep",
                }
            };

            tokens[i].dep = dep.to_string();
            tokens[i].head = head.or(Some(i));
            if tokens[i].is_word() {
                previous_word = Some(i);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn surfaces(analysis: &Analysis) -> Vec<&str> {
        analysis.tokens.iter().map(|t| t.surface.as_str()).collect()
    }

    #[test]
    fn test_analyze_withContraction_shouldSplitClitic() {
        let analysis = HeuristicAnalyzer.analyze_text("I don't know.");
        assert_eq!(surfaces(&analysis), vec!["I", "do", "n't", "know", "."]);
        assert_eq!(analysis.tokens[2].pos, PosTag::Part);
        assert_eq!(analysis.tokens[3].dep, "ROOT");
    }

    #[test]
    fn test_analyze_withOffsets_shouldPointIntoText() {
        let text = "Wait… ¿Qué pasa?";
        let analysis = HeuristicAnalyzer.analyze_text(text);
        for token in &analysis.tokens {
            assert_eq!(&text[token.offset..token.end()], token.surface);
        }
    }

    #[test]
    fn test_analyze_withDecimalAndAbbreviation_shouldNotBreakSentence() {
        let analysis = HeuristicAnalyzer.analyze_text("Mr. Smith paid 3.5 dollars.");
        let boundaries: Vec<&str> = analysis
            .tokens
            .iter()
            .filter(|t| t.sentence_boundary)
            .map(|t| t.surface.as_str())
            .collect();
        assert_eq!(boundaries, vec!["."]);
        assert_eq!(analysis.tokens.last().map(|t| t.sentence_boundary), Some(true));
    }

    #[test]
    fn test_analyze_withClosingQuote_shouldExtendBoundary() {
        let analysis = HeuristicAnalyzer.analyze_text("He said \"go.\" Then left");
        let quote = analysis.tokens.iter().find(|t| t.surface == "\"" && t.offset > 9);
        assert!(quote.is_some_and(|t| t.sentence_boundary));
    }

    #[test]
    fn test_analyze_withInfinitive_shouldTagPart() {
        let analysis = HeuristicAnalyzer.analyze_text("I want to go");
        assert_eq!(analysis.tokens[2].pos, PosTag::Part);

        let analysis = HeuristicAnalyzer.analyze_text("I went to");
        assert_eq!(analysis.tokens[2].pos, PosTag::Adp);
        assert_eq!(analysis.tokens[2].dep, "prep");
        assert!(analysis.has_root_verb());
    }

    #[test]
    fn test_analyze_withCapitalizedRun_shouldMarkEntity() {
        let analysis = HeuristicAnalyzer.analyze_text("We flew to New York yesterday");
        let new = &analysis.tokens[3];
        let york = &analysis.tokens[4];
        assert_eq!(new.entity, EntityIob::Begin);
        assert_eq!(york.entity, EntityIob::Inside);
        assert_eq!(analysis.tokens[5].entity, EntityIob::Outside);
    }

    #[test]
    fn test_analyze_withCjkText_shouldMarkCjkBoundaries() {
        let analysis = HeuristicAnalyzer.analyze_text("我去了商店。然后回家");
        assert!(analysis.tokens.iter().any(|t| t.surface == "。" && t.sentence_boundary));
        assert!(!analysis.has_no_words());
    }
}
