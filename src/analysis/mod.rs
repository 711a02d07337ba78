/*!
 * Linguistic analysis capability.
 *
 * The segmentation engine only depends on the shape of an analysis: tokens with
 * part-of-speech tags, dependency labels, sentence boundaries and byte offsets.
 * Two analyzers provide it:
 *
 * - `HeuristicAnalyzer`: rule-based tokenizer and closed-class tagger, always available
 * - `FullAnalyzer`: delegates to an external statistical model through a command
 */

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::str::FromStr;
use std::sync::Arc;

use crate::errors::AnalysisError;

pub mod external;
pub mod heuristic;

pub use self::external::FullAnalyzer;
pub use self::heuristic::HeuristicAnalyzer;

/// Universal part-of-speech tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PosTag {
    Adj,
    Adp,
    Adv,
    Aux,
    Cconj,
    Det,
    Intj,
    Noun,
    Num,
    Part,
    Pron,
    Propn,
    Punct,
    Sconj,
    Sym,
    Verb,
    #[serde(other)]
    X,
}

impl FromStr for PosTag {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_uppercase().as_str() {
            "ADJ" => Self::Adj,
            "ADP" => Self::Adp,
            "ADV" => Self::Adv,
            "AUX" => Self::Aux,
            "CCONJ" | "CONJ" => Self::Cconj,
            "DET" => Self::Det,
            "INTJ" => Self::Intj,
            "NOUN" => Self::Noun,
            "NUM" => Self::Num,
            "PART" => Self::Part,
            "PRON" => Self::Pron,
            "PROPN" => Self::Propn,
            "PUNCT" => Self::Punct,
            "SCONJ" => Self::Sconj,
            "SYM" => Self::Sym,
            "VERB" => Self::Verb,
            _ => Self::X,
        })
    }
}

/// Position of a token inside a named entity (IOB scheme)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EntityIob {
    #[default]
    Outside,
    Begin,
    Inside,
}

impl EntityIob {
    /// Parse the single-letter IOB marker used by most NLP toolkits
    pub fn from_marker(marker: &str) -> Self {
        match marker.trim() {
            "B" => Self::Begin,
            "I" => Self::Inside,
            _ => Self::Outside,
        }
    }
}

/// One analyzed token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    /// Text of the token as it appears in the input
    pub surface: String,
    /// Coarse part-of-speech tag
    pub pos: PosTag,
    /// Fine-grained tag (Penn style, e.g. VBG), empty if unknown
    pub tag: String,
    /// Dependency label (e.g. ROOT, prep, mark)
    pub dep: String,
    /// Index of the syntactic head within the same analysis
    pub head: Option<usize>,
    /// Whether a sentence ends with this token
    pub sentence_boundary: bool,
    /// Byte offset of the token in the analyzed text
    pub offset: usize,
    /// Named entity position
    pub entity: EntityIob,
}

impl Token {
    /// Byte offset just past the token
    pub fn end(&self) -> usize {
        self.offset + self.surface.len()
    }

    /// Whether the token carries linguistic content (not punctuation or symbols)
    pub fn is_word(&self) -> bool {
        !matches!(self.pos, PosTag::Punct | PosTag::Sym)
            && self.surface.chars().any(char::is_alphanumeric)
    }

    pub fn lower(&self) -> String {
        self.surface.to_lowercase()
    }

    /// Whether the token starts with an uppercase letter
    pub fn is_capitalized(&self) -> bool {
        self.surface.chars().next().is_some_and(char::is_uppercase)
    }

    /// Whether the token starts with a lowercase letter
    pub fn is_lowercase_start(&self) -> bool {
        self.surface.chars().next().is_some_and(char::is_lowercase)
    }
}

/// Result of analyzing one text
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub tokens: Vec<Token>,
}

impl Analysis {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens }
    }

    /// True when no token carries linguistic content
    pub fn has_no_words(&self) -> bool {
        !self.tokens.iter().any(Token::is_word)
    }

    pub fn first_token(&self) -> Option<&Token> {
        self.tokens.first()
    }

    pub fn last_token(&self) -> Option<&Token> {
        self.tokens.last()
    }

    /// First token with linguistic content
    pub fn first_word(&self) -> Option<&Token> {
        self.tokens.iter().find(|t| t.is_word())
    }

    /// Last token with linguistic content
    pub fn last_word(&self) -> Option<&Token> {
        self.tokens.iter().rev().find(|t| t.is_word())
    }

    pub fn has_dep(&self, dep: &str) -> bool {
        self.tokens.iter().any(|t| t.dep == dep)
    }

    pub fn has_root(&self) -> bool {
        self.has_dep("ROOT")
    }

    /// Whether some sentence is headed by a full verb
    pub fn has_root_verb(&self) -> bool {
        self.tokens
            .iter()
            .any(|t| t.dep == "ROOT" && t.pos == PosTag::Verb)
    }
}

/// A capability that turns text into tokens with linguistic annotations
pub trait LinguisticAnalyzer: Send + Sync + Debug {
    /// Analyze a piece of text
    fn analyze(&self, text: &str) -> Result<Analysis, AnalysisError>;

    /// Short name used in logs
    fn name(&self) -> &str;

    /// Whether the analyzer understands text in the given language
    fn supports_language(&self, _language: &str) -> bool {
        true
    }

    /// Analyze texts ahead of use so later calls are answered from a cache
    fn prefetch(&self, _texts: &[&str]) {}

    /// Owned handle for analyzers whose calls block, so async callers can run
    /// them on a blocking thread
    fn blocking_handle(&self) -> Option<Arc<dyn LinguisticAnalyzer>> {
        None
    }
}

/// The analyzer selected by configuration
#[derive(Debug)]
pub enum Analyzer {
    /// External statistical model
    Full(FullAnalyzer),
    /// Built-in rule-based analyzer
    Heuristic(HeuristicAnalyzer),
}

impl LinguisticAnalyzer for Analyzer {
    fn analyze(&self, text: &str) -> Result<Analysis, AnalysisError> {
        match self {
            Self::Full(analyzer) => analyzer.analyze(text),
            Self::Heuristic(analyzer) => analyzer.analyze(text),
        }
    }

    fn name(&self) -> &str {
        match self {
            Self::Full(analyzer) => analyzer.name(),
            Self::Heuristic(analyzer) => analyzer.name(),
        }
    }

    fn supports_language(&self, language: &str) -> bool {
        match self {
            Self::Full(analyzer) => analyzer.supports_language(language),
            Self::Heuristic(analyzer) => analyzer.supports_language(language),
        }
    }

    fn prefetch(&self, texts: &[&str]) {
        match self {
            Self::Full(analyzer) => analyzer.prefetch(texts),
            Self::Heuristic(analyzer) => analyzer.prefetch(texts),
        }
    }

    fn blocking_handle(&self) -> Option<Arc<dyn LinguisticAnalyzer>> {
        match self {
            Self::Full(analyzer) => analyzer.blocking_handle(),
            Self::Heuristic(analyzer) => analyzer.blocking_handle(),
        }
    }
}

/// Analyze text, degrading to the heuristic analyzer when the given one fails
pub fn analyze_with_fallback(analyzer: &dyn LinguisticAnalyzer, text: &str) -> Analysis {
    or_heuristic(analyzer, text, analyzer.analyze(text))
}

/// Same as `analyze_with_fallback`, moving blocking analyzers off the async runtime
pub async fn analyze_with_fallback_async(analyzer: &dyn LinguisticAnalyzer, text: &str) -> Analysis {
    let result = match analyzer.blocking_handle() {
        Some(handle) => {
            let owned = text.to_string();
            tokio::task::spawn_blocking(move || handle.analyze(&owned))
                .await
                .unwrap_or_else(|e| Err(AnalysisError::CommandFailed(format!("analysis task failed: {}", e))))
        }
        None => analyzer.analyze(text),
    };
    or_heuristic(analyzer, text, result)
}

fn or_heuristic(
    analyzer: &dyn LinguisticAnalyzer,
    text: &str,
    result: Result<Analysis, AnalysisError>,
) -> Analysis {
    match result {
        Ok(analysis) => analysis,
        Err(AnalysisError::Unavailable(_)) => HeuristicAnalyzer::default().analyze_text(text),
        Err(e @ AnalysisError::InvalidOutput(_)) => {
            warn!("{} analyzer gave unusable output, using heuristics: {}", analyzer.name(), e);
            HeuristicAnalyzer::default().analyze_text(text)
        }
        Err(e) => {
            debug!("{} analyzer failed, using heuristics: {}", analyzer.name(), e);
            HeuristicAnalyzer::default().analyze_text(text)
        }
    }
}
