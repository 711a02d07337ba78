/*!
 * Segmentation and realignment engine.
 *
 * - `combiner`: groups raw cues into translation units
 * - `rules`: the rule table behind merge decisions
 * - `splitter`: maps a translated unit back onto its cues
 * - `unit`: units, spans and translation outcomes
 */

pub mod combiner;
pub mod rules;
pub mod splitter;
pub mod unit;

pub use self::combiner::{CueCombiner, MergeDecision};
pub use self::rules::{CloseReason, MergeReason, MergeRules};
pub use self::splitter::{Realignment, RealignmentSplitter};
pub use self::unit::{CueSpan, FallbackReason, TranslatedUnit, TranslationUnit, UnitStatus, UNIT_SEPARATOR};
