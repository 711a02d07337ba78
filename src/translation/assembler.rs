use std::collections::HashMap;

use crate::errors::AssemblyError;
use crate::subtitle_processor::SubtitleEntry;

/// Merge the output cues of every unit back into source order
///
/// Units may complete in any order. Every source cue must come back exactly
/// once with its timing untouched.
pub fn assemble(
    source: &[SubtitleEntry],
    outputs: Vec<Vec<SubtitleEntry>>,
) -> Result<Vec<SubtitleEntry>, AssemblyError> {
    let timings: HashMap<usize, (u64, u64)> = source
        .iter()
        .map(|cue| (cue.seq_num, (cue.start_time_ms, cue.end_time_ms)))
        .collect();

    let mut by_index: HashMap<usize, SubtitleEntry> = HashMap::with_capacity(source.len());
    for cue in outputs.into_iter().flatten() {
        let Some(&(start, end)) = timings.get(&cue.seq_num) else {
            return Err(AssemblyError::UnknownCue(cue.seq_num));
        };
        if cue.start_time_ms != start || cue.end_time_ms != end {
            return Err(AssemblyError::TimingMismatch(cue.seq_num));
        }
        let seq_num = cue.seq_num;
        if by_index.insert(seq_num, cue).is_some() {
            return Err(AssemblyError::DuplicateCue(seq_num));
        }
    }

    source
        .iter()
        .map(|cue| {
            by_index
                .remove(&cue.seq_num)
                .ok_or(AssemblyError::MissingCue(cue.seq_num))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cue(seq_num: usize, text: &str) -> SubtitleEntry {
        let start = seq_num as u64 * 1000;
        SubtitleEntry::new(seq_num, start, start + 900, text.to_string())
    }

    #[test]
    fn test_assemble_withOutOfOrderUnits_shouldRestoreSourceOrder() {
        let source = vec![cue(1, "a"), cue(2, "b"), cue(3, "c")];
        let outputs = vec![vec![cue(3, "C")], vec![cue(1, "A"), cue(2, "B")]];

        let assembled = assemble(&source, outputs).unwrap();
        let texts: Vec<_> = assembled.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_assemble_withCoverageViolations_shouldFail() {
        let source = vec![cue(1, "a"), cue(2, "b")];

        assert_eq!(
            assemble(&source, vec![vec![cue(1, "A")]]),
            Err(AssemblyError::MissingCue(2))
        );
        assert_eq!(
            assemble(&source, vec![vec![cue(1, "A"), cue(1, "A")], vec![cue(2, "B")]]),
            Err(AssemblyError::DuplicateCue(1))
        );
        assert_eq!(
            assemble(&source, vec![vec![cue(1, "A"), cue(2, "B"), cue(7, "?")]]),
            Err(AssemblyError::UnknownCue(7))
        );
    }

    #[test]
    fn test_assemble_withShiftedTiming_shouldFail() {
        let source = vec![cue(1, "a")];
        let mut moved = cue(1, "A");
        moved.end_time_ms += 1;

        assert_eq!(assemble(&source, vec![vec![moved]]), Err(AssemblyError::TimingMismatch(1)));
    }
}
