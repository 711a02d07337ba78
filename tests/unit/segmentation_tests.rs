/*!
 * Invariant tests for cue combination and realignment
 */

use anyhow::Result;

use subweave::analysis::HeuristicAnalyzer;
use subweave::app_config::SegmentationConfig;
use subweave::segmentation::{CueCombiner, RealignmentSplitter, TranslatedUnit, TranslationUnit};
use subweave::subtitle_processor::{SubtitleCollection, SubtitleEntry};

use crate::common::{self, cue};

fn dialogue() -> Result<Vec<SubtitleEntry>> {
    Ok(SubtitleCollection::parse_srt_string(common::DIALOGUE_SRT)?)
}

fn unit_sizes(units: &[TranslationUnit]) -> Vec<usize> {
    units.iter().map(TranslationUnit::len).collect()
}

#[test]
fn test_combine_withDialogue_shouldGroupSentences() -> Result<()> {
    let config = SegmentationConfig::default();
    let units = CueCombiner::new(&HeuristicAnalyzer, &config).combine(&dialogue()?);

    assert_eq!(unit_sizes(&units), vec![2, 2, 1, 1, 1]);
    assert_eq!(units[0].combined_text, "I went to the store.");
    assert_eq!(units[1].combined_text, "It was closed, so I walked all the way home.");
    Ok(())
}

#[test]
fn test_combine_shouldPartitionCuesInOrder() -> Result<()> {
    let cues = dialogue()?;
    for max_unit_cues in [None, Some(1), Some(2)] {
        let config = SegmentationConfig {
            max_unit_cues,
            ..SegmentationConfig::default()
        };
        let units = CueCombiner::new(&HeuristicAnalyzer, &config).combine(&cues);

        let flattened: Vec<SubtitleEntry> = units.iter().flat_map(|u| u.cues.clone()).collect();
        assert_eq!(flattened, cues);
        assert!(units.iter().all(|u| !u.is_empty()));
        if let Some(limit) = max_unit_cues {
            assert!(units.iter().all(|u| u.len() <= limit));
        }
    }
    Ok(())
}

#[test]
fn test_combine_withSameInput_shouldBeDeterministic() -> Result<()> {
    let cues = dialogue()?;
    let config = SegmentationConfig::default();
    let combiner = CueCombiner::new(&HeuristicAnalyzer, &config);

    assert_eq!(combiner.combine(&cues), combiner.combine(&cues));
    Ok(())
}

#[test]
fn test_combine_withLongPause_shouldHonorGapLimit() {
    let cues = vec![
        cue(1, 8_000, 10_000, "I looked at him and"),
        cue(2, 25_000, 27_000, "the man smiled."),
    ];

    let strict = SegmentationConfig {
        max_gap_seconds: Some(5.0),
        ..SegmentationConfig::default()
    };
    let units = CueCombiner::new(&HeuristicAnalyzer, &strict).combine(&cues);
    assert_eq!(unit_sizes(&units), vec![1, 1]);

    let unlimited = SegmentationConfig {
        max_gap_seconds: None,
        ..SegmentationConfig::default()
    };
    let units = CueCombiner::new(&HeuristicAnalyzer, &unlimited).combine(&cues);
    assert_eq!(unit_sizes(&units), vec![2]);
}

#[test]
fn test_combine_withEmptyInput_shouldProduceNoUnits() {
    let config = SegmentationConfig::default();
    assert!(CueCombiner::new(&HeuristicAnalyzer, &config).combine(&[]).is_empty());
}

#[test]
fn test_split_withStoreScenario_shouldKeepTimingsAndText() -> Result<()> {
    let unit = TranslationUnit::from_cues(vec![
        cue(1, 1_000, 2_500, "I went to"),
        cue(2, 2_600, 4_000, "the store."),
    ]);
    let translated = TranslatedUnit::translated(unit.clone(), "Fui a la tienda.".to_string(), 1);

    let realignment = RealignmentSplitter::new(&HeuristicAnalyzer, "es").split(&translated)?;

    assert_eq!(realignment.joined_text(), "Fui a la tienda.");
    assert_eq!(realignment.cues.len(), 2);
    for (out, src) in realignment.cues.iter().zip(&unit.cues) {
        assert_eq!(out.seq_num, src.seq_num);
        assert_eq!((out.start_time_ms, out.end_time_ms), (src.start_time_ms, src.end_time_ms));
        assert!(!out.text.is_empty());
    }
    Ok(())
}

#[test]
fn test_split_withVariedTranslations_shouldAlwaysPartitionTheText() -> Result<()> {
    let unit = TranslationUnit::from_cues(vec![
        cue(1, 0, 1_000, "It was closed,"),
        cue(2, 1_000, 2_000, "so I walked"),
        cue(3, 2_000, 3_000, "all the way home."),
    ]);
    let translations = [
        "Estaba cerrada, así que caminé todo el camino a casa.",
        "Cerrado, sí. Caminé.",
        "店关门了，所以我走回家了。",
        "Fermé, alors je suis rentré à pied jusqu'à la maison.",
    ];

    let splitter = RealignmentSplitter::new(&HeuristicAnalyzer, "es");
    for text in translations {
        let translated = TranslatedUnit::translated(unit.clone(), text.to_string(), 1);
        let realignment = splitter.split(&translated)?;

        assert_eq!(realignment.joined_text(), text, "pieces of {:?}", text);
        assert_eq!(realignment.pieces.len(), 3);
        assert!(realignment.pieces.iter().all(|p| !p.is_empty()), "empty piece in {:?}", realignment.pieces);
        assert!(realignment.separators.iter().all(|s| s.trim().is_empty()));
    }
    Ok(())
}

#[test]
fn test_split_withUnchangedText_shouldBeIdentity() -> Result<()> {
    let unit = TranslationUnit::from_cues(vec![
        cue(1, 0, 1_000, "Line\none"),
        cue(2, 1_000, 2_000, "two"),
    ]);
    let translated = TranslatedUnit::translated(unit.clone(), unit.combined_text.clone(), 1);

    let realignment = RealignmentSplitter::new(&HeuristicAnalyzer, "en").split(&translated)?;

    assert_eq!(realignment.cues, unit.cues);
    Ok(())
}
