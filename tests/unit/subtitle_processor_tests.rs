/*!
 * Tests for SRT parsing and writing
 */

use anyhow::Result;

use subweave::subtitle_processor::{SubtitleCollection, SubtitleEntry};

use crate::common;

#[test]
fn test_parseSrtString_withDialogueFixture_shouldReadEveryCue() -> Result<()> {
    let entries = SubtitleCollection::parse_srt_string(common::DIALOGUE_SRT)?;

    assert_eq!(entries.len(), 7);
    assert_eq!(entries[0].text, "I went to");
    assert_eq!((entries[0].start_time_ms, entries[0].end_time_ms), (1000, 2500));
    assert_eq!(entries[4].text, "♪ ♪");
    assert_eq!(entries[6].seq_num, 7);
    Ok(())
}

#[test]
fn test_parseSrtString_withBomAndUnorderedBlocks_shouldOrderByOriginalIndex() -> Result<()> {
    let content = "\u{feff}7\n00:00:05,000 --> 00:00:06,000\nSecond\n\n\
                   3\n00:00:01,000 --> 00:00:02,000\nFirst\n";

    let entries = SubtitleCollection::parse_srt_string(content)?;

    let summary: Vec<_> = entries.iter().map(|e| (e.seq_num, e.text.as_str())).collect();
    assert_eq!(summary, vec![(3, "First"), (7, "Second")]);
    Ok(())
}

#[test]
fn test_parseSrtString_withRejectedCueBetween_shouldKeepSurroundingIndices() -> Result<()> {
    let content = "5\n00:00:01,000 --> 00:00:02,000\nHello\n\n\
                   6\n00:00:04,000 --> 00:00:03,000\nBackwards\n\n\
                   7\n00:00:05,000 --> 00:00:06,000\nWorld\n";

    let entries = SubtitleCollection::parse_srt_string(content)?;
    let summary: Vec<_> = entries.iter().map(|e| (e.seq_num, e.text.as_str())).collect();
    assert_eq!(summary, vec![(5, "Hello"), (7, "World")]);

    let mut collection = SubtitleCollection::new("episode.srt".into(), "en".to_string());
    collection.entries = entries;
    let written = collection.to_srt_string();
    assert!(written.starts_with("5\n00:00:01,000 --> 00:00:02,000\nHello\n"));
    assert!(written.contains("\n7\n00:00:05,000 --> 00:00:06,000\nWorld\n"));
    Ok(())
}

#[test]
fn test_writeToSrt_thenReload_shouldPreserveTextAndTiming() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let mut collection = SubtitleCollection::new(temp_dir.path().join("source.srt"), "en".to_string());
    collection.entries = vec![
        SubtitleEntry::new(1, 0, 1_500, "Line one\nline two".to_string()),
        SubtitleEntry::new(2, 3_723_004, 3_725_000, "Later".to_string()),
    ];

    let path = temp_dir.path().join("nested/out.srt");
    collection.write_to_srt(&path)?;
    let reloaded = SubtitleCollection::from_srt_file(&path, "en")?;

    assert_eq!(reloaded.entries, collection.entries);
    assert!(collection.to_srt_string().contains("01:02:03,004 --> 01:02:05,000"));
    Ok(())
}

#[test]
fn test_timestamps_shouldAcceptDotSeparatorAndFormatWithComma() -> Result<()> {
    assert_eq!(SubtitleEntry::parse_timestamp("00:01:02.345")?, 62_345);
    assert_eq!(SubtitleEntry::format_timestamp(62_345), "00:01:02,345");
    assert!(SubtitleEntry::parse_timestamp("00:01").is_err());
    Ok(())
}

#[test]
fn test_singleLineText_shouldJoinDisplayLines() {
    let entry = SubtitleEntry::new(1, 0, 1000, "  Where did\n you go? ".to_string());
    assert_eq!(entry.single_line_text(), "Where did you go?");

    let moved = entry.with_text("¿Adónde fuiste?");
    assert_eq!((moved.seq_num, moved.start_time_ms, moved.end_time_ms), (1, 0, 1000));
}
