/*!
 * Benchmarks for segmentation and realignment.
 *
 * Measures performance of:
 * - Heuristic analysis of cue text
 * - Combining cues into translation units
 * - Splitting translated units back onto their cues
 */

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use subweave::analysis::HeuristicAnalyzer;
use subweave::app_config::SegmentationConfig;
use subweave::segmentation::{CueCombiner, RealignmentSplitter, TranslatedUnit, TranslationUnit};
use subweave::subtitle_processor::SubtitleEntry;

/// Generate test subtitle entries with sentences running across cues.
fn generate_entries(count: usize) -> Vec<SubtitleEntry> {
    let texts = [
        "Hello, how are you",
        "today?",
        "I went to",
        "the store, but it was",
        "closed.",
        "Did you see the news this morning?",
        "No, I haven't had time to",
        "check.",
        "Well, it's a long story...",
        "Let me explain everything.",
    ];

    (0..count)
        .map(|i| {
            let text = texts[i % texts.len()];
            SubtitleEntry::new(i + 1, (i as u64) * 2000, (i as u64) * 2000 + 1800, text.to_string())
        })
        .collect()
}

fn bench_analyze(c: &mut Criterion) {
    let analyzer = HeuristicAnalyzer::new();
    let text = "It was closed, so I walked all the way home. Mr. Smith said \"Hello!\" to New York.";

    c.bench_function("heuristic_analyze", |b| {
        b.iter(|| black_box(analyzer.analyze_text(black_box(text))))
    });
}

fn bench_combine(c: &mut Criterion) {
    let mut group = c.benchmark_group("combine");
    let analyzer = HeuristicAnalyzer::new();
    let config = SegmentationConfig::default();

    for size in [10, 100, 1000].iter() {
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let entries = generate_entries(size);
            let combiner = CueCombiner::new(&analyzer, &config);
            b.iter(|| black_box(combiner.combine(&entries)));
        });
    }

    group.finish();
}

fn bench_split(c: &mut Criterion) {
    let mut group = c.benchmark_group("split");
    let analyzer = HeuristicAnalyzer::new();
    let splitter = RealignmentSplitter::new(&analyzer, "es");

    let cases = [
        ("two_cues", 2, "Fui a la tienda, pero estaba cerrada."),
        ("four_cues", 4, "Hola, ¿cómo estás hoy? Fui a la tienda, pero estaba cerrada."),
        ("cjk", 3, "你好，你今天怎么样？我去了商店，但是关门了。"),
    ];

    for (name, cue_count, translation) in cases {
        let unit = TranslationUnit::from_cues(generate_entries(cue_count));
        let translated = TranslatedUnit::translated(unit, translation.to_string(), 1);
        group.bench_function(name, |b| b.iter(|| black_box(splitter.split(&translated))));
    }

    group.finish();
}

criterion_group!(benches, bench_analyze, bench_combine, bench_split);
criterion_main!(benches);
