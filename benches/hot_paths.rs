//! Performance benchmarks for cs hot paths.
//!
//! Measures the core operations that dominate runtime:
//! - Fuzzy expansion at distance 1 and 2
//! - Literal and case-folded matching over file content
//! - Highlighting and snippet extraction
//! - A full pipeline run over a temporary tree
//!
//! Run with: `cargo bench`
//! View reports: `open target/criterion/report/index.html`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use cs::services::fuzzy::expand;
use cs::services::matcher::{LiteralFinder, MatchEngine, MatchWorker, QueryPlan};
use cs::services::PipelineStats;
use cs::snippet::{extract_snippet, highlight};
use cs::{
    parse_arguments, CancelToken, FileJob, MatchSpan, SearchConfig, SearchService, WalkConfig,
};
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

/// Realistic source text, repeated to `copies` functions.
fn source_text(copies: usize) -> String {
    (0..copies)
        .map(|i| {
            format!(
                r#"
fn authenticate_user_{i}(config: &Config) -> Result<User, AuthError> {{
    let credentials = config.credentials();
    validate_credentials(&credentials)?;
    Ok(User::new("authenticated_user"))
}}
"#
            )
        })
        .collect()
}

// ============================================================================
// Fuzzy Expansion Benchmarks
// ============================================================================

/// Benchmarks expansion for terms of increasing length.
///
/// Distance 2 grows quadratically with term length, which is why the
/// expansion is computed once per run.
fn bench_fuzzy_expand(c: &mut Criterion) {
    let mut group = c.benchmark_group("fuzzy_expand");

    for term in ["cfg", "config", "authenticate"] {
        group.bench_with_input(BenchmarkId::new("distance_1", term), term, |b, term| {
            b.iter(|| black_box(expand(term, 1)))
        });
    }

    for term in ["cfg", "config"] {
        group.bench_with_input(BenchmarkId::new("distance_2", term), term, |b, term| {
            b.iter(|| black_box(expand(term, 2)))
        });
    }

    group.finish();
}

// ============================================================================
// Matching Benchmarks
// ============================================================================

/// Benchmarks a single literal over content of increasing size.
fn bench_literal_matching(c: &mut Criterion) {
    let mut group = c.benchmark_group("literal_matching");

    for copies in [10, 100, 1_000] {
        let content = source_text(copies);
        group.throughput(Throughput::Bytes(content.len() as u64));

        let exact = LiteralFinder::new("credentials", true);
        group.bench_with_input(BenchmarkId::new("exact", copies), &content, |b, content| {
            b.iter(|| black_box(exact.find_all(content.as_bytes(), 0)))
        });

        let folded = LiteralFinder::new("Credentials", false);
        group.bench_with_input(BenchmarkId::new("ascii_fold", copies), &content, |b, content| {
            b.iter(|| black_box(folded.find_all(content.as_bytes(), 0)))
        });
    }

    group.finish();
}

/// Benchmarks whole-file evaluation for each term kind.
fn bench_term_evaluation(c: &mut Criterion) {
    let mut group = c.benchmark_group("term_evaluation");
    let content = source_text(200).into_bytes();

    for (name, query) in [
        ("literal", vec!["credentials"]),
        ("and_not", vec!["credentials", "NOT", "legacy"]),
        ("regex", vec!["/fn\\s+\\w+_\\d+/"]),
        ("fuzzy_1", vec!["credentails~1"]),
        ("fuzzy_2", vec!["config~2"]),
    ] {
        let config = SearchConfig::default();
        let plan = Arc::new(QueryPlan::build(parse_arguments(&query, false), &config));
        let engine = MatchEngine::new(plan, Arc::new(config), Arc::new(PipelineStats::default()));
        let mut worker = MatchWorker::new();

        group.bench_function(name, |b| {
            b.iter(|| {
                let mut job = FileJob::new("bench.rs", 0);
                job.content.clone_from(&content);
                engine.evaluate(&mut worker, &mut job);
                black_box(job.score)
            })
        });
    }

    group.finish();
}

// ============================================================================
// Highlight Benchmarks
// ============================================================================

fn bench_highlight(c: &mut Criterion) {
    let mut group = c.benchmark_group("highlight");
    let content = source_text(100);
    let spans = LiteralFinder::new("credentials", true).find_all(content.as_bytes(), 0);
    let overlapping: Vec<MatchSpan> = spans
        .iter()
        .flat_map(|s| [*s, MatchSpan::new(s.start + 2, s.end + 4)])
        .collect();

    group.bench_function("disjoint", |b| {
        b.iter(|| black_box(highlight(&content, &spans, "<", ">")))
    });
    group.bench_function("overlapping", |b| {
        b.iter(|| black_box(highlight(&content, &overlapping, "<", ">")))
    });
    group.bench_function("snippet_300", |b| {
        b.iter(|| black_box(extract_snippet(content.as_bytes(), &spans, 300)))
    });

    group.finish();
}

// ============================================================================
// Pipeline Benchmarks
// ============================================================================

/// Benchmarks a complete run over a tree of 500 files.
fn bench_pipeline(c: &mut Criterion) {
    let dir = TempDir::new().unwrap();
    for i in 0..500 {
        let sub = dir.path().join(format!("mod_{}", i % 10));
        fs::create_dir_all(&sub).unwrap();
        fs::write(sub.join(format!("file_{i}.rs")), source_text(i % 20 + 1)).unwrap();
    }

    let service = SearchService::new(SearchConfig::default());
    let walk = WalkConfig::default();

    c.bench_function("pipeline_500_files", |b| {
        b.iter(|| {
            let outcome = service
                .search_dir(dir.path(), &["credentials"], &walk, &CancelToken::new())
                .unwrap();
            black_box(outcome.results.len())
        })
    });
}

criterion_group!(fuzzy_benches, bench_fuzzy_expand);

criterion_group!(
    match_benches,
    bench_literal_matching,
    bench_term_evaluation,
);

criterion_group!(highlight_benches, bench_highlight);

criterion_group!(pipeline_benches, bench_pipeline);

criterion_main!(fuzzy_benches, match_benches, highlight_benches, pipeline_benches);
