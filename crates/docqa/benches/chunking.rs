//! Benchmarks for chunking throughput.
//!
//! Measures the semantic and fixed-size chunkers over documents of
//! increasing size, plus extraction of plain text uploads.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use docqa_chunker::ChunkerRegistry;
use docqa_core::{ChunkConfig, ExtractedContent};
use docqa_extract::ExtractorRegistry;

/// Sample document content for benchmarking.
const SAMPLE_DOC: &str = r#"
# Introduction to Machine Learning

Machine learning (ML) is a subset of artificial intelligence (AI) that provides systems the ability
to automatically learn and improve from experience without being explicitly programmed.

## Supervised Learning

In supervised learning, the algorithm learns from labeled training data. The model makes predictions
based on input features and compares them with known outputs to improve accuracy.

## Unsupervised Learning

Unsupervised learning works with unlabeled data. The algorithm tries to find hidden patterns or
intrinsic structures in the input data.

## Applications

- Image recognition
- Natural language processing
- Recommendation systems

Machine learning continues to evolve rapidly, with new algorithms and applications emerging regularly.
"#;

/// Generate test content of specified size (in KB).
fn generate_content(size_kb: usize) -> String {
    let repetitions = (size_kb * 1024) / SAMPLE_DOC.len() + 1;
    SAMPLE_DOC.repeat(repetitions)
}

fn chunking_benchmark(c: &mut Criterion) {
    let chunkers = ChunkerRegistry::with_defaults();
    let config = ChunkConfig::default();

    let mut group = c.benchmark_group("chunking");

    for size_kb in &[1, 10, 100] {
        let content = ExtractedContent::from_text(generate_content(*size_kb));
        group.throughput(Throughput::Bytes((size_kb * 1024) as u64));

        for strategy in ["semantic", "fixed"] {
            group.bench_with_input(
                BenchmarkId::new(strategy, format!("{size_kb}KB")),
                &content,
                |b, content| {
                    b.iter(|| black_box(chunkers.chunk(content, Some(strategy), &config)));
                },
            );
        }
    }

    // One paragraph with no sentence boundaries forces hard cuts
    let unbroken = ExtractedContent::from_text("x".repeat(100 * 1024));
    group.bench_function("semantic/unbroken_100KB", |b| {
        b.iter(|| black_box(chunkers.chunk(&unbroken, Some("semantic"), &config)));
    });

    group.finish();
}

fn extraction_benchmark(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let extractors = ExtractorRegistry::with_defaults();

    let mut group = c.benchmark_group("extraction");

    for size_kb in &[10, 100] {
        let data = generate_content(*size_kb).into_bytes();
        group.throughput(Throughput::Bytes(data.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("markdown", format!("{size_kb}KB")),
            &data,
            |b, data| {
                b.to_async(&rt)
                    .iter(|| async { black_box(extractors.extract("doc.md", data).await) });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, chunking_benchmark, extraction_benchmark);
criterion_main!(benches);
