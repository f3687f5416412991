//! Benchmarks for vector search latency.
//!
//! Measures search latency across index sizes, with and without orphaned
//! entries left behind by deleted documents.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use docqa_core::{Chunk, DocumentMetadata, SearchQuery, VectorStore};
use docqa_store::DocumentIndex;
use std::sync::Arc;

const EMBEDDING_DIM: usize = 384;
const CHUNKS_PER_DOCUMENT: usize = 10;

/// Create a deterministic pseudo-random unit vector.
fn create_random_embedding(dim: usize, seed: u64) -> Vec<f32> {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    seed.hash(&mut hasher);
    let base = hasher.finish();

    let raw: Vec<f32> = (0..dim)
        .map(|i| {
            let mut h = DefaultHasher::new();
            (base + i as u64).hash(&mut h);
            (h.finish() as f32 / u64::MAX as f32) * 2.0 - 1.0
        })
        .collect();
    let norm = raw.iter().map(|x| x * x).sum::<f32>().sqrt().max(f32::EPSILON);
    raw.into_iter().map(|x| x / norm).collect()
}

/// Populate an in-memory index with `chunk_count` chunks.
async fn populate_store(store: &DocumentIndex, chunk_count: usize) {
    for doc in 0..chunk_count.div_ceil(CHUNKS_PER_DOCUMENT) {
        let start = doc * CHUNKS_PER_DOCUMENT;
        let end = (start + CHUNKS_PER_DOCUMENT).min(chunk_count);
        let chunks: Vec<Chunk> = (start..end)
            .map(|i| {
                Chunk::new(
                    format!("Test content for chunk number {i} with some additional text for variety."),
                    i - start,
                )
            })
            .collect();
        let embeddings = (start..end)
            .map(|i| create_random_embedding(EMBEDDING_DIM, i as u64))
            .collect();
        store
            .add_document(
                &format!("doc-{doc}"),
                chunks,
                embeddings,
                DocumentMetadata::new(format!("doc_{doc}.txt")),
            )
            .await
            .unwrap();
    }
}

fn search_benchmark(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    let mut group = c.benchmark_group("search");

    // Benchmark different index sizes
    for chunk_count in &[100, 1_000, 10_000] {
        // Skip large benchmarks in CI
        if *chunk_count > 1_000 && std::env::var("CI").is_ok() {
            continue;
        }

        let store = DocumentIndex::in_memory(EMBEDDING_DIM);
        rt.block_on(populate_store(&store, *chunk_count));
        let store = Arc::new(store);
        let query_embedding = create_random_embedding(EMBEDDING_DIM, 12345);

        group.bench_with_input(
            BenchmarkId::new("vector_search", format!("{chunk_count}_chunks")),
            chunk_count,
            |b, _| {
                b.to_async(&rt).iter(|| async {
                    let query = SearchQuery::new(query_embedding.clone(), 3);
                    black_box(store.search(&query).await)
                });
            },
        );

        // Half the documents removed, entries still indexed
        let documents = chunk_count.div_ceil(CHUNKS_PER_DOCUMENT);
        rt.block_on(async {
            for doc in (0..documents).step_by(2) {
                store.remove_document(&format!("doc-{doc}")).await;
            }
        });

        group.bench_with_input(
            BenchmarkId::new("search_with_orphans", format!("{chunk_count}_chunks")),
            chunk_count,
            |b, _| {
                b.to_async(&rt).iter(|| async {
                    let query = SearchQuery::new(query_embedding.clone(), 3);
                    black_box(store.search(&query).await)
                });
            },
        );

        // Benchmark with different result limits
        for top_k in &[5, 10, 25, 50] {
            if *chunk_count < 10_000 {
                continue; // Only benchmark limits on larger indices
            }

            group.bench_with_input(
                BenchmarkId::new("top_k", format!("top_{top_k}")),
                top_k,
                |b, top_k| {
                    b.to_async(&rt).iter(|| async {
                        let query = SearchQuery::new(query_embedding.clone(), *top_k);
                        black_box(store.search(&query).await)
                    });
                },
            );
        }
    }

    group.finish();
}

criterion_group!(benches, search_benchmark);
criterion_main!(benches);
