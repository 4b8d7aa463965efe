//! Performance benchmarks for fragment rendering.
//!
//! Run with: `cargo bench --bench render`
//!
//! ## Performance Targets
//!
//! | Operation | Target | Notes |
//! |-----------|--------|-------|
//! | Cold render | <1ms for 100 children | Every fragment rendered |
//! | Cached render | <250us for 100 children | Every fragment a store hit |
//! | Store contention | Linear scaling | Multi-threaded renders |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::json;
use std::sync::Arc;
use std::thread;

use fragment_cache::transform::builtin::escape_html;
use fragment_cache::{
    ClassSchema, DocumentRef, EngineConfig, ExposureLevel, FieldSpec, FragmentEngine,
    InMemoryCacheStore, MemoryDocument, RenderOptions, SchemaRegistry, TransformPipeline,
};

fn registry() -> SchemaRegistry {
    SchemaRegistry::new()
        .with(
            ClassSchema::new("Post")
                .field(FieldSpec::scalar("title"))
                .field(FieldSpec::scalar("body").min_exposure(ExposureLevel::Public))
                .field(FieldSpec::scalar("slug").trusted())
                .field(FieldSpec::reference("comments").min_exposure(ExposureLevel::Public)),
        )
        .with(
            ClassSchema::new("Comment")
                .field(FieldSpec::scalar("author"))
                .field(FieldSpec::scalar("text").min_exposure(ExposureLevel::Public)),
        )
}

/// Create a post with `comment_count` comments.
fn make_post(id: u64, comment_count: u64) -> MemoryDocument {
    let comments: Vec<DocumentRef> = (0..comment_count)
        .map(|i| {
            MemoryDocument::new("Comment", id * 1_000 + i)
                .with_attr("author", json!(format!("user-{i}")))
                .with_attr("text", json!("<em>Nice</em> post & thanks"))
                .into_ref() as DocumentRef
        })
        .collect();

    MemoryDocument::new("Post", id)
        .with_attr("title", json!(format!("Post {id}")))
        .with_attr("body", json!("<p>Body with <b>markup</b></p>"))
        .with_attr("slug", json!(format!("post-{id}")))
        .with_many("comments", comments)
}

fn make_engine(disable_caching: bool) -> FragmentEngine {
    let config = EngineConfig {
        disable_caching,
        ..Default::default()
    };
    FragmentEngine::new(
        Arc::new(registry()),
        Arc::new(InMemoryCacheStore::new()),
        config,
        TransformPipeline::new().with("escape_html", escape_html()),
    )
}

fn options() -> RenderOptions {
    RenderOptions::default().version("v1").exposure(ExposureLevel::All)
}

/// Benchmark cold renders (caching disabled).
fn bench_cold_render(c: &mut Criterion) {
    let engine = make_engine(true);
    let options = options();

    let mut group = c.benchmark_group("cold_render");

    for comment_count in [1, 10, 50, 100] {
        let post = make_post(1, comment_count);

        group.throughput(Throughput::Elements(comment_count + 1));
        group.bench_with_input(BenchmarkId::new("comments", comment_count), &post, |b, post| {
            b.iter(|| engine.render(black_box(post), &options).unwrap())
        });
    }

    group.finish();
}

/// Benchmark cached renders (every fragment a hit).
fn bench_cached_render(c: &mut Criterion) {
    let engine = make_engine(false);
    let options = options();

    let mut group = c.benchmark_group("cached_render");

    for comment_count in [1, 10, 50, 100] {
        let post = make_post(comment_count, comment_count);

        // Warm the cache
        engine.render(&post, &options).unwrap();

        group.throughput(Throughput::Elements(comment_count + 1));
        group.bench_with_input(BenchmarkId::new("comments", comment_count), &post, |b, post| {
            b.iter(|| engine.render(black_box(post), &options).unwrap())
        });
    }

    group.finish();
}

/// Benchmark render after invalidation of the top-level instance.
fn bench_invalidate_and_render(c: &mut Criterion) {
    let engine = make_engine(false);
    let options = options();
    let post = make_post(7, 10);
    engine.render(&post, &options).unwrap();

    c.bench_function("invalidate_and_render", |b| {
        b.iter(|| {
            engine.invalidate_document(&post).unwrap();
            engine.render(black_box(&post), &options).unwrap()
        })
    });
}

/// Benchmark multi-threaded cached renders.
fn bench_store_contention(c: &mut Criterion) {
    let mut group = c.benchmark_group("store_contention");

    for num_threads in [1usize, 2, 4, 8] {
        let engine = Arc::new(make_engine(false));
        let posts: Vec<Arc<MemoryDocument>> = (0..num_threads)
            .map(|i| make_post(i as u64 + 1, 10).into_ref())
            .collect();

        // Warm the cache
        for post in &posts {
            engine.render(post.as_ref(), &options()).unwrap();
        }

        group.throughput(Throughput::Elements(num_threads as u64));
        group.bench_with_input(BenchmarkId::new("threads", num_threads), &num_threads, |b, &n| {
            b.iter(|| {
                let handles: Vec<_> = (0..n)
                    .map(|i| {
                        let engine = Arc::clone(&engine);
                        let post = Arc::clone(&posts[i]);
                        thread::spawn(move || {
                            let options = options();
                            for _ in 0..100 {
                                engine.render(black_box(post.as_ref()), &options).unwrap();
                            }
                        })
                    })
                    .collect();

                for h in handles {
                    h.join().unwrap();
                }
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_cold_render,
    bench_cached_render,
    bench_invalidate_and_render,
    bench_store_contention,
);
criterion_main!(benches);
