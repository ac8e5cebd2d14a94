use criterion::{black_box, criterion_group, criterion_main, Criterion};
use folio::{Folio, Options};
use tempfile::TempDir;

const CONTENT: &str = "A moderately sized document body: enough text that the \
snapshot codec has something to chew on, but small enough to be a realistic \
label-to-note payload rather than a blob.";

fn bench_set(c: &mut Criterion) {
    let dir = TempDir::new().unwrap();
    let db = Folio::open(dir.path(), "bench.folio", Options::default()).unwrap();
    let mut i = 0u64;
    c.bench_function("set", |b| {
        b.iter(|| {
            i += 1;
            db.set(&format!("doc-{}", i % 512), black_box(CONTENT)).unwrap();
        })
    });
}

fn bench_get_sparse(c: &mut Criterion) {
    let dir = TempDir::new().unwrap();
    let db = Folio::open(dir.path(), "bench.folio", Options::default()).unwrap();
    for i in 0..1000 {
        db.set(&format!("doc-{i}"), CONTENT).unwrap();
    }
    c.bench_function("get/sparse", |b| {
        b.iter(|| black_box(db.get("doc-500").unwrap()))
    });
}

fn bench_get_sorted(c: &mut Criterion) {
    let dir = TempDir::new().unwrap();
    let db = Folio::open(dir.path(), "bench.folio", Options::default()).unwrap();
    for i in 0..1000 {
        db.set(&format!("doc-{i}"), CONTENT).unwrap();
    }
    db.compact().unwrap();
    c.bench_function("get/sorted", |b| {
        b.iter(|| black_box(db.get("doc-500").unwrap()))
    });
}

fn bench_compact(c: &mut Criterion) {
    let dir = TempDir::new().unwrap();
    let db = Folio::open(dir.path(), "bench.folio", Options::default()).unwrap();
    for i in 0..1000 {
        db.set(&format!("doc-{i}"), CONTENT).unwrap();
    }
    c.bench_function("compact/1k-docs", |b| b.iter(|| db.compact().unwrap()));
}

criterion_group!(benches, bench_set, bench_get_sparse, bench_get_sorted, bench_compact);
criterion_main!(benches);
