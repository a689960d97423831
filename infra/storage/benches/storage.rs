use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use passio_storage::{RecordStore, Storage};
use std::hint::black_box;
use tempfile::TempDir;

fn bench_path_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("path_resolution");

    let temp = TempDir::new().unwrap();
    let rt = tokio::runtime::Runtime::new().unwrap();
    let storage = rt.block_on(async { Storage::builder().root(temp.path()).connect().await.unwrap() });
    let records = storage.namespace("records").unwrap();

    group.bench_function("flat", |b| {
        b.iter(|| black_box(storage.resolve("abc").unwrap()));
    });
    group.bench_function("sharded_record", |b| {
        let file = format!("{}.vault", RecordStore::stem("alice"));
        b.iter(|| black_box(records.resolve(&file).unwrap()));
    });

    group.finish();
}

fn bench_record_save_load(c: &mut Criterion) {
    let mut group = c.benchmark_group("records");
    group.sample_size(20);

    let temp = TempDir::new().unwrap();
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = rt.block_on(async {
        let storage = Storage::builder().root(temp.path()).connect().await.unwrap();
        RecordStore::new(&storage).unwrap()
    });

    for (label, size) in [("1KB", 1024usize), ("64KB", 64 * 1024)] {
        let envelope = "A".repeat(size);
        group.throughput(Throughput::Bytes(size as u64));

        group.bench_with_input(BenchmarkId::new("save", label), &envelope, |b, e| {
            b.iter(|| rt.block_on(store.save("bench", e, Some("token"))).unwrap());
        });
        group.bench_function(BenchmarkId::new("load", label), |b| {
            b.iter(|| black_box(rt.block_on(store.load("bench")).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_path_resolution, bench_record_save_load);
criterion_main!(benches);
