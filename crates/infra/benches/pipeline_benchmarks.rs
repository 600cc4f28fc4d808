use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use rowmark_annotate::EmailFlagTransformer;
use rowmark_core::JobId;
use rowmark_infra::blob_store::{BlobStore, FsBlobStore, InMemoryBlobStore};
use rowmark_infra::jobs::{InMemoryJobQueue, JobWorker};

fn sample_csv(rows: usize) -> Vec<u8> {
    let mut out = String::from("id,name,contact\n");
    for i in 0..rows {
        if i % 2 == 0 {
            out.push_str(&format!("{i},user {i},user{i}@example.com\n"));
        } else {
            out.push_str(&format!("{i},user {i},+1-555-{i:04}\n"));
        }
    }
    out.into_bytes()
}

/// Upload + dequeue + transform + store, all in memory.
fn bench_in_memory_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline_in_memory");

    for rows in [100usize, 1_000] {
        let input = sample_csv(rows);
        group.throughput(Throughput::Bytes(input.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(rows), &input, |b, input| {
            let blobs = InMemoryBlobStore::arc();
            let queue = InMemoryJobQueue::in_memory();
            let worker = JobWorker::new(blobs.clone(), queue.clone(), EmailFlagTransformer);

            b.iter(|| {
                let id = JobId::new();
                blobs.save_raw(id, input).unwrap();
                queue.enqueue(id).unwrap();
                black_box(worker.run_once().unwrap());
            });
        });
    }

    group.finish();
}

/// Same pipeline against the filesystem store (atomic rename per write).
fn bench_fs_pipeline(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let blobs = std::sync::Arc::new(FsBlobStore::open(dir.path()).unwrap());
    let queue = InMemoryJobQueue::in_memory();
    let worker = JobWorker::new(blobs.clone(), queue.clone(), EmailFlagTransformer);
    let input = sample_csv(1_000);

    let mut group = c.benchmark_group("pipeline_fs");
    group.throughput(Throughput::Bytes(input.len() as u64));
    group.bench_function("1000_rows", |b| {
        b.iter(|| {
            let id = JobId::new();
            blobs.save_raw(id, &input).unwrap();
            queue.enqueue(id).unwrap();
            black_box(worker.run_once().unwrap());
        });
    });
    group.finish();
}

criterion_group!(benches, bench_in_memory_pipeline, bench_fs_pipeline);
criterion_main!(benches);
