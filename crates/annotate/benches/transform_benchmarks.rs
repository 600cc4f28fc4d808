use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use rowmark_annotate::annotate;

fn sample_csv(rows: usize) -> Vec<u8> {
    let mut out = String::from("id,name,contact,notes\n");
    for i in 0..rows {
        if i % 3 == 0 {
            out.push_str(&format!("{i},\"User, {i}\",user{i}@example.com,ok\n"));
        } else {
            out.push_str(&format!("{i},User {i},555-{i:04},\"no \"\"email\"\" here\"\n"));
        }
    }
    out.into_bytes()
}

fn bench_annotate_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("annotate_throughput");

    for rows in [100usize, 1_000, 10_000] {
        let input = sample_csv(rows);
        group.throughput(Throughput::Bytes(input.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(rows), &input, |b, input| {
            b.iter(|| annotate(black_box(input)).unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_annotate_throughput);
criterion_main!(benches);
