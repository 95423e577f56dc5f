//! Chunking and hashing benchmarks

use asset_uploadr::upload::chunk::{reader_digest, sha256_hex};
use asset_uploadr::upload::{ChunkReader, FileId, CHUNK_SIZE};
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

fn benchmark_chunk_digest(c: &mut Criterion) {
    let mut group = c.benchmark_group("chunk_digest");

    for size in [64 * 1024, 1024 * 1024, CHUNK_SIZE].iter() {
        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(format!("{}_bytes", size), size, |b, &size| {
            let data = vec![0xA5u8; size];
            b.iter(|| black_box(sha256_hex(&data)));
        });
    }

    group.finish();
}

fn benchmark_chunk_reader(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let data = vec![0x5Au8; 3 * CHUNK_SIZE / 2];

    let mut group = c.benchmark_group("chunk_reader");
    group.throughput(Throughput::Bytes(data.len() as u64));

    group.bench_function("split_and_hash", |b| {
        b.to_async(&runtime).iter(|| async {
            let mut reader = ChunkReader::new(&data[..], FileId::new("bench"));
            while let Some(chunk) = reader.next_chunk().await.unwrap() {
                black_box(chunk.digest);
            }
        });
    });

    group.bench_function("whole_file_digest", |b| {
        b.to_async(&runtime).iter(|| async {
            let mut input = &data[..];
            black_box(reader_digest(&mut input).await.unwrap())
        });
    });

    group.finish();
}

criterion_group!(benches, benchmark_chunk_digest, benchmark_chunk_reader);
criterion_main!(benches);
