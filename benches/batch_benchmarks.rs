//! Batch Throughput Benchmarks
//!
//! Measures batch assembly with synthetic in-memory samples for different worker
//! counts, and the raw ordering overhead of the pool's lazy sequence.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use imdb::{DatasetConfig, DatasetSource, ImageDataset, LoadedDataset, Result, Sample, WorkerPool};
use ndarray::Array3;
use std::path::Path;

/// Produces 64x64 RGB samples with a little arithmetic per pixel
struct SyntheticSource {
    count: usize,
}

impl DatasetSource for SyntheticSource {
    type Annotation = usize;

    fn load_dataset(&self, _data_dir: &Path) -> Result<LoadedDataset<usize>> {
        Ok(LoadedDataset::new(
            vec!["object".to_string()],
            (0..self.count).map(|i| format!("{i:06}.png")).collect(),
            (0..self.count).collect(),
        ))
    }

    fn preprocess(&self, _image_path: &str, annotation: &usize) -> Result<Sample> {
        let seed = *annotation as f32;
        let image = Array3::from_shape_fn((64, 64, 3), |(y, x, c)| {
            ((seed + y as f32 * 0.5 + x as f32 * 0.25 + c as f32).sin() + 1.0) / 2.0
        });
        Ok(Sample::new(image))
    }
}

fn benchmark_next_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("next_batch");
    for workers in [1usize, 2, 4] {
        let config = DatasetConfig::new("synthetic", "/tmp/imdb-bench")
            .with_batch_size(16)
            .with_processes(workers)
            .with_seed(0);
        let mut dataset = ImageDataset::new(config, SyntheticSource { count: 256 })
            .expect("dataset should build");

        group.bench_with_input(BenchmarkId::from_parameter(workers), &workers, |b, _| {
            b.iter(|| black_box(dataset.next_batch().expect("batch")));
        });
        dataset.close();
    }
    group.finish();
}

fn benchmark_imap_ordering(c: &mut Criterion) {
    let pool = WorkerPool::new(4, 4).expect("pool should start");
    c.bench_function("imap_1024_items_chunk_32", |b| {
        b.iter(|| {
            let sum: u64 = pool
                .imap(|x: u64| Ok(x.wrapping_mul(31)), (0..1024).collect(), 32)
                .expect("pool open")
                .map(|r| r.expect("no failures"))
                .sum();
            black_box(sum)
        });
    });
    pool.close();
}

criterion_group!(benches, benchmark_next_batch, benchmark_imap_ordering);
criterion_main!(benches);
