//! Benchmarks for the preprocessing chain and its kernels

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use emg_core::{SignalTable, TableSettings};
use emg_processing::envelope::{rolling_mean, rolling_rms};
use emg_processing::{preprocess, BandpassConfig, ProcessingConfig};

fn recording(rows: usize, channels: usize) -> SignalTable {
    let names: Vec<String> = (1..=channels).map(|c| format!("CH{}_4680", c)).collect();
    let mut columns = vec![("Timestamp_4680".to_string(), (0..rows).map(|t| t as f64).collect())];
    for (c, name) in names.iter().enumerate() {
        let phase = c as f64;
        columns.push((
            name.clone(),
            (0..rows).map(|i| (i as f64 * 0.31 + phase).sin()).collect(),
        ));
    }
    columns.push(("Event_4680".to_string(), vec![0.0; rows]));

    SignalTable::from_columns(columns, TableSettings::new(names, "Timestamp_4680", "Event_4680"))
        .expect("valid recording")
}

/// Full preprocess over a range of recording lengths
fn bench_preprocess(c: &mut Criterion) {
    let mut group = c.benchmark_group("preprocess");
    let config = ProcessingConfig::default();

    for &rows in &[4096usize, 16384, 65536] {
        for &channels in &[1usize, 4] {
            let table = recording(rows, channels);
            group.bench_with_input(
                BenchmarkId::new("shimmer", format!("{}rows_{}ch", rows, channels)),
                &table,
                |b, table| b.iter(|| black_box(preprocess(black_box(table), &config))),
            );
        }
    }

    group.finish();
}

/// Individual column kernels
fn bench_kernels(c: &mut Criterion) {
    let mut group = c.benchmark_group("kernels");
    let values: Vec<f64> = (0..65536).map(|i| (i as f64 * 0.07).sin()).collect();

    group.bench_function("bandpass", |b| {
        let config = BandpassConfig::default();
        b.iter(|| black_box(config.apply(black_box(&values), 1024.0)))
    });
    group.bench_function("rolling_mean_1024", |b| {
        b.iter(|| black_box(rolling_mean(black_box(&values), 1024)))
    });
    group.bench_function("rolling_rms_102", |b| {
        b.iter(|| black_box(rolling_rms(black_box(&values), 102)))
    });

    group.finish();
}

criterion_group!(benches, bench_preprocess, bench_kernels);
criterion_main!(benches);
