//! Criterion benchmarks for the indicator pipeline.
//!
//! Benchmarks:
//! 1. Single-family series helpers (EMA, SMA, rolling std)
//! 2. Full per-index signal set on a merged series
//! 3. Relative strength over two aligned series

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use marketpulse_core::data::SyntheticSource;
use marketpulse_core::domain::IndexSeries;
use marketpulse_core::indicators::{
    self, ema_of_series, relative_strength, rolling_std, sma_of_series, IndicatorParams,
};

fn make_series(code: &str, n: usize) -> IndexSeries {
    let end = chrono::NaiveDate::from_ymd_opt(2024, 12, 20).unwrap();
    let bars = SyntheticSource::new(end).generate(code, n);
    IndexSeries::new(code, code, bars)
}

fn bench_series_helpers(c: &mut Criterion) {
    let mut group = c.benchmark_group("series_helpers");
    for n in [400usize, 2000, 10_000] {
        let closes = make_series("sh000001", n).closes();
        group.bench_with_input(BenchmarkId::new("ema_200", n), &closes, |b, v| {
            b.iter(|| ema_of_series(black_box(v), 200))
        });
        group.bench_with_input(BenchmarkId::new("sma_20", n), &closes, |b, v| {
            b.iter(|| sma_of_series(black_box(v), 20))
        });
        group.bench_with_input(BenchmarkId::new("rolling_std_20", n), &closes, |b, v| {
            b.iter(|| rolling_std(black_box(v), 20))
        });
    }
    group.finish();
}

fn bench_board_signals(c: &mut Criterion) {
    let params = IndicatorParams::default();
    let series = make_series("sh000001", 400);
    let closes = series.closes();
    let volumes = series.volumes();
    let pct = series.pct_changes();

    c.bench_function("board_signals_400", |b| {
        b.iter(|| {
            let trend = indicators::trend(black_box(&closes), params.ema_span);
            let funding = indicators::funding(black_box(&volumes), params.ma_window);
            let sentiment =
                indicators::sentiment(black_box(&closes), params.ma_window, &params.sentiment);
            let timing = indicators::timing(black_box(&pct), &params);
            (trend, funding, sentiment, timing)
        })
    });
}

fn bench_relative_strength(c: &mut Criterion) {
    let growth = make_series("sz399006", 400);
    let broad = make_series("sh000001", 400);
    c.bench_function("relative_strength_400", |b| {
        b.iter(|| relative_strength(black_box(&growth), black_box(&broad), 20))
    });
}

criterion_group!(
    benches,
    bench_series_helpers,
    bench_board_signals,
    bench_relative_strength
);
criterion_main!(benches);
