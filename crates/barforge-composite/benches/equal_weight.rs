//! Equal-weight composite throughput.
//!
//! Run with: `cargo bench --package barforge-composite`

use barforge_composite::{Basket, PanelBuilder, PricePanel, equal_weight};
use barforge_types::{AssetClass, Bar, Timeframe};
use chrono::{TimeDelta, TimeZone, Utc};
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

/// `count` consecutive m1 bars; every seventh member skips odd minutes to
/// exercise forward filling.
fn member_bars(ticker: &str, member: usize, count: usize) -> Vec<Bar> {
    let open_at = Utc.with_ymd_and_hms(2024, 1, 15, 8, 0, 0).unwrap();
    (0..count)
        .filter(|i| member % 7 != 0 || i % 2 == 0)
        .map(|i| {
            let open = 20.0 + member as f64 + (i % 11) as f64 * 0.05;
            Bar {
                ticker: ticker.to_string(),
                timeframe: Timeframe::Minute1,
                bucket_start: open_at + TimeDelta::minutes(i as i64),
                open,
                high: open + 0.1,
                low: open - 0.1,
                close: open + 0.02,
                volume: 1_000 + i as u64,
                vwap: Some(open + 0.01),
                asset_class: AssetClass::Equity,
            }
        })
        .collect()
}

fn panel(basket: &Basket, rows: usize) -> PricePanel {
    let mut builder = PanelBuilder::new(basket);
    for (i, ticker) in basket.members.iter().enumerate() {
        builder.add_member(ticker, member_bars(ticker, i, rows), None);
    }
    builder.build().unwrap()
}

fn panel_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("panel_build");

    for members in [10, 30, 100] {
        let basket = Basket::new("bench", "BENCHEWI", (0..members).map(|i| format!("SYM{i:03}")));
        group.throughput(Throughput::Elements((members * 300) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(members), &basket, |b, basket| {
            b.iter(|| panel(black_box(basket), 300));
        });
    }

    group.finish();
}

fn equal_weight_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("equal_weight");

    for members in [10, 30, 100] {
        let basket = Basket::new("bench", "BENCHEWI", (0..members).map(|i| format!("SYM{i:03}")));
        let panel = panel(&basket, 300);
        group.throughput(Throughput::Elements(panel.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(members), &panel, |b, panel| {
            b.iter(|| equal_weight(&basket, Timeframe::Minute1, black_box(panel)));
        });
    }

    group.finish();
}

criterion_group!(benches, panel_benchmark, equal_weight_benchmark);
criterion_main!(benches);
