use chrono::{Duration, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use stockforest::anomaly::{AnomalyDetector, IsolationForest};
use stockforest::config::DetectionConfig;
use stockforest::feature_engineering::MovementFeatureBuilder;
use stockforest::pipeline::StockForestPipeline;
use stockforest::preprocessing::MovementTransform;
use stockforest::records::MovementRecord;

fn create_movement_log(n_rows: usize) -> Vec<MovementRecord> {
    let mut rng = ChaCha8Rng::seed_from_u64(11);
    let start = NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();

    (0..n_rows)
        .map(|i| {
            let ts = start + Duration::minutes(rng.gen_range(0..525_600));
            let qty = rng.gen::<f64>() * 100.0;
            MovementRecord::new(i, format!("ART-{}", rng.gen_range(0..200)))
                .with_timestamp(ts)
                .with_quantities(qty, qty / 10.0)
                .with_movement_type(["ENT", "SOR", "INV"][rng.gen_range(0..3)])
                .with_document_type(["BL", "BR", "OF", "RT"][rng.gen_range(0..4)])
                .with_stat_type(0, format!("S{}", rng.gen_range(0..6)))
        })
        .collect()
}

fn bench_features(c: &mut Criterion) {
    let mut group = c.benchmark_group("features");

    for n_rows in [1000, 10000, 50000].iter() {
        let records = create_movement_log(*n_rows);
        group.bench_with_input(BenchmarkId::new("build", n_rows), &records, |b, records| {
            let builder = MovementFeatureBuilder::default();
            b.iter(|| builder.build(black_box(records)))
        });
    }

    group.finish();
}

fn bench_forest(c: &mut Criterion) {
    let mut group = c.benchmark_group("isolation_forest");
    group.sample_size(10);

    for n_rows in [1000, 10000].iter() {
        let records = create_movement_log(*n_rows);
        let table = MovementFeatureBuilder::default().build(&records);
        let x = MovementTransform::new().fit_transform(&table).unwrap();

        group.bench_with_input(BenchmarkId::new("fit", n_rows), &x, |b, x| {
            b.iter(|| {
                let mut forest = IsolationForest::new().with_seed(42);
                forest.fit(black_box(x)).unwrap();
                forest
            })
        });

        let mut forest = IsolationForest::new().with_seed(42);
        forest.fit(&x).unwrap();
        group.bench_with_input(BenchmarkId::new("score", n_rows), &x, |b, x| {
            b.iter(|| forest.decision_function(black_box(x)).unwrap())
        });
    }

    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    group.sample_size(10);

    let records = create_movement_log(20000);
    group.bench_function("run_20000", |b| {
        b.iter(|| {
            let mut pipeline = StockForestPipeline::new(DetectionConfig::default()).unwrap();
            pipeline.run(black_box(&records)).unwrap()
        })
    });

    group.finish();
}

criterion_group!(benches, bench_features, bench_forest, bench_pipeline);
criterion_main!(benches);
