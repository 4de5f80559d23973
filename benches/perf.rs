use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::sync::Arc;

use matchup_terminal::classifier::{ModelArtifact, ModelParams};
use matchup_terminal::matchup::expand;
use matchup_terminal::pipeline::{GamesDivisor, build_team_table};
use matchup_terminal::raw_table::{SeasonTables, StatCategory};
use matchup_terminal::scaler::fit_apply;
use matchup_terminal::service::PredictionService;
use matchup_terminal::source::SeasonSource;
use matchup_terminal::synthetic::SyntheticSource;

fn season() -> SeasonTables {
    SyntheticSource::new(42)
        .fetch_season("2022-2023")
        .expect("synthetic season")
}

fn bench_team_table(c: &mut Criterion) {
    let tables = season();
    c.bench_function("team_table_build", |b| {
        b.iter(|| {
            let merged = build_team_table(
                black_box(&tables),
                GamesDivisor::SummaryAverage,
                &StatCategory::MODEL_DEFAULT,
            )
            .unwrap();
            black_box(merged.len());
        })
    });
}

fn bench_expand_and_scale(c: &mut Criterion) {
    let tables = season();
    let merged =
        build_team_table(&tables, GamesDivisor::SummaryAverage, &StatCategory::MODEL_DEFAULT)
            .unwrap();

    c.bench_function("matchup_expand", |b| {
        b.iter(|| {
            let matchups = expand(black_box(&merged));
            black_box(matchups.len());
        })
    });

    let matchups = expand(&merged);
    c.bench_function("scaler_fit_apply", |b| {
        b.iter(|| {
            let scaled = fit_apply(black_box(&matchups)).unwrap();
            black_box(scaled.len());
        })
    });
}

fn bench_predict(c: &mut Criterion) {
    let tables = season();
    let merged =
        build_team_table(&tables, GamesDivisor::SummaryAverage, &StatCategory::MODEL_DEFAULT)
            .unwrap();
    let scaled = fit_apply(&expand(&merged)).unwrap();
    let schema = scaled.schema().clone();
    let width = schema.width();
    let model = ModelArtifact::new(
        schema,
        ModelParams::Softmax {
            coefficients: [vec![0.05; width], vec![0.0; width], vec![-0.05; width]],
            intercepts: [0.3, 0.0, -0.1],
        },
    )
    .unwrap();
    let model = Arc::new(model);
    let teams = scaled.teams();

    // Fresh service per batch so the history log stays small.
    c.bench_function("service_predict", |b| {
        b.iter_batched(
            || PredictionService::new(scaled.clone(), model.clone()).unwrap(),
            |service| {
                let record = service
                    .predict(black_box(&teams[0]), black_box(&teams[1]))
                    .unwrap();
                black_box(record.outcome);
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(
    benches,
    bench_team_table,
    bench_expand_and_scale,
    bench_predict
);
criterion_main!(benches);
