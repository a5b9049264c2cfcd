//! Benchmarks for version migration and session state

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use hl7v2_convert::{convert_simple, MigrationPlan, VersionConverter};
use hl7v2_session::{generate_ack, AckCode, MessageCorrelationTracker, SequenceNumberManager};
use hl7v2_test::{sample_profiles, stress_message, ADT_A01_V23};
use hl7v2_wire::parse_message;

fn bench_plan(c: &mut Criterion) {
    let profiles = sample_profiles();

    c.bench_function("migration_plan_2_3_to_2_7", |b| {
        b.iter(|| MigrationPlan::build(&profiles, black_box("2.3"), black_box("2.7")))
    });
}

fn bench_convert(c: &mut Criterion) {
    let profiles = sample_profiles();
    let message = parse_message(ADT_A01_V23).unwrap();
    let converter = VersionConverter::new(&profiles);

    c.bench_function("convert_adt_2_3_to_2_5", |b| {
        b.iter(|| converter.convert(black_box(&message), "2.5"))
    });
    c.bench_function("convert_simple", |b| {
        b.iter(|| convert_simple(black_box(&message), "2.5"))
    });
}

fn bench_session(c: &mut Criterion) {
    let message = stress_message("BENCH1", 1);
    let sequences = SequenceNumberManager::new();
    let tracker = MessageCorrelationTracker::new();

    c.bench_function("validate_sequence", |b| {
        b.iter(|| sequences.validate_sequence(black_box(&message), None))
    });
    c.bench_function("generate_ack", |b| {
        b.iter(|| generate_ack(black_box(&message), AckCode::ApplicationAccept))
    });
    c.bench_function("track_conversation", |b| {
        b.iter(|| tracker.track_conversation(black_box(&message)))
    });
}

criterion_group!(benches, bench_plan, bench_convert, bench_session);
criterion_main!(benches);
