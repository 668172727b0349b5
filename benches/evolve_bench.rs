use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use civ_evolution::core::config::SimulationConfig;
use civ_evolution::evolution::systems::{calculate_influence, spread_influence};
use civ_evolution::evolution::Simulator;

fn seeded(size: usize) -> Simulator {
    let mut config = SimulationConfig::default().with_seed(0xC1u64);
    config.map.cols = size;
    config.map.rows = size;
    Simulator::new(config).expect("valid bench config")
}

fn bench_evolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("evolve");
    group.sample_size(20);
    for size in [50_usize, 100] {
        group.bench_function(format!("full_tick_{}x{}", size, size), |b| {
            b.iter_batched(
                || {
                    let mut sim = seeded(size);
                    // Land on the tick before a full update
                    sim.evolve();
                    sim
                },
                |mut sim| sim.evolve(),
                BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

fn bench_influence(c: &mut Criterion) {
    let mut sim = seeded(100);
    calculate_influence(&mut sim);
    c.bench_function("spread_influence_100x100", |b| {
        b.iter(|| spread_influence(&mut sim.map));
    });
}

criterion_group!(benches, bench_evolve, bench_influence);
criterion_main!(benches);
