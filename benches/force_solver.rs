use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use rs_galaxy::galaxy::{compute_direct_forces, compute_tree_forces, GalaxyInitializer, Octree};
use rs_galaxy::utils::SimulationParams;

pub fn bench_force_methods(c: &mut Criterion) {
    let mut group = c.benchmark_group("force_methods");
    group.measurement_time(std::time::Duration::from_secs(5));
    group.sample_size(20);

    for &n in &[500usize, 2000, 5000] {
        let params = SimulationParams { n_bodies: n, ..SimulationParams::default() };
        let bodies = match GalaxyInitializer::new(params).and_then(|init| init.generate(7)) {
            Ok(bodies) => bodies,
            Err(e) => panic!("benchmark galaxy failed to generate: {}", e),
        };

        group.bench_with_input(BenchmarkId::new("tree_build", n), &bodies, |b, bodies| {
            b.iter(|| Octree::build(bodies, params.max_tree_depth))
        });

        group.bench_with_input(BenchmarkId::new("barnes_hut", n), &bodies, |b, bodies| {
            b.iter(|| {
                let tree = Octree::build(bodies, params.max_tree_depth);
                compute_tree_forces(&tree, bodies, params.g, params.softening, params.theta)
            })
        });

        group.bench_with_input(BenchmarkId::new("direct", n), &bodies, |b, bodies| {
            b.iter(|| compute_direct_forces(bodies, params.g, params.softening))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_force_methods);
criterion_main!(benches);
