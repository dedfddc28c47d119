use criterion::{black_box, criterion_group, Criterion};

use pcisph3d::sph::*;
use pcisph3d::units::*;

fn bench_update_densities(c: &mut Criterion) {
    let mut context = SimulationContext::new(SimulationConfig::default()).unwrap();
    let mut particles = context.new_particle_set();
    let mut rng: rand::rngs::SmallRng = rand::SeedableRng::seed_from_u64(42);
    // Somewhat compressed block, this would explode in a real simulation, but we don't care here.
    particles.add_block(Point::new(0.0, 0.0, 0.0), Point::new(20.0, 20.0, 20.0), 0.8, 0.1, &mut rng);
    context.build_neighbor_searcher(&particles.positions);
    context.build_neighbor_lists(&particles.positions);

    let context = black_box(context);
    c.bench_function(
        &format!("SimulationContext.update_densities - {} particles", particles.len()),
        |b| b.iter(|| context.update_densities(&mut particles)),
    );
}

criterion_group!(update_densities, bench_update_densities);
