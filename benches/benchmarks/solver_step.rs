use criterion::{criterion_group, Criterion};

use pcisph3d::sph::*;
use pcisph3d::units::*;

fn bench_solver_step(c: &mut Criterion) {
    for solver in [SolverKind::EquationOfState, SolverKind::Pcisph] {
        let config = SimulationConfig {
            particle_count: 5000,
            solver,
            ..Default::default()
        };
        let mut simulation = Simulation::new(config).unwrap();
        let dt: Real = 1.0 / 240.0;

        c.bench_function(
            &format!("ParticleSystemSolver.on_advance_time_step - {:?}, {} particles", solver, simulation.particles.len()),
            |b| b.iter(|| simulation.step(dt)),
        );
    }
}

fn config() -> Criterion {
    Criterion::default().sample_size(20)
}

criterion_group!(
    name = solver_step;
    config = config();
    targets = bench_solver_step
);
