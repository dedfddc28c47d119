use cgmath::prelude::*;
use log::{info, warn};
use std::time::{Duration, Instant};

use pcisph3d::sph::*;
use pcisph3d::units::*;

const NUM_FRAMES: usize = 300;
const NUM_STEPS_PER_FRAME: usize = 4;
const FRAME_TIME: Real = 1.0 / 60.0;
const SIM_TIME_STEP: Real = FRAME_TIME / NUM_STEPS_PER_FRAME as Real;

// Headless dam break: fluid block in a box open at the top, with a jet pouring in from above.
// Usage: pcisph3d [config.toml]
fn main() -> Result<(), SphError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    microprofile::init!();
    microprofile::set_enable_all_groups!(true);

    let config = match std::env::args().nth(1) {
        Some(path) => {
            info!("Loading config from {}", path);
            SimulationConfig::from_toml_file(path)?
        }
        None => SimulationConfig::default(),
    };
    let bounds: Vector = config.simulation_bounds.into();
    let spacing = config.target_spacing;

    let mut simulation = Simulation::new(config)?;
    add_container(&mut simulation.context, bounds);
    simulation.context.set_emitter(PointParticleEmitter::new(
        Point::new(bounds.x * 0.75, bounds.y * 0.5, bounds.z - spacing),
        -Vector::unit_z(),
        5.0,  // m/s
        15.0, // degrees
        1000,
        200.0,
        0,
    ));
    info!(
        "Dam break with {} particles using {} pressure solver",
        simulation.particles.len(),
        simulation.solver.pressure_solver_name()
    );

    let runner = SimulationRunner::spawn(simulation);
    runner.advance(SIM_TIME_STEP, NUM_FRAMES * NUM_STEPS_PER_FRAME)?;

    let start = Instant::now();
    let mut frame_start = start;
    let mut slowest_frame = Duration::from_secs(0);
    let mut num_unconverged_steps = 0;
    for frame in 0..NUM_FRAMES {
        let mut last_snapshot = None;
        for _ in 0..NUM_STEPS_PER_FRAME {
            let snapshot = runner.recv_snapshot()?;
            if !snapshot.report.pressure.converged {
                num_unconverged_steps += 1;
            }
            last_snapshot = Some(snapshot);
        }
        microprofile::flip!();

        let now = Instant::now();
        slowest_frame = slowest_frame.max(now - frame_start);
        frame_start = now;

        if let Some(snapshot) = last_snapshot.filter(|_| frame % 60 == 59) {
            let lowest = snapshot.positions.iter().map(|p| p.z).fold(Real::INFINITY, Real::min);
            let highest = snapshot.positions.iter().map(|p| p.z).fold(Real::NEG_INFINITY, Real::max);
            info!(
                "t={:.2}s step {}: {} particles, z in [{:.2}, {:.2}], {} pressure iterations, {} collisions",
                (frame + 1) as Real * FRAME_TIME,
                snapshot.step,
                snapshot.report.num_particles,
                lowest,
                highest,
                snapshot.report.pressure.iterations,
                snapshot.report.num_collisions
            );
        }
    }

    let elapsed = start.elapsed();
    info!(
        "Simulated {:.2}s in {:.2}s ({:.1} ms/frame, slowest {:.1} ms)",
        NUM_FRAMES as Real * FRAME_TIME,
        elapsed.as_secs_f64(),
        elapsed.as_secs_f64() * 1000.0 / NUM_FRAMES as f64,
        slowest_frame.as_secs_f64() * 1000.0
    );
    if num_unconverged_steps > 0 {
        warn!("{} steps did not reach the target density error", num_unconverged_steps);
    }

    if runner.shutdown().is_none() {
        warn!("Simulation thread did not shut down cleanly");
    }
    Ok(())
}

// Floor and four walls around the simulation bounds.
fn add_container(context: &mut SimulationContext, bounds: Vector) {
    const FRICTION: Real = 0.1;
    let walls = [
        (Point::origin(), Vector::unit_z()),
        (Point::origin(), Vector::unit_x()),
        (Point::origin(), Vector::unit_y()),
        (Point::new(bounds.x, 0.0, 0.0), -Vector::unit_x()),
        (Point::new(0.0, bounds.y, 0.0), -Vector::unit_y()),
    ];
    for (origin, normal) in walls {
        context.add_collider(Collider::new(Plane::new(origin, normal), FRICTION));
    }
}
