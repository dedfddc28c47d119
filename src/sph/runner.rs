use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender};
use log::{info, warn};

use super::error::SphError;
use super::simulation::Simulation;
use super::solver::StepReport;
use crate::units::*;

enum Command {
    Advance { dt: Real, steps: usize },
    Stop,
}

/// State published after every step.
#[derive(Clone, Debug)]
pub struct Snapshot {
    pub step: u64,
    pub positions: Vec<Point>,
    pub report: StepReport,
}

/// Runs a [`Simulation`] on a background thread.
///
/// The worker checks a stop flag between steps and is always joined, either by [`SimulationRunner::shutdown`] or on drop.
pub struct SimulationRunner {
    worker: Option<JoinHandle<Simulation>>,
    commands: Sender<Command>,
    snapshots: Receiver<Snapshot>,
    stop: Arc<AtomicBool>,
}

impl SimulationRunner {
    pub fn spawn(simulation: Simulation) -> SimulationRunner {
        let (send_command, recv_command) = crossbeam_channel::unbounded::<Command>();
        let (send_snapshot, recv_snapshot) = crossbeam_channel::unbounded::<Snapshot>();
        let stop = Arc::new(AtomicBool::new(false));

        let worker_stop = stop.clone();
        let worker = std::thread::spawn(move || Self::run(simulation, recv_command, send_snapshot, worker_stop));

        SimulationRunner {
            worker: Some(worker),
            commands: send_command,
            snapshots: recv_snapshot,
            stop,
        }
    }

    fn run(mut simulation: Simulation, commands: Receiver<Command>, snapshots: Sender<Snapshot>, stop: Arc<AtomicBool>) -> Simulation {
        info!("Simulation runner started");
        let mut step = 0;

        'commands: while let Ok(command) = commands.recv() {
            match command {
                Command::Advance { dt, steps } => {
                    for _ in 0..steps {
                        if stop.load(Ordering::Relaxed) {
                            break 'commands;
                        }
                        let report = simulation.step(dt);
                        step += 1;
                        let snapshot = Snapshot {
                            step,
                            positions: simulation.particles.positions.clone(),
                            report,
                        };
                        if snapshots.send(snapshot).is_err() {
                            // nobody listens anymore
                            break 'commands;
                        }
                    }
                }
                Command::Stop => break,
            }
        }

        info!("Simulation runner stopped after {} steps", step);
        simulation
    }

    /// Queues `steps` steps of size `dt`.
    pub fn advance(&self, dt: Real, steps: usize) -> Result<(), SphError> {
        if self.stop.load(Ordering::Relaxed) {
            return Err(SphError::RunnerStopped);
        }
        self.commands
            .send(Command::Advance { dt, steps })
            .map_err(|_| SphError::RunnerStopped)
    }

    /// Blocks until the next snapshot is available.
    pub fn recv_snapshot(&self) -> Result<Snapshot, SphError> {
        self.snapshots.recv().map_err(|_| SphError::RunnerStopped)
    }

    /// All snapshots published so far, without blocking.
    pub fn try_snapshots(&self) -> Vec<Snapshot> {
        self.snapshots.try_iter().collect()
    }

    /// Asks the worker to stop after the current step. Queued steps are dropped.
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
        let _ = self.commands.send(Command::Stop);
    }

    /// Stops the worker, waits for it and hands back the simulation.
    /// Returns None if the worker panicked.
    pub fn shutdown(mut self) -> Option<Simulation> {
        self.stop_and_join()
    }

    fn stop_and_join(&mut self) -> Option<Simulation> {
        let worker = self.worker.take()?;
        self.request_stop();
        match worker.join() {
            Ok(simulation) => Some(simulation),
            Err(_) => {
                warn!("Simulation runner thread panicked");
                None
            }
        }
    }
}

impl Drop for SimulationRunner {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}
