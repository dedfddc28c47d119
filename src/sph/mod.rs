pub use self::bcc_lattice::{BccLatticePointsGenerator, MAX_LATTICE_POINTS};
pub use self::collider::{Collider, Plane, Sphere, Surface, SurfaceQueryResult};
pub use self::config::{SimulationConfig, SolverKind, WindField};
pub use self::context::{derive_particle_mass, PositionObserver, SimulationContext};
pub use self::emitter::{uniform_sample_cone, PointParticleEmitter};
pub use self::error::SphError;
pub use self::hash_grid::{BucketKey, ParticleIndex, SpatialHashGrid};
pub use self::neighbor_lists::NeighborLists;
pub use self::particles::ParticleSet;
pub use self::runner::{SimulationRunner, Snapshot};
pub use self::simulation::Simulation;
pub use self::smoothing_kernel::*;
pub use self::solver::*;
pub use self::vector_field::{ConstantVectorField, SinusoidalVectorField, VectorField};

mod bcc_lattice;
mod collider;
mod config;
mod context;
mod emitter;
mod error;
mod hash_grid;
mod neighbor_lists;
mod particles;
mod runner;
mod simulation;
mod smoothing_kernel;
mod solver;
mod vector_field;
