pub mod neighbor_search;
pub mod smoothing_kernel;
pub mod solver_step;
pub mod update_densities;
