// Simulation runs in double precision throughout.
pub type Real = f64;
pub type Point = cgmath::Point3<Real>;
pub type Vector = cgmath::Vector3<Real>;
