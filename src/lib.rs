#[macro_use]
extern crate microprofile;

pub mod sph;
pub mod units;
