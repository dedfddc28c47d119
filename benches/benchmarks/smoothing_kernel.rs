use criterion::{black_box, criterion_group, Criterion};

use cgmath::prelude::*;
use pcisph3d::sph::*;
use pcisph3d::units::*;

fn bench_kernels(c: &mut Criterion) {
    let kernel_radius = black_box(1.0);

    let ri_to_rj = black_box(Vector::new(1.0, 1.0, 0.5) - Vector::new(0.5, 1.0, 0.25));
    let r = black_box(ri_to_rj.magnitude());
    let direction = black_box(ri_to_rj / r);

    {
        let kernel = black_box(StdKernel::new(kernel_radius));
        c.bench_function("StdKernel.evaluate", |b| b.iter(|| kernel.evaluate(r)));
        c.bench_function("StdKernel.gradient", |b| b.iter(|| kernel.gradient(r, direction)));
    }
    {
        let kernel = black_box(SpikyKernel::new(kernel_radius));
        c.bench_function("SpikyKernel.evaluate", |b| b.iter(|| kernel.evaluate(r)));
        c.bench_function("SpikyKernel.gradient", |b| b.iter(|| kernel.gradient(r, direction)));
        c.bench_function("SpikyKernel.second_derivative", |b| b.iter(|| kernel.second_derivative(r)));
    }
}

fn config() -> Criterion {
    Criterion::default()
        .warm_up_time(core::time::Duration::new(0, 100))
        .sample_size(1000)
        .significance_level(0.1)
}

criterion_group!(
    name = smoothing_kernel;
    config = config();
    targets = bench_kernels
);
