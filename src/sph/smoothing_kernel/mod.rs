/// Smoothing Kernels.
pub use self::kernel::Kernel;
pub use self::spiky::SpikyKernel;
pub use self::std_kernel::StdKernel;

// Tests every kernel needs to pass, stamped out per kernel type.
macro_rules! generate_kernel_tests {
    ($kernel_type:ident) => {
    };
}

mod kernel;
mod spiky;
mod std_kernel;
