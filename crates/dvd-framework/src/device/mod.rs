//! GPU device + surface management.

mod gpu;
mod init;

pub use gpu::{Gpu, GpuFrame, SurfaceErrorAction};
pub use init::GpuInit;
