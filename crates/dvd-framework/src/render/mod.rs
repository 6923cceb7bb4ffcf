//! GPU rendering subsystem.
//!
//! Renderers consume `scene` draw streams and issue GPU commands via wgpu.
//! Each renderer is responsible for its own GPU resources (pipelines, buffers).
//!
//! Convention:
//! - CPU geometry is in logical pixels (top-left origin, +Y down).
//! - Vertex shaders map to clip space with the fixed projection uniform.

mod ctx;
pub mod shapes;

pub use ctx::{RenderCtx, RenderTarget};
