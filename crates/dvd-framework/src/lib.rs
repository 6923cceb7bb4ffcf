//! dvd framework crate.
//!
//! This crate owns the platform + GPU runtime pieces used by the demo:
//! window/event pumping, the wgpu device, input tracking, frame timing,
//! shader loading and the rect/text renderers.

pub mod device;
pub mod window;
pub mod input;
pub mod time;

pub mod logging;
pub mod coords;
pub mod render;
pub mod paint;
pub mod scene;
pub mod shader;
pub mod text;
