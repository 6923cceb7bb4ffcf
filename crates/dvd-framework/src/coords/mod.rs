//! Coordinate and geometry types shared across the renderers and the simulation.
//!
//! Canonical CPU space:
//! - Logical pixels
//! - Origin top-left
//! - +X right, +Y down
//!
//! Renderers map this space to clip space with a fixed orthographic
//! [`Projection`] uploaded once per pipeline.

mod projection;
mod rect;
mod vec2;
mod viewport;

pub use projection::Projection;
pub use rect::Rect;
pub use vec2::Vec2;
pub use viewport::Viewport;
