//! Window-free simulation of the bouncing logo and its confetti.

mod bounds;
mod confetti;
mod shape;
mod world;

pub use bounds::{check_bounds, Bounds, Hit};
pub use confetti::{check_confetti_bounds, random_piece, Confetti, ConfettiPiece, ConfettiPolicy};
pub use shape::Shape;
pub use world::World;
