//! Shape renderers.

mod common;

pub mod rect;
pub mod text;
