//! Shader library.
//!
//! Resolves shader programs by name, validates the WGSL once with naga and hands
//! out [`Shader`] handles that renderers turn into GPU modules.

mod library;

pub use library::{Shader, ShaderError, ShaderLibrary};
