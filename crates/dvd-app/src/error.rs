use dvd_framework::shader::ShaderError;
use dvd_framework::text::FontLoadError;

use crate::config::ConfigError;
use crate::engine::Phase;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("`{operation}` needs phase {expected:?}, engine is in {actual:?}")]
    InvalidState {
        operation: &'static str,
        expected: Phase,
        actual: Phase,
    },

    /// Event loop, window, surface, adapter or device creation failed.
    #[error("window initialization failed: {0:#}")]
    Window(anyhow::Error),

    #[error(transparent)]
    Shader(#[from] ShaderError),

    #[error("overlay font: {0}")]
    Font(#[from] FontLoadError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
