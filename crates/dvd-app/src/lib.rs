//! Bouncing "dvd" logo demo.
//!
//! A rectangle bounces around an 800×600 window, counting wall and corner
//! hits; corner hits (and mouse clicks) throw confetti.

pub mod config;
pub mod engine;
pub mod error;
pub mod sim;

pub use config::{ConfigError, DemoConfig};
pub use engine::{Engine, Phase, HEIGHT, WIDTH};
pub use error::EngineError;
