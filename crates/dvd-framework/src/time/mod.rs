//! Frame timing.
//!
//! One `FrameClock` per render loop; `tick()` once per frame yields a `FrameTime`.

mod frame_clock;

pub use frame_clock::{FrameClock, FrameTime};
