use dvd_framework::coords::{Rect, Vec2};
use dvd_framework::paint::Color;

/// An axis-aligned moving rectangle. `pos` is the center.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Shape {
    pub pos: Vec2,
    pub size: Vec2,
    pub vel: Vec2,
    pub color: Color,
}

impl Shape {
    pub fn new(pos: Vec2, size: Vec2, vel: Vec2, color: Color) -> Self {
        Self { pos, size, vel, color }
    }

    /// Moves by `vel * dt`.
    pub fn advance(&mut self, dt: f32) {
        self.pos += self.vel * dt;
    }

    pub fn half_size(&self) -> Vec2 {
        self.size * 0.5
    }

    pub fn rect(&self) -> Rect {
        Rect::from_center(self.pos, self.size)
    }
}
