use std::f32::consts::TAU;

use rand::Rng;

use dvd_framework::coords::Vec2;
use dvd_framework::paint::Color;

use crate::config::ConfettiSection;

use super::{check_bounds, Bounds, Shape};

/// Lifetime, cap and spawn parameters for confetti.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfettiPolicy {
    pub lifetime: f32,
    pub fade: f32,
    pub max_pieces: usize,
    pub per_corner_hit: usize,
    pub per_click: usize,
    pub size: Vec2,
    pub speed_min: f32,
    pub speed_max: f32,
}

impl Default for ConfettiPolicy {
    fn default() -> Self {
        Self::from(&ConfettiSection::default())
    }
}

impl From<&ConfettiSection> for ConfettiPolicy {
    fn from(c: &ConfettiSection) -> Self {
        Self {
            lifetime: c.lifetime_secs,
            fade: c.fade_secs,
            max_pieces: c.max_pieces.max(1),
            per_corner_hit: c.per_corner_hit.max(1),
            per_click: c.per_click,
            size: Vec2::new(c.size[0], c.size[1]),
            speed_min: c.speed[0],
            speed_max: c.speed[1].max(c.speed[0]),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ConfettiPiece {
    pub shape: Shape,
    /// Seconds since spawn.
    pub age: f32,
}

impl ConfettiPiece {
    /// Color with the end-of-life fade applied.
    pub fn display_color(&self, policy: &ConfettiPolicy) -> Color {
        let remaining = policy.lifetime - self.age;
        if policy.fade <= 0.0 || remaining >= policy.fade {
            self.shape.color
        } else {
            self.shape.color.faded(remaining / policy.fade)
        }
    }
}

/// Live confetti, oldest first.
#[derive(Debug, Clone, Default)]
pub struct Confetti {
    pieces: Vec<ConfettiPiece>,
}

impl Confetti {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    pub fn pieces(&self) -> &[ConfettiPiece] {
        &self.pieces
    }

    /// Appends a piece, evicting the oldest ones beyond `policy.max_pieces`.
    pub fn push(&mut self, shape: Shape, policy: &ConfettiPolicy) {
        self.pieces.push(ConfettiPiece { shape, age: 0.0 });
        let excess = self.pieces.len().saturating_sub(policy.max_pieces);
        if excess > 0 {
            self.pieces.drain(..excess);
        }
    }

    /// Ages, moves and bounces every piece, then drops the expired ones.
    pub fn step(&mut self, dt: f32, bounds: Bounds, policy: &ConfettiPolicy) {
        for piece in &mut self.pieces {
            piece.age += dt;
            piece.shape.advance(dt);
            check_confetti_bounds(&mut piece.shape, bounds);
        }
        let before = self.pieces.len();
        self.pieces.retain(|p| p.age < policy.lifetime);
        let expired = before - self.pieces.len();
        if expired > 0 {
            log::trace!("{expired} confetti piece(s) expired");
        }
    }
}

/// Same reflection as the logo, without counting hits.
pub fn check_confetti_bounds(shape: &mut Shape, bounds: Bounds) {
    check_bounds(shape, bounds);
}

/// Builds one piece at `origin` with a random hue and a random velocity.
///
/// `toward` restricts the direction: each non-zero component forces the sign
/// of that velocity component, so corner spawns fly into the field.
pub fn random_piece<R: Rng>(
    rng: &mut R,
    origin: Vec2,
    toward: Vec2,
    policy: &ConfettiPolicy,
) -> Shape {
    let angle = rng.gen_range(0.0..TAU);
    let speed = if policy.speed_max > policy.speed_min {
        rng.gen_range(policy.speed_min..policy.speed_max)
    } else {
        policy.speed_min
    };

    let mut vel = Vec2::new(angle.cos() * speed, angle.sin() * speed);
    if toward.x != 0.0 {
        vel.x = vel.x.abs().copysign(toward.x);
    }
    if toward.y != 0.0 {
        vel.y = vel.y.abs().copysign(toward.y);
    }

    let hue = rng.gen_range(0.0..360.0);
    let color = Color::from_hsv(hue, 0.85, 1.0);

    Shape::new(origin, policy.size, vel, color)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const FIELD: Bounds = Bounds::new(800.0, 600.0);

    fn policy() -> ConfettiPolicy {
        ConfettiPolicy {
            max_pieces: 3,
            ..ConfettiPolicy::default()
        }
    }

    fn piece_at(x: f32) -> Shape {
        Shape::new(Vec2::new(x, 100.0), Vec2::new(4.0, 4.0), Vec2::zero(), Color::WHITE)
    }

    #[test]
    fn cap_evicts_oldest_first() {
        let p = policy();
        let mut c = Confetti::new();
        for x in [10.0, 20.0, 30.0, 40.0, 50.0] {
            c.push(piece_at(x), &p);
        }
        let xs: Vec<f32> = c.pieces().iter().map(|p| p.shape.pos.x).collect();
        assert_eq!(xs, vec![30.0, 40.0, 50.0]);
    }

    #[test]
    fn pieces_expire_after_lifetime() {
        let p = policy();
        let mut c = Confetti::new();
        c.push(piece_at(10.0), &p);

        c.step(p.lifetime - 0.5, FIELD, &p);
        assert_eq!(c.len(), 1);

        c.step(0.5, FIELD, &p);
        assert!(c.is_empty());
    }

    #[test]
    fn fade_only_in_last_second() {
        let p = ConfettiPolicy::default();
        let mut piece = ConfettiPiece { shape: piece_at(10.0), age: 0.0 };
        assert_eq!(piece.display_color(&p), Color::WHITE);

        piece.age = p.lifetime - p.fade * 0.5;
        let c = piece.display_color(&p);
        assert!((c.a - 0.5).abs() < 1e-4);
    }

    #[test]
    fn confetti_bounces_off_walls() {
        let p = ConfettiPolicy::default();
        let mut c = Confetti::new();
        let mut s = piece_at(795.0);
        s.vel = Vec2::new(100.0, 0.0);
        c.push(s, &p);

        c.step(0.1, FIELD, &p);
        let moved = c.pieces()[0].shape;
        assert_eq!(moved.vel.x, -100.0);
        assert_eq!(moved.pos.x, 798.0);
    }

    #[test]
    fn corner_spawn_points_into_the_field() {
        let p = ConfettiPolicy::default();
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..100 {
            let s = random_piece(&mut rng, Vec2::new(800.0, 600.0), Vec2::new(-1.0, -1.0), &p);
            assert!(s.vel.x <= 0.0 && s.vel.y <= 0.0);
            let speed = s.vel.length();
            assert!(speed >= p.speed_min - 1e-3 && speed <= p.speed_max + 1e-3);
            assert_eq!(s.pos, Vec2::new(800.0, 600.0));
            assert_eq!(s.color.a, 1.0);
        }
    }

    #[test]
    fn same_seed_same_piece() {
        let p = ConfettiPolicy::default();
        let a = random_piece(&mut StdRng::seed_from_u64(9), Vec2::zero(), Vec2::zero(), &p);
        let b = random_piece(&mut StdRng::seed_from_u64(9), Vec2::zero(), Vec2::zero(), &p);
        assert_eq!(a, b);
    }
}
