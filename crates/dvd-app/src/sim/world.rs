use rand::rngs::StdRng;
use rand::SeedableRng;

use dvd_framework::coords::Vec2;

use super::confetti::{random_piece, Confetti, ConfettiPolicy};
use super::{check_bounds, Bounds, Hit, Shape};

/// The bouncing logo, its confetti and the hit counters.
///
/// Pure simulation: no window, no GPU. The engine feeds it frame deltas.
pub struct World {
    bounds: Bounds,
    logo: Shape,
    confetti: Confetti,
    policy: ConfettiPolicy,
    rng: StdRng,

    walls_hit: u32,
    corners_hit: u32,
    confetti_on_screen: bool,
}

impl World {
    /// `seed` makes confetti reproducible; `None` seeds from entropy.
    ///
    /// A logo placed outside `bounds` is pulled inside without counting a hit.
    pub fn new(bounds: Bounds, mut logo: Shape, policy: ConfettiPolicy, seed: Option<u64>) -> Self {
        let start = logo.pos;
        check_bounds(&mut logo, bounds);
        if logo.pos != start {
            log::warn!("logo started outside the field and was moved inside");
        }

        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            bounds,
            logo,
            confetti: Confetti::new(),
            policy,
            rng,
            walls_hit: 0,
            corners_hit: 0,
            confetti_on_screen: false,
        }
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn logo(&self) -> &Shape {
        &self.logo
    }

    pub fn confetti(&self) -> &Confetti {
        &self.confetti
    }

    pub fn policy(&self) -> &ConfettiPolicy {
        &self.policy
    }

    pub fn walls_hit(&self) -> u32 {
        self.walls_hit
    }

    pub fn corners_hit(&self) -> u32 {
        self.corners_hit
    }

    pub fn confetti_on_screen(&self) -> bool {
        self.confetti_on_screen
    }

    /// Advances everything by `dt` seconds and returns what the logo hit.
    pub fn step(&mut self, dt: f32) -> Hit {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };

        self.logo.advance(dt);
        let hit = self.check_bounds();

        self.confetti.step(dt, self.bounds, &self.policy);
        self.confetti_on_screen = !self.confetti.is_empty();
        hit
    }

    /// Keeps the logo inside the field and updates the counters.
    pub fn check_bounds(&mut self) -> Hit {
        let hit = check_bounds(&mut self.logo, self.bounds);
        match hit {
            Hit::Wall => {
                self.walls_hit += 1;
                log::debug!("wall hit ({} total)", self.walls_hit);
            }
            Hit::Corner => {
                self.corners_hit += 1;
                log::debug!("corner hit ({} total)", self.corners_hit);
                for _ in 0..self.policy.per_corner_hit {
                    self.spawn_confetti();
                }
            }
            Hit::None => {}
        }
        hit
    }

    /// Adds one piece at the field corner nearest the logo, flying inward.
    pub fn spawn_confetti(&mut self) {
        let (corner, toward) = self.nearest_corner();
        let piece = random_piece(&mut self.rng, corner, toward, &self.policy);
        self.confetti.push(piece, &self.policy);
        self.confetti_on_screen = true;
    }

    /// Adds `policy.per_click` pieces at `at`, flying in every direction.
    pub fn spawn_burst(&mut self, at: Vec2) {
        let at = Vec2::new(
            at.x.clamp(0.0, self.bounds.width),
            at.y.clamp(0.0, self.bounds.height),
        );
        for _ in 0..self.policy.per_click {
            let piece = random_piece(&mut self.rng, at, Vec2::zero(), &self.policy);
            self.confetti.push(piece, &self.policy);
        }
        self.confetti_on_screen = !self.confetti.is_empty();
    }

    fn nearest_corner(&self) -> (Vec2, Vec2) {
        let right = self.logo.pos.x >= self.bounds.width * 0.5;
        let bottom = self.logo.pos.y >= self.bounds.height * 0.5;
        let corner = Vec2::new(
            if right { self.bounds.width } else { 0.0 },
            if bottom { self.bounds.height } else { 0.0 },
        );
        let toward = Vec2::new(if right { -1.0 } else { 1.0 }, if bottom { -1.0 } else { 1.0 });
        (corner, toward)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dvd_framework::paint::Color;

    const FIELD: Bounds = Bounds::new(800.0, 600.0);

    fn point_logo(pos: (f32, f32), vel: (f32, f32)) -> Shape {
        Shape::new(Vec2::new(pos.0, pos.1), Vec2::zero(), Vec2::new(vel.0, vel.1), Color::WHITE)
    }

    fn world(logo: Shape) -> World {
        World::new(FIELD, logo, ConfettiPolicy::default(), Some(1))
    }

    #[test]
    fn single_wall_hit_reflects_and_counts() {
        let mut w = world(point_logo((798.0, 300.0), (50.0, 0.0)));
        assert_eq!(w.step(0.1), Hit::Wall);

        assert_eq!(w.logo().vel, Vec2::new(-50.0, 0.0));
        assert_eq!(w.logo().pos.x, 800.0);
        assert_eq!(w.walls_hit(), 1);
        assert_eq!(w.corners_hit(), 0);
        assert!(w.confetti().is_empty());
        assert!(!w.confetti_on_screen());
    }

    #[test]
    fn corner_hit_counts_and_spawns_confetti() {
        let mut w = world(point_logo((798.0, 598.0), (50.0, 50.0)));
        assert_eq!(w.step(0.1), Hit::Corner);

        assert_eq!(w.logo().vel, Vec2::new(-50.0, -50.0));
        assert_eq!(w.logo().pos, Vec2::new(800.0, 600.0));
        assert_eq!(w.corners_hit(), 1);
        assert_eq!(w.walls_hit(), 0);
        assert_eq!(w.confetti().len(), 1);
        assert!(w.confetti_on_screen());
    }

    #[test]
    fn corner_hit_at_the_cap_replaces_the_oldest_piece() {
        let policy = ConfettiPolicy {
            max_pieces: 1,
            ..ConfettiPolicy::default()
        };
        let mut w = World::new(FIELD, point_logo((400.0, 300.0), (0.0, 0.0)), policy, Some(7));
        w.spawn_burst(Vec2::new(400.0, 300.0));
        assert_eq!(w.confetti().len(), 1);

        w.logo = point_logo((798.0, 598.0), (50.0, 50.0));
        assert_eq!(w.step(0.1), Hit::Corner);

        assert_eq!(w.corners_hit(), 1);
        assert_eq!(w.confetti().len(), 1);
        let piece = w.confetti().pieces()[0];
        // Spawned this step at the bottom-right corner, then aged once.
        assert_eq!(piece.age, 0.1);
        assert!(piece.shape.vel.x <= 0.0 && piece.shape.vel.y <= 0.0);
        assert!(piece.shape.pos.x > 700.0 && piece.shape.pos.y > 500.0);
    }

    #[test]
    fn corner_confetti_flies_inward_from_the_corner() {
        let mut w = world(point_logo((798.0, 598.0), (50.0, 50.0)));
        w.step(0.1);
        let piece = w.confetti().pieces()[0].shape;
        assert!(piece.vel.x <= 0.0 && piece.vel.y <= 0.0);
        assert!(piece.pos.x <= 800.0 && piece.pos.y <= 600.0);
    }

    #[test]
    fn spawning_never_touches_the_logo() {
        let mut w = world(point_logo((100.0, 100.0), (30.0, -40.0)));
        let before = *w.logo();
        for _ in 0..10 {
            w.spawn_confetti();
        }
        w.spawn_burst(Vec2::new(400.0, 300.0));
        assert_eq!(*w.logo(), before);
        assert_eq!(w.confetti().len(), 10 + w.policy().per_click);
    }

    #[test]
    fn burst_outside_field_is_clamped_in() {
        let mut w = world(point_logo((100.0, 100.0), (0.0, 0.0)));
        w.spawn_burst(Vec2::new(-50.0, 900.0));
        for p in w.confetti().pieces() {
            assert_eq!(p.shape.pos, Vec2::new(0.0, 600.0));
        }
    }

    #[test]
    fn confetti_flag_clears_after_expiry() {
        let mut w = world(point_logo((400.0, 300.0), (0.0, 0.0)));
        w.spawn_confetti();
        assert!(w.confetti_on_screen());

        // Steps are clamped upstream; a large one still ages pieces out.
        w.step(w.policy().lifetime + 1.0);
        assert!(!w.confetti_on_screen());
        assert!(w.confetti().is_empty());
    }

    #[test]
    fn logo_stays_in_field_over_long_runs() {
        let logo = Shape::new(
            Vec2::new(400.0, 300.0),
            Vec2::new(120.0, 60.0),
            Vec2::new(733.0, -517.0),
            Color::WHITE,
        );
        let mut w = world(logo);
        for i in 0..5000 {
            let dt = [0.0, 0.004, 0.016, 0.1, 0.25][i % 5];
            w.step(dt);
            let p = w.logo().pos;
            assert!((0.0..=800.0).contains(&p.x) && (0.0..=600.0).contains(&p.y));
        }
        assert!(w.walls_hit() + w.corners_hit() > 0);
    }

    #[test]
    fn logo_placed_outside_is_moved_in_without_a_hit() {
        let w = world(point_logo((900.0, -10.0), (10.0, -10.0)));
        assert_eq!(w.logo().pos, Vec2::new(800.0, 0.0));
        assert_eq!(w.logo().vel, Vec2::new(-10.0, 10.0));
        assert_eq!(w.walls_hit() + w.corners_hit(), 0);
    }

    #[test]
    fn negative_or_nan_dt_does_not_move() {
        let mut w = world(point_logo((400.0, 300.0), (50.0, 50.0)));
        w.step(-1.0);
        w.step(f32::NAN);
        assert_eq!(w.logo().pos, Vec2::new(400.0, 300.0));
    }
}
