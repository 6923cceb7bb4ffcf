use super::Shape;

/// The playfield: `[0, width] × [0, height]` in pixels.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Bounds {
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn contains_center(&self, shape: &Shape) -> bool {
        (0.0..=self.width).contains(&shape.pos.x) && (0.0..=self.height).contains(&shape.pos.y)
    }
}

/// Outcome of a bounds check.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Hit {
    None,
    /// Exactly one axis reflected.
    Wall,
    /// Both axes reflected in the same step.
    Corner,
}

/// Reflects `shape` off the edges of `bounds` and clamps it back inside.
///
/// Per axis: when the leading edge is past a boundary and the shape is moving
/// outward, that velocity component is negated. A shape past a boundary is
/// always clamped so its edge sits on it, whichever way it moves.
pub fn check_bounds(shape: &mut Shape, bounds: Bounds) -> Hit {
    let half = shape.half_size();
    let x = reflect_axis(&mut shape.pos.x, &mut shape.vel.x, half.x, bounds.width);
    let y = reflect_axis(&mut shape.pos.y, &mut shape.vel.y, half.y, bounds.height);

    match (x, y) {
        (true, true) => Hit::Corner,
        (true, false) | (false, true) => Hit::Wall,
        (false, false) => Hit::None,
    }
}

fn reflect_axis(pos: &mut f32, vel: &mut f32, half: f32, extent: f32) -> bool {
    // A shape larger than the field is pinned to its middle.
    let lo = half.min(extent * 0.5);
    let hi = (extent - half).max(extent * 0.5);

    if !pos.is_finite() {
        *pos = extent * 0.5;
        return false;
    }

    if *pos < lo {
        *pos = lo;
        if *vel < 0.0 {
            *vel = -*vel;
            return true;
        }
    } else if *pos > hi {
        *pos = hi;
        if *vel > 0.0 {
            *vel = -*vel;
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use dvd_framework::coords::Vec2;
    use dvd_framework::paint::Color;

    const FIELD: Bounds = Bounds::new(800.0, 600.0);

    fn shape(pos: (f32, f32), size: (f32, f32), vel: (f32, f32)) -> Shape {
        Shape::new(
            Vec2::new(pos.0, pos.1),
            Vec2::new(size.0, size.1),
            Vec2::new(vel.0, vel.1),
            Color::WHITE,
        )
    }

    #[test]
    fn inside_is_untouched() {
        let mut s = shape((400.0, 300.0), (20.0, 20.0), (5.0, 5.0));
        let before = s;
        assert_eq!(check_bounds(&mut s, FIELD), Hit::None);
        assert_eq!(s, before);
    }

    #[test]
    fn right_wall_reflects_and_clamps_point() {
        let mut s = shape((803.0, 300.0), (0.0, 0.0), (50.0, 0.0));
        assert_eq!(check_bounds(&mut s, FIELD), Hit::Wall);
        assert_eq!(s.pos, Vec2::new(800.0, 300.0));
        assert_eq!(s.vel, Vec2::new(-50.0, 0.0));
    }

    #[test]
    fn sized_shape_clamps_by_its_edge() {
        let mut s = shape((-3.0, 300.0), (20.0, 10.0), (-10.0, 0.0));
        assert_eq!(check_bounds(&mut s, FIELD), Hit::Wall);
        assert_eq!(s.pos.x, 10.0);
        assert_eq!(s.vel.x, 10.0);
    }

    #[test]
    fn both_axes_is_a_corner() {
        let mut s = shape((803.0, 603.0), (0.0, 0.0), (50.0, 50.0));
        assert_eq!(check_bounds(&mut s, FIELD), Hit::Corner);
        assert_eq!(s.vel, Vec2::new(-50.0, -50.0));
        assert_eq!(s.pos, Vec2::new(800.0, 600.0));
    }

    #[test]
    fn moving_inward_clamps_without_reflecting() {
        let mut s = shape((810.0, 300.0), (0.0, 0.0), (-50.0, 0.0));
        assert_eq!(check_bounds(&mut s, FIELD), Hit::None);
        assert_eq!(s.pos.x, 800.0);
        assert_eq!(s.vel.x, -50.0);
    }

    #[test]
    fn oversized_shape_is_pinned_to_the_middle() {
        let mut s = shape((100.0, 300.0), (1000.0, 10.0), (30.0, 0.0));
        check_bounds(&mut s, FIELD);
        assert_eq!(s.pos.x, 400.0);
        assert!(FIELD.contains_center(&s));
    }

    #[test]
    fn non_finite_position_is_recentred() {
        let mut s = shape((f32::NAN, 300.0), (0.0, 0.0), (1.0, 0.0));
        assert_eq!(check_bounds(&mut s, FIELD), Hit::None);
        assert!(FIELD.contains_center(&s));
    }

    #[test]
    fn center_stays_in_field_for_any_step() {
        let steps = [0.0, 0.016, 0.1, 0.25, 3.0, 100.0];
        let velocities = [(900.0, -700.0), (-1.0e4, 3.0), (0.0, 0.0), (123.0, 456.0)];
        for &dt in &steps {
            for &v in &velocities {
                let mut s = shape((400.0, 300.0), (120.0, 60.0), v);
                for _ in 0..20 {
                    s.advance(dt);
                    check_bounds(&mut s, FIELD);
                    assert!(FIELD.contains_center(&s), "dt={dt} v={v:?} pos={:?}", s.pos);
                }
            }
        }
    }
}
