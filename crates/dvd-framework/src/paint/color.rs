/// Linear premultiplied RGBA color.
///
/// Invariant:
/// - `rgb` components are expected to be multiplied by `a` (premultiplied alpha).
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Color {
    pub r: f32, // premultiplied
    pub g: f32, // premultiplied
    pub b: f32, // premultiplied
    pub a: f32,
}

impl Color {
    pub const WHITE: Color = Color::from_premul(1.0, 1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::from_premul(0.0, 0.0, 0.0, 1.0);

    #[inline]
    pub const fn transparent() -> Self {
        Self { r: 0.0, g: 0.0, b: 0.0, a: 0.0 }
    }

    /// Creates a premultiplied color from straight RGBA bytes (`0`–`255`).
    #[inline]
    pub fn from_srgb_u8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::from_straight(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0, a as f32 / 255.0)
    }

    /// Creates a premultiplied color from premultiplied components.
    #[inline]
    pub const fn from_premul(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Creates a premultiplied color from straight alpha components.
    #[inline]
    pub fn from_straight(r: f32, g: f32, b: f32, a: f32) -> Self {
        let a = a.clamp(0.0, 1.0);
        Self {
            r: (r.clamp(0.0, 1.0)) * a,
            g: (g.clamp(0.0, 1.0)) * a,
            b: (b.clamp(0.0, 1.0)) * a,
            a,
        }
    }

    /// Opaque color from hue (degrees, wrapped), saturation and value in `[0, 1]`.
    pub fn from_hsv(hue: f32, saturation: f32, value: f32) -> Self {
        let h = hue.rem_euclid(360.0) / 60.0;
        let s = saturation.clamp(0.0, 1.0);
        let v = value.clamp(0.0, 1.0);

        let c = v * s;
        let x = c * (1.0 - (h % 2.0 - 1.0).abs());
        let m = v - c;

        let (r, g, b) = match h as u32 {
            0 => (c, x, 0.0),
            1 => (x, c, 0.0),
            2 => (0.0, c, x),
            3 => (0.0, x, c),
            4 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };

        Self::from_straight(r + m, g + m, b + m, 1.0)
    }

    /// Returns a straight-alpha representation.
    ///
    /// For `a == 0`, RGB is returned as 0.
    #[inline]
    pub fn to_straight(self) -> (f32, f32, f32, f32) {
        if self.a <= 0.0 {
            (0.0, 0.0, 0.0, 0.0)
        } else {
            let inv = 1.0 / self.a;
            (self.r * inv, self.g * inv, self.b * inv, self.a)
        }
    }

    /// Scales opacity by `factor` (clamped to `[0, 1]`), keeping premultiplication.
    #[inline]
    pub fn faded(self, factor: f32) -> Self {
        let f = factor.clamp(0.0, 1.0);
        Self {
            r: self.r * f,
            g: self.g * f,
            b: self.b * f,
            a: self.a * f,
        }
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.r.is_finite() && self.g.is_finite() && self.b.is_finite() && self.a.is_finite()
    }

    #[inline]
    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn straight_alpha_is_premultiplied() {
        let c = Color::from_straight(1.0, 0.5, 0.0, 0.5);
        assert!(approx(c.r, 0.5));
        assert!(approx(c.g, 0.25));
        assert!(approx(c.a, 0.5));
    }

    #[test]
    fn to_straight_undoes_premultiplication() {
        let (r, g, b, a) = Color::from_straight(0.2, 0.4, 0.6, 0.5).to_straight();
        assert!(approx(r, 0.2) && approx(g, 0.4) && approx(b, 0.6) && approx(a, 0.5));
    }

    #[test]
    fn hsv_primaries() {
        let red = Color::from_hsv(0.0, 1.0, 1.0);
        assert_eq!(red.to_array(), [1.0, 0.0, 0.0, 1.0]);

        let green = Color::from_hsv(120.0, 1.0, 1.0);
        assert!(approx(green.g, 1.0) && approx(green.r, 0.0));

        let blue = Color::from_hsv(240.0, 1.0, 1.0);
        assert!(approx(blue.b, 1.0) && approx(blue.g, 0.0));
    }

    #[test]
    fn hsv_wraps_hue() {
        assert_eq!(Color::from_hsv(360.0, 1.0, 1.0), Color::from_hsv(0.0, 1.0, 1.0));
        assert_eq!(Color::from_hsv(-120.0, 1.0, 1.0), Color::from_hsv(240.0, 1.0, 1.0));
    }

    #[test]
    fn faded_keeps_premultiplication() {
        let c = Color::from_straight(1.0, 1.0, 1.0, 1.0).faded(0.25);
        assert!(approx(c.a, 0.25));
        assert!(c.r <= c.a + f32::EPSILON);
    }

    #[test]
    fn faded_clamps_factor() {
        assert_eq!(Color::WHITE.faded(2.0), Color::WHITE);
        assert_eq!(Color::WHITE.faded(-1.0).a, 0.0);
    }
}
