use glam::{Mat4, Vec4};

use super::{Vec2, Viewport};

/// Fixed orthographic projection from logical pixels to clip space.
///
/// Built once from the window size. Top-left origin, +Y down, so `(0, 0)` maps to
/// the top-left corner of the surface and `(width, height)` to the bottom-right.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Projection {
    viewport: Viewport,
    matrix: Mat4,
}

impl Projection {
    pub fn orthographic(viewport: Viewport) -> Self {
        let w = viewport.width.max(1.0);
        let h = viewport.height.max(1.0);
        Self {
            viewport,
            matrix: Mat4::orthographic_rh(0.0, w, h, 0.0, -1.0, 1.0),
        }
    }

    #[inline]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    #[inline]
    pub fn matrix(&self) -> Mat4 {
        self.matrix
    }

    /// Column-major matrix in the layout WGSL expects for `mat4x4<f32>`.
    #[inline]
    pub fn to_cols_array_2d(&self) -> [[f32; 4]; 4] {
        self.matrix.to_cols_array_2d()
    }

    /// Maps a logical-pixel point to normalized device coordinates.
    pub fn to_ndc(&self, p: Vec2) -> Vec2 {
        let clip = self.matrix * Vec4::new(p.x, p.y, 0.0, 1.0);
        Vec2::new(clip.x / clip.w, clip.y / clip.w)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Vec2, b: Vec2) -> bool {
        (a.x - b.x).abs() < 1e-5 && (a.y - b.y).abs() < 1e-5
    }

    #[test]
    fn top_left_maps_to_upper_left_ndc() {
        let p = Projection::orthographic(Viewport::new(800.0, 600.0));
        assert!(close(p.to_ndc(Vec2::new(0.0, 0.0)), Vec2::new(-1.0, 1.0)));
    }

    #[test]
    fn bottom_right_maps_to_lower_right_ndc() {
        let p = Projection::orthographic(Viewport::new(800.0, 600.0));
        assert!(close(p.to_ndc(Vec2::new(800.0, 600.0)), Vec2::new(1.0, -1.0)));
    }

    #[test]
    fn center_maps_to_origin() {
        let p = Projection::orthographic(Viewport::new(800.0, 600.0));
        assert!(close(p.to_ndc(Vec2::new(400.0, 300.0)), Vec2::zero()));
    }

    #[test]
    fn degenerate_viewport_stays_finite() {
        let p = Projection::orthographic(Viewport::new(0.0, 0.0));
        assert!(p.to_ndc(Vec2::new(1.0, 1.0)).is_finite());
    }
}
