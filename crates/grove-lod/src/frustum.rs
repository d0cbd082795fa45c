//! View frustum extracted from a view-projection matrix, with point and
//! sphere membership tests.

use glam::{Mat4, Vec3, Vec4};

/// Plane indices into the frustum planes array.
const LEFT: usize = 0;
const RIGHT: usize = 1;
const BOTTOM: usize = 2;
const TOP: usize = 3;
const NEAR: usize = 4;
const FAR: usize = 5;

/// A view frustum defined by six inward-pointing planes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Frustum {
    /// Six planes: left, right, bottom, top, near, far.
    /// Each `Vec4(a, b, c, d)` where `(a,b,c)` is the normalized inward
    /// normal and `d` is the signed distance term.
    planes: [Vec4; 6],
}

impl Frustum {
    /// Extract frustum planes from a combined view-projection matrix
    /// using the Gribb-Hartmann method.
    ///
    /// Assumes a `[0, 1]` clip depth range (the glam/wgpu convention). The
    /// near and far constraints `0 <= z <= w` are symmetric, so reverse-Z
    /// projections work unchanged.
    pub fn from_view_projection(vp: &Mat4) -> Self {
        let rows = [vp.row(0), vp.row(1), vp.row(2), vp.row(3)];

        let mut planes = [Vec4::ZERO; 6];
        planes[LEFT] = rows[3] + rows[0];
        planes[RIGHT] = rows[3] - rows[0];
        planes[BOTTOM] = rows[3] + rows[1];
        planes[TOP] = rows[3] - rows[1];
        planes[NEAR] = rows[2];
        planes[FAR] = rows[3] - rows[2];

        for plane in &mut planes {
            let len = plane.truncate().length();
            if len > 0.0 {
                *plane /= len;
            }
        }

        Self { planes }
    }

    /// Signed distance from `point` to plane `i`; negative is outside.
    fn signed_distance(&self, i: usize, point: Vec3) -> f32 {
        let plane = self.planes[i];
        plane.truncate().dot(point) + plane.w
    }

    /// Returns `true` if `point` lies inside or on the frustum.
    pub fn contains_point(&self, point: Vec3) -> bool {
        (0..6).all(|i| self.signed_distance(i, point) >= 0.0)
    }

    /// Returns `true` if the sphere is at least partially inside the frustum.
    ///
    /// Conservative near frustum corners: may accept a sphere that is just
    /// outside, never rejects a visible one.
    pub fn intersects_sphere(&self, center: Vec3, radius: f32) -> bool {
        (0..6).all(|i| self.signed_distance(i, center) >= -radius)
    }
}
