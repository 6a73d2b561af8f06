//! Scale + translation transforms.
//!
//! The map root is only ever scaled and translated, so a full 4x4 matrix
//! is not needed. The linear part is stored as a 3x3 for generality.

use super::Vec3;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Affine3 {
    /// Row-major linear part.
    pub m: [[f64; 3]; 3],
    pub t: Vec3,
}

impl Default for Affine3 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Affine3 {
    pub const IDENTITY: Affine3 = Affine3 {
        m: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
        t: Vec3::ZERO,
    };

    pub fn from_scale_translation(scale: f64, t: Vec3) -> Self {
        Self {
            m: [[scale, 0.0, 0.0], [0.0, scale, 0.0], [0.0, 0.0, scale]],
            t,
        }
    }

    /// Per-axis scale; the map root scales `x`/`y` and keeps `z` at 1.
    pub fn from_scale3_translation(scale: Vec3, t: Vec3) -> Self {
        Self {
            m: [
                [scale.x, 0.0, 0.0],
                [0.0, scale.y, 0.0],
                [0.0, 0.0, scale.z],
            ],
            t,
        }
    }

    pub fn transform_vector(&self, v: Vec3) -> Vec3 {
        let m = &self.m;
        Vec3::new(
            m[0][0] * v.x + m[0][1] * v.y + m[0][2] * v.z,
            m[1][0] * v.x + m[1][1] * v.y + m[1][2] * v.z,
            m[2][0] * v.x + m[2][1] * v.y + m[2][2] * v.z,
        )
    }

    pub fn transform_point(&self, p: Vec3) -> Vec3 {
        self.transform_vector(p) + self.t
    }

    /// `self` applied after `inner`.
    pub fn then(&self, inner: &Affine3) -> Affine3 {
        let mut m = [[0.0; 3]; 3];
        for (r, row) in m.iter_mut().enumerate() {
            for (c, cell) in row.iter_mut().enumerate() {
                *cell = (0..3).map(|k| self.m[r][k] * inner.m[k][c]).sum();
            }
        }
        Affine3 {
            m,
            t: self.transform_point(inner.t),
        }
    }

    /// Inverse, or `None` when the linear part is singular.
    pub fn inverse(&self) -> Option<Affine3> {
        let m = &self.m;
        let det = m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
            - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
            + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0]);
        if !det.is_finite() || det.abs() < 1e-12 {
            return None;
        }
        let inv_det = 1.0 / det;
        let inv = [
            [
                (m[1][1] * m[2][2] - m[1][2] * m[2][1]) * inv_det,
                (m[0][2] * m[2][1] - m[0][1] * m[2][2]) * inv_det,
                (m[0][1] * m[1][2] - m[0][2] * m[1][1]) * inv_det,
            ],
            [
                (m[1][2] * m[2][0] - m[1][0] * m[2][2]) * inv_det,
                (m[0][0] * m[2][2] - m[0][2] * m[2][0]) * inv_det,
                (m[0][2] * m[1][0] - m[0][0] * m[1][2]) * inv_det,
            ],
            [
                (m[1][0] * m[2][1] - m[1][1] * m[2][0]) * inv_det,
                (m[0][1] * m[2][0] - m[0][0] * m[2][1]) * inv_det,
                (m[0][0] * m[1][1] - m[0][1] * m[1][0]) * inv_det,
            ],
        ];
        let linear = Affine3 {
            m: inv,
            t: Vec3::ZERO,
        };
        let t = -linear.transform_vector(self.t);
        Some(Affine3 { m: inv, t })
    }
}
