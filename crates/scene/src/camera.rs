use foundation::math::{Vec2, Vec3};

use crate::picking::Ray;

/// Drawable area in CSS pixels.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn aspect(&self) -> f64 {
        if self.height > 0.0 {
            self.width / self.height
        } else {
            1.0
        }
    }

    pub fn is_degenerate(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    pub fn contains(&self, px: Vec2) -> bool {
        px.x >= 0.0 && px.y >= 0.0 && px.x <= self.width && px.y <= self.height
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PerspectiveCamera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov_y_deg: f64,
    pub near: f64,
    pub far: f64,
}

impl Default for PerspectiveCamera {
    /// Straight down onto the map plane from `z = 130`.
    fn default() -> Self {
        Self::look_at(Vec3::new(0.0, 0.0, 130.0), Vec3::ZERO, 30.0, 0.1, 1000.0)
    }
}

/// Orthonormal view basis.
struct Basis {
    forward: Vec3,
    right: Vec3,
    up: Vec3,
}

impl PerspectiveCamera {
    pub fn look_at(position: Vec3, target: Vec3, fov_y_deg: f64, near: f64, far: f64) -> Self {
        Self {
            position,
            target,
            up: Vec3::new(0.0, 1.0, 0.0),
            fov_y_deg,
            near,
            far,
        }
    }

    fn basis(&self) -> Option<Basis> {
        let forward = (self.target - self.position).normalize()?;
        let right = forward.cross(self.up).normalize()?;
        let up = right.cross(forward);
        Some(Basis { forward, right, up })
    }

    fn tan_half_fov(&self) -> f64 {
        (self.fov_y_deg.to_radians() * 0.5).tan()
    }

    /// World-space ray through a pixel (origin top-left).
    pub fn ray_from_screen(&self, px: Vec2, viewport: Viewport) -> Option<Ray> {
        if viewport.is_degenerate() || !px.is_finite() {
            return None;
        }
        let b = self.basis()?;
        let ndc_x = 2.0 * px.x / viewport.width - 1.0;
        let ndc_y = 1.0 - 2.0 * px.y / viewport.height;
        let th = self.tan_half_fov();
        let dir = b.forward
            + b.right.scale(ndc_x * th * viewport.aspect())
            + b.up.scale(ndc_y * th);
        Some(Ray::new(self.position, dir.normalize()?))
    }

    /// Pixel position of a world point, or `None` behind the near plane.
    pub fn project_to_screen(&self, world: Vec3, viewport: Viewport) -> Option<Vec2> {
        if viewport.is_degenerate() {
            return None;
        }
        let b = self.basis()?;
        let d = world - self.position;
        let depth = d.dot(b.forward);
        if depth <= self.near || depth > self.far {
            return None;
        }
        let th = self.tan_half_fov();
        let ndc_x = d.dot(b.right) / (depth * th * viewport.aspect());
        let ndc_y = d.dot(b.up) / (depth * th);
        Some(Vec2::new(
            (ndc_x + 1.0) * 0.5 * viewport.width,
            (1.0 - ndc_y) * 0.5 * viewport.height,
        ))
    }
}
