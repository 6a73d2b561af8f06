use foundation::math::Vec3;

/// Node placement inside the map root: translation plus uniform scale.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub scale: f64,
}

impl Transform {
    pub fn identity() -> Self {
        Self {
            position: Vec3::ZERO,
            scale: 1.0,
        }
    }

    pub fn translate(position: Vec3) -> Self {
        Self {
            position,
            scale: 1.0,
        }
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    pub fn apply(&self, local: Vec3) -> Vec3 {
        self.position + local.scale(self.scale)
    }
}
