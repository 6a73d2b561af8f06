use foundation::bounds::Aabb3;
use foundation::math::Vec3;

/// Local-space bounds of a node's geometry.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ComponentBounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl ComponentBounds {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn from_points(points: &[[f32; 3]]) -> Option<Self> {
        let mut aabb = Aabb3::empty();
        for p in points {
            aabb.include([p[0] as f64, p[1] as f64, p[2] as f64]);
        }
        if aabb.is_empty() {
            return None;
        }
        Some(Self::from_aabb(&aabb))
    }

    pub fn from_aabb(aabb: &Aabb3) -> Self {
        Self {
            min: Vec3::new(aabb.min[0], aabb.min[1], aabb.min[2]),
            max: Vec3::new(aabb.max[0], aabb.max[1], aabb.max[2]),
        }
    }
}
