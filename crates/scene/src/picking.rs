use std::cmp::Ordering;

use foundation::bounds::Aabb3;
use foundation::math::Vec3;
use foundation::math::precision::stable_total_cmp_f64;

use crate::entity::EntityKey;
use crate::spatial::{Bvh, Item as BvhItem};

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub dir: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, dir: Vec3) -> Self {
        Self { origin, dir }
    }

    pub fn at(&self, t: f64) -> Vec3 {
        self.origin + self.dir.scale(t)
    }
}

/// Which hits win when several targets lie under the pointer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PickPriority {
    City,
    Region,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PickShape {
    /// Map-local triangles, tested double-sided.
    Triangles(Vec<[Vec3; 3]>),
    /// Flat disc facing `+z`.
    Disc { center: Vec3, radius: f64 },
}

impl PickShape {
    fn bounds(&self) -> Aabb3 {
        let mut b = Aabb3::empty();
        match self {
            PickShape::Triangles(tris) => {
                for tri in tris {
                    for v in tri {
                        b.include([v.x, v.y, v.z]);
                    }
                }
            }
            PickShape::Disc { center, radius } => {
                b.include([center.x - radius, center.y - radius, center.z]);
                b.include([center.x + radius, center.y + radius, center.z]);
            }
        }
        b
    }

    fn intersect(&self, ray: &Ray) -> Option<f64> {
        match self {
            PickShape::Triangles(tris) => tris
                .iter()
                .filter_map(|tri| ray_triangle(ray, tri))
                .min_by(|a, b| stable_total_cmp_f64(*a, *b)),
            PickShape::Disc { center, radius } => ray_disc(ray, *center, *radius),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PickTarget {
    pub entity: EntityKey,
    pub priority: PickPriority,
    pub shape: PickShape,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PickHit {
    pub entity: EntityKey,
    pub priority: PickPriority,
    /// In units of the query ray's direction.
    pub t: f64,
    pub point: Vec3,
}

/// Pick targets plus a BVH over them, built once per scene.
///
/// Ordering contract:
/// - Any city hit beats any region hit.
/// - Within a priority class the smallest `t` wins; exact ties go to the
///   lower `EntityKey`.
#[derive(Debug, Clone, Default)]
pub struct PickIndex {
    targets: Vec<PickTarget>,
    bvh: Bvh,
}

impl PickIndex {
    pub fn build(targets: Vec<PickTarget>) -> Self {
        let items = targets
            .iter()
            .enumerate()
            .filter_map(|(i, t)| {
                let bounds = t.shape.bounds();
                (!bounds.is_empty()).then_some(BvhItem {
                    target: i as u32,
                    bounds,
                })
            })
            .collect();
        Self {
            bvh: Bvh::build(items),
            targets,
        }
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Distinct entities with at least one target.
    pub fn entity_count(&self) -> usize {
        let mut keys: Vec<EntityKey> = self.targets.iter().map(|t| t.entity).collect();
        keys.sort_unstable();
        keys.dedup();
        keys.len()
    }

    /// `ray` is in the same (map-local) space as the targets.
    pub fn pick(&self, ray: &Ray) -> Option<PickHit> {
        let origin = [ray.origin.x, ray.origin.y, ray.origin.z];
        let dir = [ray.dir.x, ray.dir.y, ray.dir.z];
        let mut best: Option<PickHit> = None;

        for idx in self.bvh.query_ray(origin, dir, 0.0, f64::MAX) {
            let Some(target) = self.targets.get(idx as usize) else {
                continue;
            };
            let Some(t) = target.shape.intersect(ray) else {
                continue;
            };
            let hit = PickHit {
                entity: target.entity,
                priority: target.priority,
                t,
                point: ray.at(t),
            };
            best = match best {
                Some(b) if compare_hits(&b, &hit).is_le() => Some(b),
                _ => Some(hit),
            };
        }
        best
    }
}

fn compare_hits(a: &PickHit, b: &PickHit) -> Ordering {
    a.priority
        .cmp(&b.priority)
        .then_with(|| stable_total_cmp_f64(a.t, b.t))
        .then_with(|| a.entity.cmp(&b.entity))
}

const EPS: f64 = 1e-12;

/// Möller–Trumbore, double-sided. Returns `t >= 0`.
fn ray_triangle(ray: &Ray, tri: &[Vec3; 3]) -> Option<f64> {
    let e1 = tri[1] - tri[0];
    let e2 = tri[2] - tri[0];
    let p = ray.dir.cross(e2);
    let det = e1.dot(p);
    if det.abs() < EPS {
        return None;
    }
    let inv = 1.0 / det;
    let s = ray.origin - tri[0];
    let u = s.dot(p) * inv;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let q = s.cross(e1);
    let v = ray.dir.dot(q) * inv;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = e2.dot(q) * inv;
    (t >= 0.0).then_some(t)
}

fn ray_disc(ray: &Ray, center: Vec3, radius: f64) -> Option<f64> {
    if ray.dir.z.abs() < EPS {
        return None;
    }
    let t = (center.z - ray.origin.z) / ray.dir.z;
    if t < 0.0 {
        return None;
    }
    let p = ray.at(t);
    let (dx, dy) = (p.x - center.x, p.y - center.y);
    (dx * dx + dy * dy <= radius * radius).then_some(t)
}

#[cfg(test)]
mod tests {
    use super::{PickIndex, PickPriority, PickShape, PickTarget, Ray};
    use crate::entity::EntityKey;
    use foundation::math::Vec3;

    fn quad(z: f64, half: f64) -> PickShape {
        let a = Vec3::new(-half, -half, z);
        let b = Vec3::new(half, -half, z);
        let c = Vec3::new(half, half, z);
        let d = Vec3::new(-half, half, z);
        PickShape::Triangles(vec![[a, b, c], [a, c, d]])
    }

    fn down(x: f64, y: f64) -> Ray {
        Ray::new(Vec3::new(x, y, 130.0), Vec3::new(0.0, 0.0, -1.0))
    }

    #[test]
    fn city_beats_region_even_when_farther() {
        let index = PickIndex::build(vec![
            PickTarget {
                entity: EntityKey(0),
                priority: PickPriority::Region,
                shape: quad(7.0, 10.0),
            },
            PickTarget {
                entity: EntityKey(1),
                priority: PickPriority::City,
                shape: PickShape::Disc {
                    center: Vec3::new(1.0, 1.0, 6.22),
                    radius: 1.2,
                },
            },
        ]);
        let hit = index.pick(&down(1.5, 1.0)).expect("hit");
        assert_eq!(hit.entity, EntityKey(1));

        let miss_city = index.pick(&down(-5.0, -5.0)).expect("region");
        assert_eq!(miss_city.entity, EntityKey(0));
        assert!((miss_city.point.z - 7.0).abs() < 1e-9);
    }

    #[test]
    fn nearest_region_wins_and_ties_go_to_lower_key() {
        let index = PickIndex::build(vec![
            PickTarget {
                entity: EntityKey(3),
                priority: PickPriority::Region,
                shape: quad(6.0, 5.0),
            },
            PickTarget {
                entity: EntityKey(2),
                priority: PickPriority::Region,
                shape: quad(6.0, 5.0),
            },
            PickTarget {
                entity: EntityKey(4),
                priority: PickPriority::Region,
                shape: quad(2.0, 5.0),
            },
        ]);
        assert_eq!(index.pick(&down(0.0, 0.0)).map(|h| h.entity), Some(EntityKey(2)));
        assert_eq!(index.entity_count(), 3);
    }

    #[test]
    fn ray_outside_every_shape_misses() {
        let index = PickIndex::build(vec![PickTarget {
            entity: EntityKey(0),
            priority: PickPriority::Region,
            shape: quad(6.0, 1.0),
        }]);
        assert!(index.pick(&down(3.0, 3.0)).is_none());
        let up = Ray::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 1.0));
        assert!(index.pick(&Ray::new(Vec3::new(0.0, 0.0, 10.0), up.dir)).is_none());
    }
}
