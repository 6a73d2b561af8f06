use foundation::bounds::Aabb3;
use foundation::math::precision::stable_total_cmp_f64;

/// A deterministic bounding volume hierarchy over pick targets.
///
/// Ordering contract:
/// - `query_ray` returns target indices in ascending order.
#[derive(Debug, Clone, Default)]
pub struct Bvh {
    nodes: Vec<Node>,
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        bounds: Aabb3,
        items: Vec<Item>,
    },
    Internal {
        bounds: Aabb3,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Item {
    /// Index into the caller's target list.
    pub target: u32,
    pub bounds: Aabb3,
}

impl Bvh {
    pub fn build(items: Vec<Item>) -> Self {
        let mut nodes = Vec::new();
        let mut items = items;
        if !items.is_empty() {
            build_node(&mut nodes, &mut items);
        }
        Self { nodes }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Targets whose bounds intersect the ray segment `[t_min, t_max]`.
    ///
    /// `dir` need not be normalized; `t` is measured in units of `dir`.
    pub fn query_ray(&self, origin: [f64; 3], dir: [f64; 3], t_min: f64, t_max: f64) -> Vec<u32> {
        if self.nodes.is_empty() {
            return Vec::new();
        }

        let mut hits: Vec<u32> = Vec::new();
        let mut stack: Vec<usize> = vec![0];

        while let Some(idx) = stack.pop() {
            match &self.nodes[idx] {
                Node::Leaf { bounds, items } => {
                    if !ray_intersects_aabb(origin, dir, bounds, t_min, t_max) {
                        continue;
                    }
                    for item in items {
                        if ray_intersects_aabb(origin, dir, &item.bounds, t_min, t_max) {
                            hits.push(item.target);
                        }
                    }
                }
                Node::Internal {
                    bounds,
                    left,
                    right,
                } => {
                    if !ray_intersects_aabb(origin, dir, bounds, t_min, t_max) {
                        continue;
                    }
                    stack.push(*right);
                    stack.push(*left);
                }
            }
        }

        hits.sort_unstable();
        hits.dedup();
        hits
    }
}

const LEAF_MAX: usize = 8;

fn build_node(nodes: &mut Vec<Node>, items: &mut [Item]) -> usize {
    let bounds = bounds_for_items(items);
    if items.len() <= LEAF_MAX {
        let idx = nodes.len();
        nodes.push(Node::Leaf {
            bounds,
            items: items.to_vec(),
        });
        return idx;
    }

    let axis = split_axis(&bounds);
    items.sort_by(|a, b| {
        let ca = centroid_axis(&a.bounds, axis);
        let cb = centroid_axis(&b.bounds, axis);
        stable_total_cmp_f64(ca, cb).then_with(|| a.target.cmp(&b.target))
    });

    let mid = items.len() / 2;
    let (left_items, right_items) = items.split_at_mut(mid);

    let idx = nodes.len();
    // Placeholder; patched after children are built.
    nodes.push(Node::Leaf {
        bounds,
        items: Vec::new(),
    });

    let left = build_node(nodes, left_items);
    let right = build_node(nodes, right_items);

    nodes[idx] = Node::Internal {
        bounds,
        left,
        right,
    };
    idx
}

fn centroid_axis(aabb: &Aabb3, axis: usize) -> f64 {
    (aabb.min[axis] + aabb.max[axis]) * 0.5
}

fn split_axis(bounds: &Aabb3) -> usize {
    let ex = bounds.max[0] - bounds.min[0];
    let ey = bounds.max[1] - bounds.min[1];
    let ez = bounds.max[2] - bounds.min[2];

    // Deterministic tie-break: prefer X, then Y, then Z.
    if ex >= ey && ex >= ez {
        0
    } else if ey >= ez {
        1
    } else {
        2
    }
}

fn bounds_for_items(items: &[Item]) -> Aabb3 {
    items
        .iter()
        .fold(Aabb3::empty(), |acc, item| acc.union(&item.bounds))
}

fn ray_intersects_aabb(
    origin: [f64; 3],
    dir: [f64; 3],
    aabb: &Aabb3,
    mut t_min: f64,
    mut t_max: f64,
) -> bool {
    for axis in 0..3 {
        let o = origin[axis];
        let d = dir[axis];
        let min = aabb.min[axis];
        let max = aabb.max[axis];

        if d.abs() < 1e-12 {
            if o < min || o > max {
                return false;
            }
            continue;
        }

        let inv = 1.0 / d;
        let mut t1 = (min - o) * inv;
        let mut t2 = (max - o) * inv;
        if t1 > t2 {
            std::mem::swap(&mut t1, &mut t2);
        }

        t_min = t_min.max(t1);
        t_max = t_max.min(t2);
        if t_max < t_min {
            return false;
        }
    }

    true
}
