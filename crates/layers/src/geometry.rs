//! Mesh primitives for markers, plus the extruded region solid.

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use earcutr::earcut;
use foundation::color::Color;
use foundation::math::{Vec2, Vec3};
use scene::resources::{GeometryBuffer, Texture};

const DEGENERATE_AREA_RATIO: f64 = 1e-9;

/// Filled disc in the `z = 0` plane as a triangle fan.
pub fn disc(radius: f64, segments: usize) -> GeometryBuffer {
    let segments = segments.max(3);
    let mut positions = vec![[0.0f32; 3]];
    for i in 0..segments {
        let a = TAU * i as f64 / segments as f64;
        positions.push(vertex(a.cos() * radius, a.sin() * radius, 0.0));
    }
    let mut indices = Vec::with_capacity(segments * 3);
    for i in 0..segments as u32 {
        let next = (i + 1) % segments as u32;
        indices.extend_from_slice(&[0, i + 1, next + 1]);
    }
    GeometryBuffer::triangles(positions, indices)
}

/// Flat annulus in the `z = 0` plane.
pub fn ring(inner: f64, outer: f64, segments: usize) -> GeometryBuffer {
    let segments = segments.max(3);
    let mut positions = Vec::with_capacity(segments * 2);
    for i in 0..segments {
        let a = TAU * i as f64 / segments as f64;
        let (s, c) = a.sin_cos();
        positions.push(vertex(c * inner, s * inner, 0.0));
        positions.push(vertex(c * outer, s * outer, 0.0));
    }
    let mut indices = Vec::with_capacity(segments * 6);
    for i in 0..segments as u32 {
        let next = (i + 1) % segments as u32;
        let (a, b) = (i * 2, i * 2 + 1);
        let (c, d) = (next * 2, next * 2 + 1);
        indices.extend_from_slice(&[a, b, d, a, d, c]);
    }
    GeometryBuffer::triangles(positions, indices)
}

/// Star outline starting at the top, alternating outer and inner radius.
pub fn star(outer: f64, inner: f64, points: usize) -> GeometryBuffer {
    let points = points.max(2);
    let step = PI / points as f64;
    let mut positions = vec![[0.0f32; 3]];
    for i in 0..points * 2 {
        let r = if i % 2 == 0 { outer } else { inner };
        let a = FRAC_PI_2 + i as f64 * step;
        positions.push(vertex(a.cos() * r, a.sin() * r, 0.0));
    }
    let n = (points * 2) as u32;
    let mut indices = Vec::with_capacity(n as usize * 3);
    for i in 0..n {
        indices.extend_from_slice(&[0, i + 1, (i + 1) % n + 1]);
    }
    GeometryBuffer::triangles(positions, indices)
}

/// UV sphere centered at the origin.
pub fn sphere(radius: f64, width_segments: usize, height_segments: usize) -> GeometryBuffer {
    let ws = width_segments.max(3);
    let hs = height_segments.max(2);
    let mut positions = Vec::with_capacity((ws + 1) * (hs + 1));
    for y in 0..=hs {
        let theta = PI * y as f64 / hs as f64;
        for x in 0..=ws {
            let phi = TAU * x as f64 / ws as f64;
            positions.push(vertex(
                -radius * phi.cos() * theta.sin(),
                radius * theta.cos(),
                radius * phi.sin() * theta.sin(),
            ));
        }
    }
    let row = ws as u32 + 1;
    let mut indices = Vec::new();
    for y in 0..hs as u32 {
        for x in 0..ws as u32 {
            let a = y * row + x;
            let b = a + row;
            if y != 0 {
                indices.extend_from_slice(&[a, b, a + 1]);
            }
            if y != hs as u32 - 1 {
                indices.extend_from_slice(&[a + 1, b, b + 1]);
            }
        }
    }
    GeometryBuffer::triangles(positions, indices)
}

/// Top face plus side walls of one extruded ring.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtrudedRing {
    pub top: GeometryBuffer,
    pub sides: GeometryBuffer,
    /// Top-face triangles in map-local space, for picking.
    pub top_triangles: Vec<[Vec3; 3]>,
}

/// Extrudes a simple ring from `z = 0` to `z = depth`.
///
/// `points` must already be projected and free of a closing duplicate.
/// Walls are split into `bands` horizontal strips; when `side_colors` is
/// given, wall vertices get `side_colors(z)`. Returns `None` for rings that
/// do not triangulate.
pub fn extrude_ring(
    points: &[Vec2],
    depth: f64,
    bands: usize,
    side_colors: Option<&dyn Fn(f64) -> Color>,
) -> Option<ExtrudedRing> {
    if is_degenerate_ring(points) {
        return None;
    }
    let coords: Vec<f64> = points.iter().flat_map(|p| [p.x, p.y]).collect();
    let indices = match earcut(&coords, &[], 2) {
        Ok(ix) => ix,
        Err(_) => return None,
    };
    if indices.is_empty() {
        return None;
    }

    let top_positions: Vec<[f32; 3]> = points.iter().map(|p| vertex(p.x, p.y, depth)).collect();
    let top_triangles = indices
        .chunks_exact(3)
        .map(|t| {
            [
                Vec3::new(points[t[0]].x, points[t[0]].y, depth),
                Vec3::new(points[t[1]].x, points[t[1]].y, depth),
                Vec3::new(points[t[2]].x, points[t[2]].y, depth),
            ]
        })
        .collect();
    let top = GeometryBuffer::triangles(top_positions, indices.iter().map(|i| *i as u32).collect());

    let bands = bands.max(1);
    let n = points.len();
    let mut positions = Vec::with_capacity(n * (bands + 1));
    let mut colors = Vec::new();
    for b in 0..=bands {
        let z = depth * b as f64 / bands as f64;
        for p in points {
            positions.push(vertex(p.x, p.y, z));
            if let Some(shade) = side_colors {
                colors.push(shade(z).to_array());
            }
        }
    }
    let mut side_indices = Vec::with_capacity(n * bands * 6);
    for b in 0..bands as u32 {
        let lower = b * n as u32;
        let upper = lower + n as u32;
        for i in 0..n as u32 {
            let j = (i + 1) % n as u32;
            side_indices.extend_from_slice(&[lower + i, lower + j, upper + j]);
            side_indices.extend_from_slice(&[lower + i, upper + j, upper + i]);
        }
    }
    let sides = GeometryBuffer::triangles(positions, side_indices).with_colors(colors);

    Some(ExtrudedRing {
        top,
        sides,
        top_triangles,
    })
}

/// Square RGBA texture fading from `color` at the center to transparent.
pub fn radial_glow_texture(size: u32, color: Color) -> Texture {
    let size = size.max(2);
    let half = size as f64 / 2.0;
    let [r, g, b] = color.to_array().map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8);
    let mut rgba = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            let dx = (x as f64 + 0.5 - half) / half;
            let dy = (y as f64 + 0.5 - half) / half;
            let falloff = (1.0 - (dx * dx + dy * dy).sqrt()).clamp(0.0, 1.0);
            rgba.extend_from_slice(&[r, g, b, (falloff * falloff * 255.0).round() as u8]);
        }
    }
    Texture {
        width: size,
        height: size,
        rgba,
    }
}

/// Drops a trailing point equal to the first one.
pub fn drop_closing_duplicate(points: &mut Vec<Vec2>) {
    if points.len() >= 2
        && let (Some(first), Some(last)) = (points.first(), points.last())
        && (first.x - last.x).abs() < 1e-9
        && (first.y - last.y).abs() < 1e-9
    {
        points.pop();
    }
}

/// True for rings with fewer than three points or no area relative to
/// their bounding box (collinear or coincident vertices).
pub fn is_degenerate_ring(points: &[Vec2]) -> bool {
    if points.len() < 3 {
        return true;
    }
    let (mut min, mut max) = (points[0], points[0]);
    for p in points {
        min = Vec2::new(min.x.min(p.x), min.y.min(p.y));
        max = Vec2::new(max.x.max(p.x), max.y.max(p.y));
    }
    let extent = (max.x - min.x) * (max.y - min.y);
    !extent.is_finite() || signed_area(points).abs() <= extent * DEGENERATE_AREA_RATIO
}

fn signed_area(points: &[Vec2]) -> f64 {
    let n = points.len();
    (0..n)
        .map(|i| {
            let (a, b) = (points[i], points[(i + 1) % n]);
            a.x * b.y - b.x * a.y
        })
        .sum::<f64>()
        * 0.5
}

fn vertex(x: f64, y: f64, z: f64) -> [f32; 3] {
    [x as f32, y as f32, z as f32]
}
