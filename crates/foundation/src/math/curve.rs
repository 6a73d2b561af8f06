//! Quadratic Bézier curves with arc-length sampling.

use super::Vec3;

/// Lookup resolution for arc-length parameterization.
const ARC_DIVISIONS: usize = 200;

#[derive(Debug, Clone, PartialEq)]
pub struct QuadraticCurve {
    pub start: Vec3,
    pub control: Vec3,
    pub end: Vec3,
    /// Cumulative chord lengths at `ARC_DIVISIONS + 1` evenly spaced `t`.
    lengths: Vec<f64>,
}

impl QuadraticCurve {
    pub fn new(start: Vec3, control: Vec3, end: Vec3) -> Self {
        let mut curve = Self {
            start,
            control,
            end,
            lengths: Vec::with_capacity(ARC_DIVISIONS + 1),
        };
        let mut total = 0.0;
        let mut prev = start;
        curve.lengths.push(0.0);
        for i in 1..=ARC_DIVISIONS {
            let p = curve.point(i as f64 / ARC_DIVISIONS as f64);
            total += p.distance(prev);
            curve.lengths.push(total);
            prev = p;
        }
        curve
    }

    /// Point at curve parameter `t` in `[0, 1]`.
    pub fn point(&self, t: f64) -> Vec3 {
        let t = t.clamp(0.0, 1.0);
        let a = self.start.lerp(self.control, t);
        let b = self.control.lerp(self.end, t);
        a.lerp(b, t)
    }

    /// Arc length; collapsed curves report exactly zero.
    pub fn length(&self) -> f64 {
        let total = self.lengths.last().copied().unwrap_or(0.0);
        if total < f64::EPSILON { 0.0 } else { total }
    }

    /// Point at fraction `u` of the arc length.
    pub fn point_at(&self, u: f64) -> Vec3 {
        self.point(self.u_to_t(u))
    }

    /// `divisions + 1` points evenly spaced in `t`.
    pub fn sample(&self, divisions: usize) -> Vec<Vec3> {
        let divisions = divisions.max(1);
        (0..=divisions)
            .map(|i| self.point(i as f64 / divisions as f64))
            .collect()
    }

    fn u_to_t(&self, u: f64) -> f64 {
        let u = if u.is_finite() { u.clamp(0.0, 1.0) } else { 0.0 };
        let total = self.length();
        if total < f64::EPSILON {
            return u;
        }
        let target = u * total;
        let i = self.lengths.partition_point(|l| *l < target);
        if i == 0 {
            return 0.0;
        }
        if i >= self.lengths.len() {
            return 1.0;
        }
        let before = self.lengths[i - 1];
        let segment = self.lengths[i] - before;
        let frac = if segment > 0.0 {
            (target - before) / segment
        } else {
            0.0
        };
        ((i - 1) as f64 + frac) / ARC_DIVISIONS as f64
    }
}

#[cfg(test)]
mod tests {
    use super::QuadraticCurve;
    use crate::math::Vec3;

    fn arc() -> QuadraticCurve {
        QuadraticCurve::new(
            Vec3::new(0.0, 0.0, 6.2),
            Vec3::new(5.0, 0.0, 20.0),
            Vec3::new(10.0, 0.0, 6.2),
        )
    }

    #[test]
    fn endpoints_match() {
        let c = arc();
        assert!((c.point_at(0.0) - c.start).length() < 1e-9);
        assert!((c.point_at(1.0) - c.end).length() < 1e-9);
    }

    #[test]
    fn symmetric_arc_midpoint_is_apex() {
        let c = arc();
        let mid = c.point_at(0.5);
        assert!((mid.x - 5.0).abs() < 1e-3, "x = {}", mid.x);
        assert!((mid.z - 13.1).abs() < 1e-3, "z = {}", mid.z);
    }

    #[test]
    fn sample_has_divisions_plus_one_points() {
        assert_eq!(arc().sample(30).len(), 31);
    }

    #[test]
    fn degenerate_curve_does_not_panic() {
        let p = Vec3::new(1.0, 1.0, 1.0);
        let c = QuadraticCurve::new(p, p, p);
        assert_eq!(c.length(), 0.0);
        assert_eq!(c.point_at(0.3), p);
        assert_eq!(c.point(0.7), p);
    }
}
