//! Planar Mercator projection.
//!
//! `project` maps `[lon, lat]` degrees onto a plane centered on
//! `ProjectionParams::center`, with `y` growing southward. Scene builders flip
//! `y` when placing geometry.

use core::f64::consts::FRAC_PI_4;

use super::Vec2;

/// Geographic coordinate in degrees.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct LonLat {
    pub lon_deg: f64,
    pub lat_deg: f64,
}

impl LonLat {
    pub const fn new(lon_deg: f64, lat_deg: f64) -> Self {
        Self { lon_deg, lat_deg }
    }

    pub fn from_array(v: [f64; 2]) -> Self {
        Self::new(v[0], v[1])
    }

    /// Finite, within `[-180, 180]` longitude and `(-90, 90)` latitude.
    pub fn is_valid(self) -> bool {
        self.lon_deg.is_finite()
            && self.lat_deg.is_finite()
            && self.lon_deg.abs() <= 180.0
            && self.lat_deg.abs() < 90.0
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ProjectionParams {
    pub center: LonLat,
    pub scale: f64,
}

impl ProjectionParams {
    pub fn new(center: LonLat, scale: f64) -> Self {
        Self { center, scale }
    }
}

/// Stateless beyond its parameters; cheap to copy.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MercatorProjector {
    params: ProjectionParams,
    center_y: f64,
}

impl MercatorProjector {
    pub fn new(params: ProjectionParams) -> Self {
        let center_y = mercator_y(params.center.lat_deg.to_radians());
        Self { params, center_y }
    }

    pub fn params(&self) -> ProjectionParams {
        self.params
    }

    /// `None` for out-of-domain input or non-finite output.
    pub fn project(&self, p: LonLat) -> Option<Vec2> {
        if !p.is_valid() || !self.params.scale.is_finite() || !self.center_y.is_finite() {
            return None;
        }
        let k = self.params.scale;
        let mut dlon = p.lon_deg - self.params.center.lon_deg;
        // Wrap across the antimeridian relative to the center.
        if dlon > 180.0 {
            dlon -= 360.0;
        } else if dlon < -180.0 {
            dlon += 360.0;
        }
        let x = k * dlon.to_radians();
        let y = -k * (mercator_y(p.lat_deg.to_radians()) - self.center_y);
        let out = Vec2::new(x, y);
        out.is_finite().then_some(out)
    }
}

fn mercator_y(phi: f64) -> f64 {
    (FRAC_PI_4 + phi / 2.0).tan().ln()
}
