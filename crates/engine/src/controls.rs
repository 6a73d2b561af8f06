//! Pan and zoom over the map root, with smoothing.
//!
//! - Wheel zoom is exponential in the wheel delta
//! - Drag pans in map-plane units
//! - Both ease toward their targets every frame

use foundation::math::{Affine3, Vec2, Vec3};

use crate::platform::{ListenerId, ListenerKind, ListenerScope, Platform};

/// Smallest zoom multiplier on top of the map's own scale.
const MIN_ZOOM: f64 = 0.5;

/// Largest zoom multiplier on top of the map's own scale.
const MAX_ZOOM: f64 = 4.0;

/// Zoom per unit of wheel delta.
const WHEEL_ZOOM_RATE: f64 = 0.002;

/// Smoothing factor (higher = faster response), per second.
const SMOOTHING: f64 = 8.0;

/// Pan and zoom below this distance from the target snap to it.
const SETTLE_EPSILON: f64 = 1e-4;

/// The scene's controller object: owns its own input listeners and the
/// user's view transform.
#[derive(Debug, Clone)]
pub struct MapControls {
    zoom: f64,
    target_zoom: f64,
    pan: Vec2,
    target_pan: Vec2,
    listeners: Vec<ListenerId>,
}

impl Default for MapControls {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            target_zoom: 1.0,
            pan: Vec2::ZERO,
            target_pan: Vec2::ZERO,
            listeners: Vec::new(),
        }
    }
}

impl MapControls {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers wheel and drag listeners on the container.
    pub fn attach(&mut self, platform: &mut dyn Platform) {
        if !self.listeners.is_empty() {
            return;
        }
        for kind in [ListenerKind::Wheel, ListenerKind::Drag] {
            self.listeners
                .push(platform.add_listener(kind, ListenerScope::Container));
        }
    }

    pub fn is_attached(&self) -> bool {
        !self.listeners.is_empty()
    }

    /// Removes every listener this controller registered and resets the
    /// view.
    pub fn dispose(&mut self, platform: &mut dyn Platform) {
        for id in self.listeners.drain(..) {
            platform.remove_listener(id);
        }
        self.reset();
    }

    /// `delta`: positive zooms out, negative zooms in.
    pub fn on_wheel(&mut self, delta: f64) {
        if !delta.is_finite() {
            return;
        }
        let factor = (-delta * WHEEL_ZOOM_RATE).exp();
        self.target_zoom = (self.target_zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
    }

    /// `delta_px`: pointer motion in pixels (y down); `units_per_px`: map
    /// plane units covered by one pixel at the current zoom.
    pub fn on_drag(&mut self, delta_px: Vec2, units_per_px: f64) {
        if !delta_px.is_finite() || !units_per_px.is_finite() {
            return;
        }
        self.target_pan = self.target_pan
            + Vec2::new(delta_px.x * units_per_px, -delta_px.y * units_per_px);
    }

    /// Eases toward the targets. Returns `true` while still moving.
    pub fn update(&mut self, dt_ms: f64) -> bool {
        let dt = (dt_ms / 1000.0).clamp(0.0, 0.1);
        let alpha = 1.0 - (-SMOOTHING * dt).exp();
        self.zoom += (self.target_zoom - self.zoom) * alpha;
        self.pan = self.pan + (self.target_pan - self.pan).scale(alpha);
        if (self.target_zoom - self.zoom).abs() < SETTLE_EPSILON {
            self.zoom = self.target_zoom;
        }
        if self.target_pan.distance(self.pan) < SETTLE_EPSILON {
            self.pan = self.target_pan;
        }
        self.zoom != self.target_zoom || self.pan != self.target_pan
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn pan(&self) -> Vec2 {
        self.pan
    }

    /// View transform: zoom about the world origin, then pan. `z` is never
    /// scaled.
    pub fn view(&self) -> Affine3 {
        Affine3::from_scale3_translation(
            Vec3::new(self.zoom, self.zoom, 1.0),
            Vec3::new(self.pan.x, self.pan.y, 0.0),
        )
    }

    pub fn reset(&mut self) {
        self.zoom = 1.0;
        self.target_zoom = 1.0;
        self.pan = Vec2::ZERO;
        self.target_pan = Vec2::ZERO;
    }
}
