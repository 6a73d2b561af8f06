//! The per-instance frame loop and everything it advances.

use foundation::math::{Affine3, Vec3};
use foundation::time::Millis;
use gpu::renderer::FollowLight;
use layers::{PulseKind, PulseRing};
use runtime::frame::Frame;
use runtime::governor::{GovernorConfig, ResolutionGovernor};
use runtime::metrics::FrameRateMeter;
use runtime::scheduler::{FrameHost, FrameLoop, FrameRequestId};
use scene::entity::EntityKey;
use scene::map_entity::MapEntity;
use scene::resources::ResourceRegistry;
use scene::world::SceneGraph;
use tracing::debug;

use crate::config::AnimationConfig;

const LIGHT_INTENSITY: f64 = 1.5;
const FPS_WINDOW_MS: f64 = 1000.0;

/// Scale and opacity of one pulse ring at sawtooth position `s`.
///
/// `s` starts at 1 and grows by `step` per frame; past `ceiling` it snaps
/// back to 1.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Sawtooth {
    pub step: f64,
    pub ceiling: f64,
}

impl Sawtooth {
    /// Returns the next position, scale, and opacity.
    pub fn advance(&self, s: f64) -> (f64, f64, f32) {
        let next = s + self.step;
        if next <= self.ceiling {
            let opacity = (self.ceiling - next).clamp(0.0, 1.0) as f32;
            (next, next, opacity)
        } else {
            (1.0, 1.0, 1.0)
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
struct PulsePhase {
    ring: PulseRing,
    s: f64,
}

/// Scales the map root in from nothing, about `pivot`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct IntroTween {
    pub target_scale: f64,
    pub duration_ms: f64,
    /// Map-local point that stays fixed while scaling.
    pub pivot: Vec3,
    started: Option<Millis>,
}

impl IntroTween {
    pub fn new(target_scale: f64, duration_ms: f64, pivot: Vec3) -> Self {
        Self {
            target_scale,
            duration_ms,
            pivot: Vec3::new(pivot.x, pivot.y, 0.0),
            started: None,
        }
    }

    /// Ease-out cubic progress in `[0, 1]`; the first call starts the clock.
    pub fn progress(&mut self, now: Millis) -> f64 {
        let start = *self.started.get_or_insert(now);
        if self.duration_ms <= 0.0 {
            return 1.0;
        }
        let t = (now.since(start) / self.duration_ms).clamp(0.0, 1.0);
        1.0 - (1.0 - t).powi(3)
    }

    pub fn is_finished(&self, now: Millis) -> bool {
        match self.started {
            Some(start) => now.since(start) >= self.duration_ms,
            None => false,
        }
    }

    /// Root transform at progress `p`: `x`/`y` scaled about the pivot,
    /// `z` untouched.
    pub fn root_at(&self, p: f64) -> Affine3 {
        let s = self.target_scale * p;
        Affine3::from_scale3_translation(Vec3::new(s, s, 1.0), self.pivot.scale(1.0 - s))
    }
}

/// What the scheduler animates, taken from a freshly built scene.
#[derive(Debug, Clone, Default)]
pub struct SceneBindings {
    pub pulse_rings: Vec<PulseRing>,
    pub flights: Vec<EntityKey>,
    /// Map-local; `None` aims the light at the local origin.
    pub light_target: Option<Vec3>,
    pub intro: Option<IntroTween>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub light: FollowLight,
    /// New surface pixel ratio when the governor moved it.
    pub pixel_ratio: Option<f64>,
    pub fps: f64,
}

/// The single cooperative loop of one map instance.
///
/// Owns the frame loop, the pulse and flight state, the follow light, the
/// intro tween, and the resolution governor. Holds entity keys and node ids
/// into the scene but never owns it; [`AnimationScheduler::clear`] drops
/// them all.
#[derive(Debug)]
pub struct AnimationScheduler {
    frames: FrameLoop,
    region_pulse: Sawtooth,
    city_pulse: Sawtooth,
    flight_speed_per_s: f64,
    light_height: f64,
    pulses: Vec<PulsePhase>,
    flights: Vec<EntityKey>,
    light_target: Option<Vec3>,
    intro: Option<IntroTween>,
    governor: ResolutionGovernor,
    fps: FrameRateMeter,
}

impl AnimationScheduler {
    pub fn new(config: &AnimationConfig, governor: GovernorConfig) -> Self {
        Self {
            frames: FrameLoop::new(),
            region_pulse: Sawtooth {
                step: config.region_pulse_step,
                ceiling: config.region_pulse_ceiling,
            },
            city_pulse: Sawtooth {
                step: config.city_pulse_step,
                ceiling: config.city_pulse_ceiling,
            },
            flight_speed_per_s: config.flight_speed_per_s,
            light_height: config.light_height,
            pulses: Vec::new(),
            flights: Vec::new(),
            light_target: None,
            intro: None,
            governor: ResolutionGovernor::new(governor),
            fps: FrameRateMeter::new(FPS_WINDOW_MS),
        }
    }

    pub fn bind(&mut self, bindings: SceneBindings) {
        self.pulses = bindings
            .pulse_rings
            .into_iter()
            .map(|ring| PulsePhase { ring, s: 1.0 })
            .collect();
        self.flights = bindings.flights;
        self.light_target = bindings.light_target;
        self.intro = bindings.intro;
    }

    /// Drops every scene reference. The loop must already be stopped.
    pub fn clear(&mut self) {
        self.pulses.clear();
        self.flights.clear();
        self.light_target = None;
        self.intro = None;
        self.fps.reset();
        self.governor.reset_window();
    }

    pub fn is_running(&self) -> bool {
        self.frames.is_running()
    }

    pub fn pending(&self) -> Option<FrameRequestId> {
        self.frames.pending()
    }

    pub fn start(&mut self, host: &mut dyn FrameHost) -> bool {
        let started = self.frames.start(host);
        if started {
            // Frame times from before a pause say nothing about now.
            self.governor.reset_window();
            self.fps.reset();
        }
        started
    }

    pub fn stop(&mut self, host: &mut dyn FrameHost) {
        self.frames.stop(host);
    }

    pub fn begin_frame(&mut self, id: FrameRequestId, now: Millis) -> Option<Frame> {
        self.frames.begin(id, now)
    }

    pub fn end_frame(&mut self, host: &mut dyn FrameHost) {
        self.frames.finish(host);
    }

    pub fn pixel_ratio(&self) -> f64 {
        self.governor.scale()
    }

    pub fn max_pixel_ratio(&self) -> f64 {
        self.governor.ceiling()
    }

    /// Starts the governor over, at the new config's ceiling.
    pub fn reset_governor(&mut self, governor: GovernorConfig) {
        self.governor = ResolutionGovernor::new(governor);
    }

    pub fn fps(&self) -> f64 {
        self.fps.fps()
    }

    /// Whether the intro tween still has frames to play.
    pub fn intro_running(&self, now: Millis) -> bool {
        self.intro.is_some_and(|i| !i.is_finished(now))
    }

    /// Advances one frame.
    ///
    /// `view` is the user's pan/zoom, applied outside the intro scale.
    pub fn tick(
        &mut self,
        frame: Frame,
        view: Affine3,
        scene: &mut SceneGraph,
        registry: &mut ResourceRegistry,
    ) -> TickReport {
        if let Some(intro) = self.intro.as_mut() {
            let p = intro.progress(frame.now);
            scene.set_root(view.then(&intro.root_at(p)));
        } else {
            scene.set_root(view);
        }

        self.advance_pulses(scene, registry);
        self.advance_flights(frame.dt_ms, scene);

        let target = scene.local_to_world(self.light_target.unwrap_or(Vec3::ZERO));
        let light = FollowLight {
            position: target + Vec3::new(0.0, 0.0, self.light_height),
            target,
            intensity: LIGHT_INTENSITY,
        };

        self.fps.record(frame.now);
        let pixel_ratio = if frame.index == 0 {
            None
        } else {
            self.governor.record(frame.dt_ms, frame.now)
        };
        if let Some(ratio) = pixel_ratio {
            debug!(ratio, fps = self.fps.fps(), "resolution governor adjusted");
        }

        TickReport {
            light,
            pixel_ratio,
            fps: self.fps.fps(),
        }
    }

    fn advance_pulses(&mut self, scene: &mut SceneGraph, registry: &mut ResourceRegistry) {
        for phase in &mut self.pulses {
            let wave = match phase.ring.kind {
                PulseKind::Region => self.region_pulse,
                PulseKind::City => self.city_pulse,
            };
            let (s, scale, opacity) = wave.advance(phase.s);
            phase.s = s;
            if let Some(transform) = scene.transform_mut(phase.ring.node) {
                transform.scale = scale;
            }
            if let Some(material) = registry.material_mut(phase.ring.material) {
                material.opacity = opacity;
            }
        }
    }

    fn advance_flights(&mut self, dt_ms: f64, scene: &mut SceneGraph) {
        let delta = self.flight_speed_per_s * dt_ms / 1000.0;
        for key in &self.flights {
            let Some(MapEntity::Flight(flight)) = scene.entity_mut(*key) else {
                continue;
            };
            flight.param = (flight.param + delta).rem_euclid(1.0);
            let marker = flight.marker;
            let position = flight.curve.point_at(flight.param);
            if let Some(transform) = scene.transform_mut(marker) {
                transform.position = position;
            }
        }
    }
}
