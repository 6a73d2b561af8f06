//! One mounted map: build scheduling, the active flag, input routing, and
//! teardown.

use std::fmt;

use foundation::math::{Vec2, Vec3};
use foundation::time::Millis;
use gpu::renderer::{AmbientLight, Renderer};
use gpu::surface::RenderSurface;
use layers::{MapKind, MapStyle};
use runtime::metrics::Metrics;
use runtime::scheduler::FrameRequestId;
use runtime::timer::{TimerId, TimerQueue};
use scene::camera::{PerspectiveCamera, Viewport};
use scene::resources::{ResourceBundle, ResourceCounts, ResourceRegistry};
use scene::world::SceneGraph;
use tracing::{debug, info, warn};

use crate::animation::{AnimationScheduler, IntroTween};
use crate::build::{build_scene, scene_pivot, SceneInputs};
use crate::config::EngineConfig;
use crate::controls::MapControls;
use crate::diagnostics::{
    DiagnosticsSnapshot, COUNTER_BUILDS, COUNTER_DISPOSE_ERRORS, COUNTER_FRAMES,
    COUNTER_HOVER_RESTORED, COUNTER_SAMPLES,
};
use crate::hover::{HoverColors, HoverState, PickContext, PickingEngine, SampleOutcome};
use crate::platform::{ListenerId, ListenerKind, ListenerScope, Platform};
use crate::tooltip::{Cursor, TooltipState};

/// Listeners every mounted instance owns, besides the controls' own.
const INSTANCE_LISTENERS: [(ListenerKind, ListenerScope); 5] = [
    (ListenerKind::PointerMove, ListenerScope::Container),
    (ListenerKind::PointerLeave, ListenerScope::Container),
    (ListenerKind::TooltipEnter, ListenerScope::Container),
    (ListenerKind::TooltipLeave, ListenerScope::Container),
    (ListenerKind::Resize, ListenerScope::Window),
];

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    /// Mounted; the deferred build has not run yet.
    Building,
    Ready,
    Disposed,
}

impl LifecycleState {
    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleState::Uninitialized => "uninitialized",
            LifecycleState::Building => "building",
            LifecycleState::Ready => "ready",
            LifecycleState::Disposed => "disposed",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    AlreadyMounted { kind: MapKind },
    Disposed { kind: MapKind },
}

impl fmt::Display for LifecycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleError::AlreadyMounted { kind } => {
                write!(f, "{kind} map is already mounted")
            }
            LifecycleError::Disposed { kind } => {
                write!(f, "{kind} map was unmounted and cannot be mounted again")
            }
        }
    }
}

impl std::error::Error for LifecycleError {}

/// Owns the scene graph and every resource of one map, and is the only
/// writer of its [`LifecycleState`].
///
/// The picking engine and the animation scheduler hold entity keys into the
/// scene; both are cleared on every teardown path.
pub struct MapInstance {
    kind: MapKind,
    config: EngineConfig,
    style: MapStyle,
    state: LifecycleState,
    active: bool,
    scene: SceneGraph,
    registry: ResourceRegistry,
    bundle: ResourceBundle,
    surface: Option<Box<dyn RenderSurface>>,
    camera: PerspectiveCamera,
    viewport: Viewport,
    picking: PickingEngine,
    animation: AnimationScheduler,
    controls: MapControls,
    timers: TimerQueue,
    build_timer: Option<TimerId>,
    pending: Option<SceneInputs>,
    listeners: Vec<ListenerId>,
    metrics: Metrics,
}

impl fmt::Debug for MapInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapInstance")
            .field("kind", &self.kind)
            .field("state", &self.state)
            .field("active", &self.active)
            .field("resources", &self.registry.counts())
            .field("listeners", &self.listeners.len())
            .field("surface", &self.surface.is_some())
            .finish_non_exhaustive()
    }
}

impl MapInstance {
    /// An unmounted, active instance.
    pub fn new(kind: MapKind, config: EngineConfig) -> Self {
        let style = MapStyle::for_kind(kind);
        let picking = PickingEngine::new(&config.picking, HoverColors::from_style(&style));
        let animation = AnimationScheduler::new(&config.animation, config.governor_config());
        let viewport = Viewport::new(
            f64::from(config.viewport.width),
            f64::from(config.viewport.height),
        );
        Self {
            kind,
            style,
            state: LifecycleState::Uninitialized,
            active: true,
            scene: SceneGraph::new(),
            registry: ResourceRegistry::new(),
            bundle: ResourceBundle::new(),
            surface: None,
            camera: PerspectiveCamera::default(),
            viewport,
            picking,
            animation,
            controls: MapControls::new(),
            timers: TimerQueue::new(),
            build_timer: None,
            pending: None,
            listeners: Vec::new(),
            metrics: Metrics::new(),
            config,
        }
    }

    /// Creates the surface, registers listeners, and schedules the build
    /// `build_defer_ms` after `now`.
    pub fn mount(
        &mut self,
        inputs: SceneInputs,
        platform: &mut dyn Platform,
        now: Millis,
    ) -> Result<(), LifecycleError> {
        match self.state {
            LifecycleState::Uninitialized => {}
            LifecycleState::Building | LifecycleState::Ready => {
                return Err(LifecycleError::AlreadyMounted { kind: self.kind });
            }
            LifecycleState::Disposed => return Err(LifecycleError::Disposed { kind: self.kind }),
        }
        self.begin(inputs, platform, now);
        info!(kind = %self.kind, active = self.active, "map mounted");
        Ok(())
    }

    /// Full teardown, then a fresh mount with `inputs`.
    pub fn reconfigure(
        &mut self,
        inputs: SceneInputs,
        platform: &mut dyn Platform,
        now: Millis,
    ) -> Result<(), LifecycleError> {
        match self.state {
            LifecycleState::Uninitialized => return self.mount(inputs, platform, now),
            LifecycleState::Disposed => return Err(LifecycleError::Disposed { kind: self.kind }),
            LifecycleState::Building | LifecycleState::Ready => {}
        }
        self.teardown(platform);
        self.state = LifecycleState::Disposed;
        self.begin(inputs, platform, now);
        info!(kind = %self.kind, "map reconfigured");
        Ok(())
    }

    /// Tears everything down. Safe in any state; a second call does nothing.
    pub fn unmount(&mut self, platform: &mut dyn Platform) {
        if self.state == LifecycleState::Disposed {
            return;
        }
        let from = self.state;
        self.teardown(platform);
        self.state = LifecycleState::Disposed;
        info!(kind = %self.kind, from = %from, "map unmounted");
    }

    /// Inactive: the loop stops, hover and tooltip are dropped, and input is
    /// ignored. Active: the loop restarts on the existing scene.
    pub fn set_active(&mut self, active: bool, platform: &mut dyn Platform) {
        if self.active == active {
            return;
        }
        self.active = active;
        if active {
            if self.state == LifecycleState::Ready {
                self.animation.start(platform.frames());
            }
        } else {
            self.animation.stop(platform.frames());
            if self.picking.deactivate(&mut self.registry).is_some() {
                self.metrics.inc_counter(COUNTER_HOVER_RESTORED, 1);
            }
        }
        info!(kind = %self.kind, active, state = %self.state, "map activation changed");
    }

    /// Runs timers due at `now`. Returns `true` when the deferred build ran.
    pub fn on_timer(&mut self, now: Millis, platform: &mut dyn Platform) -> bool {
        let mut built = false;
        for id in self.timers.take_due(now) {
            if self.build_timer == Some(id) {
                self.build_timer = None;
                built = self.build(platform);
            }
        }
        built
    }

    /// Earliest pending timer, for drivers that sleep between events.
    pub fn next_timer(&self) -> Option<Millis> {
        self.timers.next_deadline()
    }

    /// Body of one frame callback. Returns `false` for a request this
    /// instance does not own.
    pub fn on_frame(&mut self, id: FrameRequestId, now: Millis, platform: &mut dyn Platform) -> bool {
        if self.state != LifecycleState::Ready {
            return false;
        }
        let Some(frame) = self.animation.begin_frame(id, now) else {
            return false;
        };
        self.controls.update(frame.dt_ms);
        let report =
            self.animation
                .tick(frame, self.controls.view(), &mut self.scene, &mut self.registry);

        let ctx = PickContext {
            scene: &self.scene,
            camera: &self.camera,
            viewport: self.viewport,
        };
        if self.picking.sample(ctx, &mut self.registry, now) != SampleOutcome::Skipped {
            self.metrics.inc_counter(COUNTER_SAMPLES, 1);
        }
        self.picking.expire(now);

        let mut draw_calls = 0;
        if let Some(surface) = self.surface.as_mut() {
            if let Some(ratio) = report.pixel_ratio {
                surface.set_pixel_ratio(ratio);
            }
            let render =
                Renderer::collect(&self.scene, &self.registry, self.camera, Some(report.light))
                    .with_ambient(AmbientLight {
                        color: self.style.ambient,
                        intensity: self.style.ambient_intensity,
                    });
            draw_calls = surface.render(&render).draw_calls;
        }
        self.metrics.inc_counter(COUNTER_FRAMES, 1);
        if self.config.diagnostics {
            DiagnosticsSnapshot {
                fps: report.fps,
                pixel_ratio: self.animation.pixel_ratio(),
                max_pixel_ratio: self.animation.max_pixel_ratio(),
                draw_calls,
                interactive_entities: self.picking.interactive_entities(),
            }
            .publish(&mut self.metrics);
        }

        self.animation.end_frame(platform.frames());
        true
    }

    pub fn pointer_move(&mut self, px: Vec2) {
        if self.accepts_input() {
            self.picking.pointer_move(px);
        }
    }

    pub fn pointer_leave(&mut self, now: Millis) {
        if self.accepts_input() {
            self.picking.pointer_leave(&self.scene, &mut self.registry, now);
        }
    }

    pub fn tooltip_enter(&mut self) {
        if self.accepts_input() {
            self.picking.enter_tooltip();
        }
    }

    pub fn tooltip_leave(&mut self) {
        if self.accepts_input() {
            self.picking.leave_tooltip(&mut self.registry);
        }
    }

    /// New container size in CSS pixels. Applies in any live state.
    pub fn resize(&mut self, width: f64, height: f64) {
        if self.state == LifecycleState::Disposed || !(width > 0.0 && height > 0.0) {
            return;
        }
        self.viewport = Viewport::new(width, height);
        if let Some(surface) = self.surface.as_mut() {
            surface.resize(width.round() as u32, height.round() as u32);
        }
        debug!(kind = %self.kind, width, height, "viewport resized");
    }

    pub fn wheel(&mut self, delta: f64) {
        if self.accepts_input() {
            self.controls.on_wheel(delta);
        }
    }

    pub fn drag(&mut self, delta_px: Vec2) {
        if self.accepts_input() {
            let units_per_px = self.world_units_per_px();
            self.controls.on_drag(delta_px, units_per_px);
        }
    }

    pub fn kind(&self) -> MapKind {
        self.kind
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_running(&self) -> bool {
        self.animation.is_running()
    }

    /// The frame request this instance is waiting on.
    pub fn pending_frame(&self) -> Option<FrameRequestId> {
        self.animation.pending()
    }

    pub fn tooltip(&self) -> Option<&TooltipState> {
        self.picking.tooltip()
    }

    pub fn hover_state(&self) -> HoverState {
        self.picking.state()
    }

    pub fn cursor(&self) -> Cursor {
        self.picking.cursor()
    }

    /// `None` unless diagnostics are enabled.
    pub fn diagnostics(&self) -> Option<DiagnosticsSnapshot> {
        self.config
            .diagnostics
            .then(|| DiagnosticsSnapshot::from_metrics(&self.metrics))
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Live GPU-side allocations of this instance.
    pub fn resource_counts(&self) -> ResourceCounts {
        self.registry.counts()
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Container pixel of a map-local point under the current root.
    pub fn screen_position(&self, local: Vec3) -> Option<Vec2> {
        self.camera
            .project_to_screen(self.scene.local_to_world(local), self.viewport)
    }

    fn accepts_input(&self) -> bool {
        self.active && self.state == LifecycleState::Ready
    }

    /// World-plane distance one pixel covers at the map plane.
    fn world_units_per_px(&self) -> f64 {
        let distance = self.camera.position.distance(self.camera.target);
        let visible = 2.0 * distance * (self.camera.fov_y_deg.to_radians() * 0.5).tan();
        visible / self.viewport.height.max(1.0)
    }

    fn begin(&mut self, inputs: SceneInputs, platform: &mut dyn Platform, now: Millis) {
        let mut surface = platform.create_surface(
            self.viewport.width.round() as u32,
            self.viewport.height.round() as u32,
        );
        self.animation
            .reset_governor(self.config.governor.to_governor(platform.device_pixel_ratio()));
        surface.set_pixel_ratio(self.animation.pixel_ratio());
        self.surface = Some(surface);
        for (kind, scope) in INSTANCE_LISTENERS {
            self.listeners.push(platform.add_listener(kind, scope));
        }
        self.controls.attach(platform);

        self.pending = Some(inputs);
        self.build_timer = Some(self.timers.schedule(now, self.config.build_defer_ms));
        self.state = LifecycleState::Building;
        debug!(
            kind = %self.kind,
            defer_ms = self.config.build_defer_ms,
            "deferred build scheduled"
        );
    }

    fn build(&mut self, platform: &mut dyn Platform) -> bool {
        let Some(inputs) = self.pending.take() else {
            return false;
        };
        let mut built = build_scene(
            &inputs,
            &self.style,
            self.config.performance_mode,
            &mut self.scene,
            &mut self.registry,
        );
        self.picking
            .rebuild_cache(&self.scene, built.take_pick_targets());
        let intro = IntroTween::new(
            self.style.root_scale,
            self.config.animation.intro_duration_ms,
            scene_pivot(&self.scene),
        );
        self.animation.bind(built.take_bindings(Some(intro)));
        self.bundle = built.take_bundle();
        self.metrics.inc_counter(COUNTER_BUILDS, 1);

        self.state = LifecycleState::Ready;
        info!(
            kind = %self.kind,
            interactive = self.picking.interactive_entities(),
            resources = self.bundle.len(),
            "map ready"
        );
        if self.active {
            self.animation.start(platform.frames());
        }
        true
    }

    /// Cancel the frame and the deferred build, remove listeners, dispose
    /// the controls, free resources, release the surface, drop scene
    /// references. In that order.
    fn teardown(&mut self, platform: &mut dyn Platform) {
        self.animation.stop(platform.frames());
        if let Some(id) = self.build_timer.take() {
            if self.timers.cancel(id) {
                debug!(kind = %self.kind, "deferred build cancelled");
            }
        }
        self.pending = None;

        for id in self.listeners.drain(..) {
            if !platform.remove_listener(id) {
                warn!(kind = %self.kind, listener = id.0, "listener was already removed");
            }
        }
        self.controls.dispose(platform);

        let report = self.bundle.dispose_into(&mut self.registry);
        for err in &report.errors {
            warn!(kind = %self.kind, error = %err, "resource release failed; continuing");
        }
        self.metrics
            .inc_counter(COUNTER_DISPOSE_ERRORS, report.errors.len() as u64);
        self.scene.clear();
        let left = self.registry.counts();
        if !left.is_zero() {
            warn!(kind = %self.kind, remaining = left.total(), "resources outlived teardown");
        }

        if let Some(mut surface) = self.surface.take() {
            surface.release();
        }

        self.picking.clear();
        self.animation.clear();
        self.controls.reset();
        debug!(
            kind = %self.kind,
            freed = report.freed.total(),
            "teardown complete"
        );
    }
}
