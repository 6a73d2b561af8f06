//! Two map instances on one platform, one of them active.

use foundation::math::Vec2;
use foundation::time::Millis;
use layers::MapKind;
use runtime::scheduler::FrameRequestId;
use tracing::info;

use crate::build::SceneInputs;
use crate::config::EngineConfig;
use crate::lifecycle::{LifecycleError, MapInstance};
use crate::platform::{HeadlessPlatform, Platform};

/// Holds the domestic and the world map.
///
/// Only the active instance runs a frame loop or sees pointer input. A
/// switch deactivates the current instance before the other one starts, so
/// two loops never overlap.
#[derive(Debug)]
pub struct MapHost<P: Platform> {
    platform: P,
    domestic: MapInstance,
    world: MapInstance,
    active: MapKind,
}

impl<P: Platform> MapHost<P> {
    /// Domestic starts active.
    pub fn new(mut platform: P, config: EngineConfig) -> Self {
        let domestic = MapInstance::new(MapKind::Domestic, config.clone());
        let mut world = MapInstance::new(MapKind::World, config);
        world.set_active(false, &mut platform);
        Self {
            platform,
            domestic,
            world,
            active: MapKind::Domestic,
        }
    }

    pub fn mount_both(
        &mut self,
        domestic: SceneInputs,
        world: SceneInputs,
        now: Millis,
    ) -> Result<(), LifecycleError> {
        self.domestic.mount(domestic, &mut self.platform, now)?;
        self.world.mount(world, &mut self.platform, now)
    }

    pub fn active_kind(&self) -> MapKind {
        self.active
    }

    pub fn switch_to(&mut self, kind: MapKind) {
        if kind == self.active {
            return;
        }
        let from = self.active;
        let (previous, platform) = self.split(from);
        previous.set_active(false, platform);
        self.active = kind;
        let (instance, platform) = self.split(kind);
        instance.set_active(true, platform);
        info!(from = %from, to = %kind, "switched map");
    }

    /// Runs both instances' due timers. Returns how many builds ran.
    pub fn run_timers(&mut self, now: Millis) -> usize {
        let mut built = 0;
        for kind in [MapKind::Domestic, MapKind::World] {
            let (instance, platform) = self.split(kind);
            if instance.on_timer(now, platform) {
                built += 1;
            }
        }
        built
    }

    /// Hands a fired frame request to the instance that asked for it.
    pub fn dispatch_frame(&mut self, id: FrameRequestId, now: Millis) -> bool {
        for kind in [MapKind::Domestic, MapKind::World] {
            let (instance, platform) = self.split(kind);
            if instance.pending_frame() == Some(id) {
                return instance.on_frame(id, now, platform);
            }
        }
        false
    }

    pub fn pointer_move(&mut self, px: Vec2) {
        self.instance_slot(self.active).pointer_move(px);
    }

    pub fn pointer_leave(&mut self, now: Millis) {
        self.instance_slot(self.active).pointer_leave(now);
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.domestic.resize(width, height);
        self.world.resize(width, height);
    }

    pub fn unmount_all(&mut self) {
        for kind in [MapKind::Domestic, MapKind::World] {
            let (instance, platform) = self.split(kind);
            instance.unmount(platform);
        }
    }

    pub fn instance(&self, kind: MapKind) -> &MapInstance {
        match kind {
            MapKind::Domestic => &self.domestic,
            MapKind::World => &self.world,
        }
    }

    pub fn active(&self) -> &MapInstance {
        self.instance(self.active)
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    fn instance_slot(&mut self, kind: MapKind) -> &mut MapInstance {
        match kind {
            MapKind::Domestic => &mut self.domestic,
            MapKind::World => &mut self.world,
        }
    }

    fn split(&mut self, kind: MapKind) -> (&mut MapInstance, &mut P) {
        let instance = match kind {
            MapKind::Domestic => &mut self.domestic,
            MapKind::World => &mut self.world,
        };
        (instance, &mut self.platform)
    }
}

impl MapHost<HeadlessPlatform> {
    /// Timers first, then every frame request outstanding at `now`.
    /// Returns the number of frames run.
    pub fn pump(&mut self, now: Millis) -> usize {
        self.run_timers(now);
        let mut frames = 0;
        for id in self.platform.take_frames() {
            if self.dispatch_frame(id, now) {
                frames += 1;
            }
        }
        frames
    }
}
