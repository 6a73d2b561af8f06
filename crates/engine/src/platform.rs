//! The seam between map instances and whatever hosts them: frame callbacks,
//! input listeners, and render surfaces.

use std::collections::{BTreeMap, BTreeSet};

use gpu::surface::{HeadlessSurface, RenderSurface, SurfaceLedger};
use runtime::scheduler::{FrameHost, FrameRequestId};

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(pub u64);

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ListenerKind {
    PointerMove,
    PointerLeave,
    Resize,
    Wheel,
    Drag,
    TooltipEnter,
    TooltipLeave,
}

/// Where a listener is attached. Resize is the only window-level one.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ListenerScope {
    Container,
    Window,
}

pub trait Platform {
    fn frames(&mut self) -> &mut dyn FrameHost;

    fn add_listener(&mut self, kind: ListenerKind, scope: ListenerScope) -> ListenerId;

    /// Returns `false` when `id` was not registered.
    fn remove_listener(&mut self, id: ListenerId) -> bool;

    fn create_surface(&mut self, width: u32, height: u32) -> Box<dyn RenderSurface>;

    fn device_pixel_ratio(&self) -> f64;
}

/// Frame requests handed out by a [`HeadlessPlatform`].
#[derive(Debug, Default)]
pub struct HeadlessFrames {
    next: u64,
    outstanding: BTreeSet<FrameRequestId>,
    max_outstanding: usize,
    requested: u64,
    cancelled: u64,
}

impl FrameHost for HeadlessFrames {
    fn request_frame(&mut self) -> FrameRequestId {
        self.next += 1;
        self.requested += 1;
        let id = FrameRequestId(self.next);
        self.outstanding.insert(id);
        self.max_outstanding = self.max_outstanding.max(self.outstanding.len());
        id
    }

    fn cancel_frame(&mut self, id: FrameRequestId) {
        if self.outstanding.remove(&id) {
            self.cancelled += 1;
        }
    }
}

/// In-process platform that records everything instead of touching a
/// window system.
///
/// Frames fire only when the driver calls [`HeadlessPlatform::take_frames`].
#[derive(Debug)]
pub struct HeadlessPlatform {
    frames: HeadlessFrames,
    next_listener: u64,
    listeners: BTreeMap<ListenerId, (ListenerKind, ListenerScope)>,
    stale_removals: usize,
    surfaces: SurfaceLedger,
    device_pixel_ratio: f64,
}

impl Default for HeadlessPlatform {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl HeadlessPlatform {
    pub fn new(device_pixel_ratio: f64) -> Self {
        Self {
            frames: HeadlessFrames::default(),
            next_listener: 0,
            listeners: BTreeMap::new(),
            stale_removals: 0,
            surfaces: SurfaceLedger::new(),
            device_pixel_ratio,
        }
    }

    /// Drains the outstanding frame requests in id order.
    pub fn take_frames(&mut self) -> Vec<FrameRequestId> {
        std::mem::take(&mut self.frames.outstanding)
            .into_iter()
            .collect()
    }

    pub fn outstanding_frames(&self) -> usize {
        self.frames.outstanding.len()
    }

    /// Highest number of simultaneously outstanding frame requests so far.
    pub fn max_outstanding_frames(&self) -> usize {
        self.frames.max_outstanding
    }

    pub fn frames_requested(&self) -> u64 {
        self.frames.requested
    }

    pub fn frames_cancelled(&self) -> u64 {
        self.frames.cancelled
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn listeners_of(&self, kind: ListenerKind) -> usize {
        self.listeners.values().filter(|(k, _)| *k == kind).count()
    }

    /// Removals of ids that were never registered or already removed.
    pub fn stale_removals(&self) -> usize {
        self.stale_removals
    }

    pub fn surfaces(&self) -> &SurfaceLedger {
        &self.surfaces
    }
}

impl Platform for HeadlessPlatform {
    fn frames(&mut self) -> &mut dyn FrameHost {
        &mut self.frames
    }

    fn add_listener(&mut self, kind: ListenerKind, scope: ListenerScope) -> ListenerId {
        self.next_listener += 1;
        let id = ListenerId(self.next_listener);
        self.listeners.insert(id, (kind, scope));
        id
    }

    fn remove_listener(&mut self, id: ListenerId) -> bool {
        if self.listeners.remove(&id).is_some() {
            true
        } else {
            self.stale_removals += 1;
            false
        }
    }

    fn create_surface(&mut self, width: u32, height: u32) -> Box<dyn RenderSurface> {
        Box::new(HeadlessSurface::new(width, height, self.surfaces.clone()))
    }

    fn device_pixel_ratio(&self) -> f64 {
        self.device_pixel_ratio
    }
}
