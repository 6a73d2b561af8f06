use std::cell::RefCell;
use std::rc::Rc;

use crate::renderer::RenderFrame;

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub draw_calls: usize,
}

/// The drawing target owned by one map instance.
///
/// After `release` a surface draws nothing and ignores resizes.
pub trait RenderSurface {
    fn resize(&mut self, width: u32, height: u32);

    fn size(&self) -> (u32, u32);

    fn set_pixel_ratio(&mut self, ratio: f64);

    fn pixel_ratio(&self) -> f64;

    fn render(&mut self, frame: &RenderFrame) -> RenderStats;

    fn release(&mut self);

    fn is_released(&self) -> bool;
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LedgerCounts {
    pub created: usize,
    pub released: usize,
    pub frames: u64,
    pub resizes: u64,
}

impl LedgerCounts {
    pub fn live(&self) -> usize {
        self.created - self.released
    }
}

/// Shared tally of headless surfaces, for assertions across instances.
#[derive(Debug, Clone, Default)]
pub struct SurfaceLedger(Rc<RefCell<LedgerCounts>>);

impl SurfaceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counts(&self) -> LedgerCounts {
        *self.0.borrow()
    }

    fn update(&self, f: impl FnOnce(&mut LedgerCounts)) {
        f(&mut self.0.borrow_mut());
    }
}

/// Surface that records what would have been drawn.
#[derive(Debug)]
pub struct HeadlessSurface {
    width: u32,
    height: u32,
    pixel_ratio: f64,
    released: bool,
    last: RenderStats,
    ledger: SurfaceLedger,
}

impl HeadlessSurface {
    pub fn new(width: u32, height: u32, ledger: SurfaceLedger) -> Self {
        ledger.update(|c| c.created += 1);
        Self {
            width,
            height,
            pixel_ratio: 1.0,
            released: false,
            last: RenderStats::default(),
            ledger,
        }
    }

    pub fn last_stats(&self) -> RenderStats {
        self.last
    }

    /// Backing-store size in physical pixels.
    pub fn physical_size(&self) -> (u32, u32) {
        (
            (self.width as f64 * self.pixel_ratio).round() as u32,
            (self.height as f64 * self.pixel_ratio).round() as u32,
        )
    }
}

impl RenderSurface for HeadlessSurface {
    fn resize(&mut self, width: u32, height: u32) {
        if self.released {
            return;
        }
        self.width = width;
        self.height = height;
        self.ledger.update(|c| c.resizes += 1);
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn set_pixel_ratio(&mut self, ratio: f64) {
        if ratio.is_finite() && ratio > 0.0 {
            self.pixel_ratio = ratio;
        }
    }

    fn pixel_ratio(&self) -> f64 {
        self.pixel_ratio
    }

    fn render(&mut self, frame: &RenderFrame) -> RenderStats {
        if self.released {
            return RenderStats::default();
        }
        self.last = RenderStats {
            draw_calls: frame.draw_calls(),
        };
        self.ledger.update(|c| c.frames += 1);
        self.last
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.ledger.update(|c| c.released += 1);
    }

    fn is_released(&self) -> bool {
        self.released
    }
}
