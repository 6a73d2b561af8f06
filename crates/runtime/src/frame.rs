use foundation::time::Millis;

/// Per-frame timing handed to animation and picking.
///
/// `dt_ms` is measured from the previous frame of the same loop run; the first
/// frame after `start` reports zero.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Frame {
    /// 0-based frame index within the current loop run.
    pub index: u64,
    pub now: Millis,
    pub dt_ms: f64,
}

impl Frame {
    pub fn first(now: Millis) -> Self {
        Self {
            index: 0,
            now,
            dt_ms: 0.0,
        }
    }

    /// Successor frame. A clock that goes backwards yields `dt_ms == 0`.
    pub fn next(self, now: Millis) -> Self {
        Self {
            index: self.index + 1,
            now,
            dt_ms: now.since(self.now),
        }
    }
}
