/// Time primitives
///
/// Engine time is always injected by the caller in milliseconds so that the
/// frame loop, grace windows and timers replay deterministically.
#[derive(Copy, Clone, Debug, PartialEq, PartialOrd)]
pub struct Millis(pub f64);

impl Millis {
    pub const ZERO: Millis = Millis(0.0);

    pub fn as_secs(self) -> f64 {
        self.0 / 1000.0
    }

    pub fn plus(self, ms: f64) -> Millis {
        Millis(self.0 + ms)
    }

    /// Milliseconds elapsed since `earlier`, clamped at zero.
    pub fn since(self, earlier: Millis) -> f64 {
        (self.0 - earlier.0).max(0.0)
    }
}

/// A point in time after which something expires.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Deadline(pub Millis);

impl Deadline {
    pub fn after(now: Millis, ms: f64) -> Self {
        Deadline(now.plus(ms))
    }

    pub fn is_expired(&self, now: Millis) -> bool {
        now.0 >= (self.0).0
    }
}
