use foundation::time::Millis;

/// Admits at most one event per `min_interval_ms`.
///
/// Used to sample pointer hit tests at a bounded rate regardless of how often
/// frames run.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RateLimiter {
    min_interval_ms: f64,
    last: Option<Millis>,
}

impl RateLimiter {
    pub fn new(min_interval_ms: f64) -> Self {
        Self {
            min_interval_ms: min_interval_ms.max(0.0),
            last: None,
        }
    }

    pub fn min_interval_ms(&self) -> f64 {
        self.min_interval_ms
    }

    /// Returns `true` and records `now` when the interval has elapsed.
    pub fn allow(&mut self, now: Millis) -> bool {
        match self.last {
            Some(last) if now.since(last) < self.min_interval_ms => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::RateLimiter;
    use foundation::time::Millis;

    #[test]
    fn admits_first_then_waits_for_interval() {
        let mut r = RateLimiter::new(50.0);
        assert!(r.allow(Millis(0.0)));
        assert!(!r.allow(Millis(16.0)));
        assert!(!r.allow(Millis(49.9)));
        assert!(r.allow(Millis(50.0)));
    }

    #[test]
    fn zero_interval_admits_everything() {
        let mut r = RateLimiter::new(0.0);
        assert!(r.allow(Millis(1.0)));
        assert!(r.allow(Millis(1.0)));
    }

    #[test]
    fn reset_forgets_last_sample() {
        let mut r = RateLimiter::new(100.0);
        assert!(r.allow(Millis(0.0)));
        r.reset();
        assert!(r.allow(Millis(1.0)));
    }
}
