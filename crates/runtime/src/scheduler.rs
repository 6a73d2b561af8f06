use foundation::time::Millis;

use crate::frame::Frame;

/// Opaque id of one outstanding frame request.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FrameRequestId(pub u64);

/// Whatever delivers frame callbacks (a display link, a test harness).
pub trait FrameHost {
    fn request_frame(&mut self) -> FrameRequestId;
    fn cancel_frame(&mut self, id: FrameRequestId);
}

/// Explicit cooperative frame loop.
///
/// Invariant: while running there is at most one outstanding request; while
/// stopped there is none. The host calls `begin` with the id it was given,
/// the owner does its per-frame work, then calls `finish` to reschedule.
#[derive(Debug, Default)]
pub struct FrameLoop {
    running: bool,
    pending: Option<FrameRequestId>,
    last: Option<Frame>,
}

impl FrameLoop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn pending(&self) -> Option<FrameRequestId> {
        self.pending
    }

    /// Returns `false` if the loop was already running.
    pub fn start(&mut self, host: &mut dyn FrameHost) -> bool {
        if self.running {
            return false;
        }
        self.running = true;
        self.last = None;
        self.pending = Some(host.request_frame());
        true
    }

    pub fn stop(&mut self, host: &mut dyn FrameHost) {
        self.running = false;
        if let Some(id) = self.pending.take() {
            host.cancel_frame(id);
        }
    }

    /// Accepts the callback for `id`. Stale or foreign ids are ignored.
    pub fn begin(&mut self, id: FrameRequestId, now: Millis) -> Option<Frame> {
        if !self.running || self.pending != Some(id) {
            return None;
        }
        self.pending = None;
        let frame = match self.last {
            Some(prev) => prev.next(now),
            None => Frame::first(now),
        };
        self.last = Some(frame);
        Some(frame)
    }

    /// Reschedules the next frame if the loop is still running.
    pub fn finish(&mut self, host: &mut dyn FrameHost) {
        if self.running && self.pending.is_none() {
            self.pending = Some(host.request_frame());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{FrameHost, FrameLoop, FrameRequestId};
    use foundation::time::Millis;

    #[derive(Default)]
    struct CountingHost {
        next: u64,
        outstanding: Vec<FrameRequestId>,
        cancelled: Vec<FrameRequestId>,
    }

    impl FrameHost for CountingHost {
        fn request_frame(&mut self) -> FrameRequestId {
            self.next += 1;
            let id = FrameRequestId(self.next);
            self.outstanding.push(id);
            id
        }

        fn cancel_frame(&mut self, id: FrameRequestId) {
            self.outstanding.retain(|x| *x != id);
            self.cancelled.push(id);
        }
    }

    impl CountingHost {
        fn fire(&mut self) -> Option<FrameRequestId> {
            if self.outstanding.is_empty() {
                None
            } else {
                Some(self.outstanding.remove(0))
            }
        }
    }

    #[test]
    fn start_is_idempotent() {
        let mut host = CountingHost::default();
        let mut lp = FrameLoop::new();
        assert!(lp.start(&mut host));
        assert!(!lp.start(&mut host));
        assert_eq!(host.outstanding.len(), 1);
    }

    #[test]
    fn runs_and_reschedules_one_frame_at_a_time() {
        let mut host = CountingHost::default();
        let mut lp = FrameLoop::new();
        lp.start(&mut host);
        for i in 0..3u64 {
            let id = host.fire().expect("pending frame");
            let frame = lp.begin(id, Millis(i as f64 * 16.0)).expect("accepted");
            assert_eq!(frame.index, i);
            lp.finish(&mut host);
            assert_eq!(host.outstanding.len(), 1);
        }
    }

    #[test]
    fn stop_cancels_pending_and_blocks_reschedule() {
        let mut host = CountingHost::default();
        let mut lp = FrameLoop::new();
        lp.start(&mut host);
        let id = host.fire().expect("pending frame");
        lp.begin(id, Millis(0.0)).expect("accepted");
        lp.stop(&mut host);
        lp.finish(&mut host);
        assert!(host.outstanding.is_empty());
        assert!(lp.pending().is_none());
    }

    #[test]
    fn stale_callback_is_ignored() {
        let mut host = CountingHost::default();
        let mut lp = FrameLoop::new();
        lp.start(&mut host);
        let stale = host.outstanding[0];
        lp.stop(&mut host);
        lp.start(&mut host);
        assert!(lp.begin(stale, Millis(5.0)).is_none());
        assert_eq!(host.cancelled, vec![stale]);
    }
}
