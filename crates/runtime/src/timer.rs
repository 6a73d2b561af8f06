use std::collections::BTreeMap;

use foundation::time::Millis;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(pub u64);

/// One-shot cancellable timers driven by injected time.
///
/// Ordering contract: `take_due` returns ids sorted by `(deadline, id)`.
#[derive(Debug, Default)]
pub struct TimerQueue {
    next_id: u64,
    deadlines: BTreeMap<TimerId, Millis>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, now: Millis, delay_ms: f64) -> TimerId {
        self.next_id += 1;
        let id = TimerId(self.next_id);
        self.deadlines.insert(id, now.plus(delay_ms.max(0.0)));
        id
    }

    /// Returns `false` if the timer already fired or was cancelled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        self.deadlines.remove(&id).is_some()
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.deadlines.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.deadlines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deadlines.is_empty()
    }

    pub fn next_deadline(&self) -> Option<Millis> {
        self.deadlines
            .values()
            .copied()
            .min_by(|a, b| a.0.total_cmp(&b.0))
    }

    pub fn take_due(&mut self, now: Millis) -> Vec<TimerId> {
        let mut due: Vec<(Millis, TimerId)> = self
            .deadlines
            .iter()
            .filter(|(_, at)| at.0 <= now.0)
            .map(|(id, at)| (*at, *id))
            .collect();
        due.sort_by(|a, b| a.0 .0.total_cmp(&b.0 .0).then_with(|| a.1.cmp(&b.1)));
        for (_, id) in &due {
            self.deadlines.remove(id);
        }
        due.into_iter().map(|(_, id)| id).collect()
    }
}
