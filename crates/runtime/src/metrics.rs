use std::collections::{BTreeMap, VecDeque};

use foundation::time::Millis;

/// Deterministic metrics aggregation.
///
/// Values come only from injected time and explicit records. Sorted maps keep
/// snapshots stable for the diagnostics overlay and logs.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Metrics {
    counters: BTreeMap<String, u64>,
    gauges: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricsSnapshot {
    pub counters: Vec<(String, u64)>,
    pub gauges: Vec<(String, f64)>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.counters.clear();
        self.gauges.clear();
    }

    pub fn counter(&self, name: &str) -> u64 {
        self.counters.get(name).copied().unwrap_or(0)
    }

    pub fn inc_counter(&mut self, name: impl Into<String>, by: u64) {
        *self.counters.entry(name.into()).or_insert(0) += by;
    }

    pub fn gauge(&self, name: &str) -> Option<f64> {
        self.gauges.get(name).copied()
    }

    pub fn set_gauge(&mut self, name: impl Into<String>, value: f64) {
        self.gauges.insert(name.into(), value);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            counters: self.counters.iter().map(|(k, v)| (k.clone(), *v)).collect(),
            gauges: self.gauges.iter().map(|(k, v)| (k.clone(), *v)).collect(),
        }
    }
}

/// Frames-per-second over a trailing time window.
#[derive(Debug, Clone)]
pub struct FrameRateMeter {
    window_ms: f64,
    stamps: VecDeque<Millis>,
}

impl FrameRateMeter {
    pub fn new(window_ms: f64) -> Self {
        Self {
            window_ms: window_ms.max(1.0),
            stamps: VecDeque::new(),
        }
    }

    pub fn record(&mut self, now: Millis) {
        self.stamps.push_back(now);
        while let Some(first) = self.stamps.front() {
            if now.since(*first) > self.window_ms {
                self.stamps.pop_front();
            } else {
                break;
            }
        }
    }

    pub fn fps(&self) -> f64 {
        match (self.stamps.front(), self.stamps.back()) {
            (Some(first), Some(last)) if self.stamps.len() > 1 => {
                let span = last.since(*first);
                if span <= 0.0 {
                    0.0
                } else {
                    (self.stamps.len() - 1) as f64 * 1000.0 / span
                }
            }
            _ => 0.0,
        }
    }

    pub fn reset(&mut self) {
        self.stamps.clear();
    }
}
