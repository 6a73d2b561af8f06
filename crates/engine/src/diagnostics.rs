use runtime::metrics::Metrics;
use serde::Serialize;

pub const GAUGE_FPS: &str = "fps";
pub const GAUGE_PIXEL_RATIO: &str = "pixel_ratio";
pub const GAUGE_MAX_PIXEL_RATIO: &str = "max_pixel_ratio";
pub const GAUGE_DRAW_CALLS: &str = "draw_calls";
pub const GAUGE_INTERACTIVE: &str = "interactive_entities";

pub const COUNTER_FRAMES: &str = "frames";
pub const COUNTER_SAMPLES: &str = "pointer_samples";
pub const COUNTER_HOVER_RESTORED: &str = "hover_restored";
pub const COUNTER_DISPOSE_ERRORS: &str = "dispose_errors";
pub const COUNTER_BUILDS: &str = "builds";

/// Read-only numbers for the diagnostics overlay.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize)]
pub struct DiagnosticsSnapshot {
    pub fps: f64,
    pub pixel_ratio: f64,
    pub max_pixel_ratio: f64,
    pub draw_calls: usize,
    pub interactive_entities: usize,
}

impl DiagnosticsSnapshot {
    /// Reads the published gauges; missing ones read as zero.
    pub fn from_metrics(metrics: &Metrics) -> Self {
        let gauge = |name: &str| metrics.gauge(name).unwrap_or(0.0);
        Self {
            fps: gauge(GAUGE_FPS),
            pixel_ratio: gauge(GAUGE_PIXEL_RATIO),
            max_pixel_ratio: gauge(GAUGE_MAX_PIXEL_RATIO),
            draw_calls: gauge(GAUGE_DRAW_CALLS) as usize,
            interactive_entities: gauge(GAUGE_INTERACTIVE) as usize,
        }
    }

    pub fn publish(&self, metrics: &mut Metrics) {
        metrics.set_gauge(GAUGE_FPS, self.fps);
        metrics.set_gauge(GAUGE_PIXEL_RATIO, self.pixel_ratio);
        metrics.set_gauge(GAUGE_MAX_PIXEL_RATIO, self.max_pixel_ratio);
        metrics.set_gauge(GAUGE_DRAW_CALLS, self.draw_calls as f64);
        metrics.set_gauge(GAUGE_INTERACTIVE, self.interactive_entities as f64);
    }
}

#[cfg(test)]
mod tests {
    use super::DiagnosticsSnapshot;
    use pretty_assertions::assert_eq;
    use runtime::metrics::Metrics;

    #[test]
    fn snapshot_survives_the_metrics_round() {
        let snapshot = DiagnosticsSnapshot {
            fps: 58.5,
            pixel_ratio: 1.5,
            max_pixel_ratio: 2.0,
            draw_calls: 412,
            interactive_entities: 34,
        };
        let mut metrics = Metrics::new();
        snapshot.publish(&mut metrics);
        assert_eq!(DiagnosticsSnapshot::from_metrics(&metrics), snapshot);
        let names: Vec<String> = metrics.snapshot().gauges.into_iter().map(|(k, _)| k).collect();
        assert_eq!(
            names,
            vec![
                "draw_calls",
                "fps",
                "interactive_entities",
                "max_pixel_ratio",
                "pixel_ratio"
            ]
        );
    }

    #[test]
    fn empty_metrics_read_as_zero() {
        assert_eq!(
            DiagnosticsSnapshot::from_metrics(&Metrics::new()),
            DiagnosticsSnapshot::default()
        );
    }
}
