//! Engine configuration: JSON file values, then `MAP3D_*` environment
//! overrides.

use std::env;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use layers::PerformanceMode;
use runtime::GovernorConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug)]
pub enum ConfigError {
    Io { path: String, message: String },
    Json(serde_json::Error),
    InvalidEnv { key: String, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, message } => write!(f, "cannot read {path}: {message}"),
            ConfigError::Json(err) => write!(f, "invalid engine config: {err}"),
            ConfigError::InvalidEnv { key, value } => {
                write!(f, "invalid value for {key}: {value:?}")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Json(err) => Some(err),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PickingConfig {
    pub grace_ms: f64,
    pub sample_interval_ms: f64,
    /// Tooltip placement relative to the pointer.
    pub tooltip_offset_px: [f64; 2],
}

impl Default for PickingConfig {
    fn default() -> Self {
        Self {
            grace_ms: 500.0,
            sample_interval_ms: 50.0,
            tooltip_offset_px: [15.0, 15.0],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernorSettings {
    pub window_frames: usize,
    pub slow_frame_ms: f64,
    pub fast_frame_ms: f64,
    pub step: f64,
    pub floor: f64,
    pub max_pixel_ratio: f64,
    pub min_adjust_interval_ms: f64,
}

impl Default for GovernorSettings {
    fn default() -> Self {
        let d = GovernorConfig::default();
        Self {
            window_frames: d.window_frames,
            slow_frame_ms: d.slow_frame_ms,
            fast_frame_ms: d.fast_frame_ms,
            step: d.step,
            floor: d.floor,
            max_pixel_ratio: d.ceiling,
            min_adjust_interval_ms: d.min_adjust_interval_ms,
        }
    }
}

impl GovernorSettings {
    /// The ceiling is the device ratio, capped at `max_pixel_ratio`.
    pub fn to_governor(&self, device_pixel_ratio: f64) -> GovernorConfig {
        GovernorConfig {
            window_frames: self.window_frames,
            slow_frame_ms: self.slow_frame_ms,
            fast_frame_ms: self.fast_frame_ms,
            step: self.step,
            floor: self.floor,
            ceiling: device_pixel_ratio.min(self.max_pixel_ratio),
            min_adjust_interval_ms: self.min_adjust_interval_ms,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    pub region_pulse_step: f64,
    pub region_pulse_ceiling: f64,
    pub city_pulse_step: f64,
    pub city_pulse_ceiling: f64,
    /// Curve parameter advanced per second of frame time.
    pub flight_speed_per_s: f64,
    pub intro_duration_ms: f64,
    pub light_height: f64,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            region_pulse_step: 0.01,
            region_pulse_ceiling: 2.0,
            city_pulse_step: 0.015,
            city_pulse_ceiling: 2.5,
            flight_speed_per_s: 0.18,
            intro_duration_ms: 1000.0,
            light_height: 80.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub picking: PickingConfig,
    pub governor: GovernorSettings,
    pub animation: AnimationConfig,
    pub build_defer_ms: f64,
    pub performance_mode: PerformanceMode,
    pub diagnostics: bool,
    /// Ratio a headless platform reports. Mounted instances read the ratio
    /// from their platform.
    pub device_pixel_ratio: f64,
    pub viewport: ViewportConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            picking: PickingConfig::default(),
            governor: GovernorSettings::default(),
            animation: AnimationConfig::default(),
            build_defer_ms: 100.0,
            performance_mode: PerformanceMode::Normal,
            diagnostics: false,
            device_pixel_ratio: 1.0,
            viewport: ViewportConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(payload: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(payload).map_err(ConfigError::Json)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let payload = std::fs::read_to_string(path).map_err(|err| ConfigError::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        })?;
        Self::from_json_str(&payload)
    }

    /// Applies `MAP3D_*` variables from the process environment.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides_from(|key| env::var(key).ok())
    }

    /// Applies overrides from any key lookup; unset keys keep their value.
    pub fn with_overrides_from(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        self.performance_mode =
            env_var_parse(&lookup, "MAP3D_PERFORMANCE_MODE", self.performance_mode)?;
        self.picking.grace_ms = env_var_f64(&lookup, "MAP3D_GRACE_MS", self.picking.grace_ms)?;
        self.picking.sample_interval_ms = env_var_f64(
            &lookup,
            "MAP3D_SAMPLE_INTERVAL_MS",
            self.picking.sample_interval_ms,
        )?;
        self.build_defer_ms = env_var_f64(&lookup, "MAP3D_BUILD_DEFER_MS", self.build_defer_ms)?;
        self.diagnostics = env_var_bool(&lookup, "MAP3D_DIAGNOSTICS", self.diagnostics)?;
        self.device_pixel_ratio =
            env_var_f64(&lookup, "MAP3D_DEVICE_PIXEL_RATIO", self.device_pixel_ratio)?;
        Ok(self)
    }

    pub fn governor_config(&self) -> GovernorConfig {
        self.governor.to_governor(self.device_pixel_ratio)
    }
}

fn env_var_parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    current: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        None => Ok(current),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidEnv {
            key: key.to_string(),
            value: raw,
        }),
    }
}

fn env_var_f64(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    current: f64,
) -> Result<f64, ConfigError> {
    let value = env_var_parse(lookup, key, current)?;
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::InvalidEnv {
            key: key.to_string(),
            value: value.to_string(),
        })
    }
}

fn env_var_bool(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    current: bool,
) -> Result<bool, ConfigError> {
    match lookup(key).as_deref().map(str::trim) {
        None => Ok(current),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(other) => Err(ConfigError::InvalidEnv {
            key: key.to_string(),
            value: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, EngineConfig};
    use layers::PerformanceMode;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = EngineConfig::from_json_str(
            r#"{"picking": {"grace_ms": 250}, "performance_mode": "low"}"#,
        )
        .expect("config");
        assert_eq!(cfg.picking.grace_ms, 250.0);
        assert_eq!(cfg.picking.sample_interval_ms, 50.0);
        assert_eq!(cfg.performance_mode, PerformanceMode::Low);
        assert_eq!(cfg.governor, EngineConfig::default().governor);
    }

    #[test]
    fn env_overrides_win_over_file_values() {
        let cfg = EngineConfig::default()
            .with_overrides_from(lookup(&[
                ("MAP3D_GRACE_MS", "750"),
                ("MAP3D_PERFORMANCE_MODE", "low"),
                ("MAP3D_DIAGNOSTICS", "true"),
                ("MAP3D_DEVICE_PIXEL_RATIO", "3"),
            ]))
            .expect("overrides");
        assert_eq!(cfg.picking.grace_ms, 750.0);
        assert_eq!(cfg.performance_mode, PerformanceMode::Low);
        assert!(cfg.diagnostics);
        assert_eq!(cfg.governor_config().ceiling, 2.0);
    }

    #[test]
    fn bad_env_value_is_an_error() {
        let err = EngineConfig::default()
            .with_overrides_from(lookup(&[("MAP3D_SAMPLE_INTERVAL_MS", "soon")]))
            .expect_err("invalid");
        assert!(matches!(err, ConfigError::InvalidEnv { ref key, .. } if key == "MAP3D_SAMPLE_INTERVAL_MS"));
        let err = EngineConfig::default()
            .with_overrides_from(lookup(&[("MAP3D_GRACE_MS", "-5")]))
            .expect_err("negative");
        assert!(matches!(err, ConfigError::InvalidEnv { .. }));
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(
            EngineConfig::from_json_str("{"),
            Err(ConfigError::Json(_))
        ));
    }
}
