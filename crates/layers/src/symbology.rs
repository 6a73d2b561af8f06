use std::fmt;
use std::str::FromStr;

use foundation::color::Color;
use serde::{Deserialize, Serialize};

/// Extrusion height of every region solid.
pub const REGION_DEPTH: f64 = 6.0;
/// Border outline height, just above the top face.
pub const BORDER_Z: f64 = REGION_DEPTH + 0.5;
/// Height of city markers and region spots.
pub const SPOT_Z: f64 = REGION_DEPTH + 0.2;
/// Label anchor height.
pub const LABEL_Z: f64 = REGION_DEPTH + 2.0;
/// Hit zones sit slightly above the visible disc.
pub const HIT_ZONE_LIFT: f64 = 0.02;
/// Capital star sits above everything else at spot height.
pub const CAPITAL_LIFT: f64 = 0.08;
/// Control-point height of flight curves.
pub const FLIGHT_ARC_Z: f64 = 20.0;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapKind {
    Domestic,
    World,
}

impl MapKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MapKind::Domestic => "domestic",
            MapKind::World => "world",
        }
    }

    pub fn other(self) -> MapKind {
        match self {
            MapKind::Domestic => MapKind::World,
            MapKind::World => MapKind::Domestic,
        }
    }
}

impl fmt::Display for MapKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MapKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "domestic" | "china" => Ok(MapKind::Domestic),
            "world" => Ok(MapKind::World),
            other => Err(format!("unknown map kind: {other}")),
        }
    }
}

/// Quality/cost trade; never changes picking or data.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PerformanceMode {
    Low,
    #[default]
    Normal,
}

impl PerformanceMode {
    /// Vertical bands per side wall.
    pub fn curve_segments(self) -> usize {
        match self {
            PerformanceMode::Low => 1,
            PerformanceMode::Normal => 2,
        }
    }

    /// Circle tessellation for markers.
    pub fn marker_segments(self) -> usize {
        match self {
            PerformanceMode::Low => 12,
            PerformanceMode::Normal => 24,
        }
    }

    pub fn gradient_sides(self) -> bool {
        matches!(self, PerformanceMode::Normal)
    }
}

impl FromStr for PerformanceMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(PerformanceMode::Low),
            "normal" => Ok(PerformanceMode::Normal),
            other => Err(format!("unknown performance mode: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtrusionStyle {
    pub fill: Color,
    /// Per-feature fill colors, chosen by feature index. Empty means `fill`.
    pub fill_palette: Vec<Color>,
    pub fill_opacity: f32,
    pub side_top: Color,
    pub side_bottom: Color,
    pub border: Color,
    pub hover: Color,
    pub hover_opacity: f32,
}

impl ExtrusionStyle {
    pub fn fill_for(&self, feature_index: usize) -> Color {
        if self.fill_palette.is_empty() {
            self.fill
        } else {
            self.fill_palette[feature_index % self.fill_palette.len()]
        }
    }

    /// Wall color at local height `z`, darker toward the base.
    pub fn side_at(&self, z: f64) -> Color {
        let t = (0.5 - z * 0.2).clamp(0.0, 1.0) as f32;
        self.side_top.lerp(self.side_bottom, t)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkerStyle {
    pub disc_radius: f64,
    pub inner_glow_radius: f64,
    pub ring_inner: f64,
    pub ring_outer: f64,
    pub outer_glow: Option<(f64, f64)>,
    pub hit_radius: f64,
    pub disc_color: Color,
    pub disc_opacity: f32,
    pub inner_glow_color: Color,
    pub ring_color: Color,
    pub ring_opacity: f32,
    pub outer_glow_color: Color,
    pub hover: Color,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabelStyle {
    pub font_px: f64,
    pub color: Color,
    pub offset_y_px: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CapitalStyle {
    pub outer: f64,
    pub inner: f64,
    pub border_scale: f64,
    pub star: Color,
    pub border: Color,
    pub border_opacity: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegionSpotStyle {
    pub disc_radius: f64,
    pub ring_inner: f64,
    pub ring_outer: f64,
    pub disc: Color,
    pub ring: Color,
}

/// Everything that differs between the two map kinds.
#[derive(Debug, Clone, PartialEq)]
pub struct MapStyle {
    pub kind: MapKind,
    pub root_scale: f64,
    pub extrusion: ExtrusionStyle,
    pub marker: MarkerStyle,
    pub label: LabelStyle,
    pub capital: CapitalStyle,
    pub region_spots: Option<RegionSpotStyle>,
    pub flights_enabled: bool,
    pub flight_marker_radius: f64,
    pub flight_marker: Color,
    pub flight_samples: usize,
    /// Uniform fill light under the follow light.
    pub ambient: Color,
    pub ambient_intensity: f64,
}

impl MapStyle {
    pub fn for_kind(kind: MapKind) -> Self {
        match kind {
            MapKind::Domestic => Self::domestic(),
            MapKind::World => Self::world(),
        }
    }

    fn domestic() -> Self {
        Self {
            kind: MapKind::Domestic,
            root_scale: 3.0,
            extrusion: ExtrusionStyle {
                fill: Color::from_hex_u32(0x356AA5),
                fill_palette: Vec::new(),
                fill_opacity: 0.9,
                side_top: Color::from_hex_u32(0x244A7A),
                side_bottom: Color::from_hex_u32(0x1B365A),
                border: Color::from_hex_u32(0x888888),
                hover: Color::from_hex_u32(0xFFD700),
                hover_opacity: 1.0,
            },
            marker: MarkerStyle {
                disc_radius: 0.25,
                inner_glow_radius: 0.2,
                ring_inner: 0.25,
                ring_outer: 0.5,
                outer_glow: Some((0.5, 0.7)),
                hit_radius: 1.2,
                ..Self::marker_palette()
            },
            label: LabelStyle {
                font_px: 15.0,
                color: Color::WHITE,
                offset_y_px: 16.0,
            },
            capital: CapitalStyle {
                outer: 0.45,
                inner: 0.2,
                ..Self::capital_palette()
            },
            region_spots: Some(RegionSpotStyle {
                disc_radius: 0.2,
                ring_inner: 0.2,
                ring_outer: 0.3,
                disc: Color::from_hex_u32(0x3EC5FB),
                ring: Color::from_hex_u32(0x3FC5FB),
            }),
            flights_enabled: true,
            flight_marker_radius: 0.2,
            flight_marker: Color::from_hex_u32(0x77F077),
            flight_samples: 30,
            ambient: Color::WHITE,
            ambient_intensity: 0.6,
        }
    }

    fn world() -> Self {
        Self {
            kind: MapKind::World,
            root_scale: 2.2,
            extrusion: ExtrusionStyle {
                fill: Color::from_hex_u32(0xFFECD1),
                fill_palette: [
                    0xFFECD1, 0xE0F0E9, 0xE3F2F9, 0xF9E6E6, 0xF2E6F9, 0xFFF8D6, 0xE6F9F5, 0xF9F3E6,
                ]
                .into_iter()
                .map(Color::from_hex_u32)
                .collect(),
                fill_opacity: 0.9,
                side_top: Color::from_hex_u32(0xCFB997),
                side_bottom: Color::from_hex_u32(0x8FBC8F),
                border: Color::from_hex_u32(0x888888),
                hover: Color::from_hex_u32(0xFFD700),
                hover_opacity: 1.0,
            },
            marker: MarkerStyle {
                disc_radius: 1.0,
                inner_glow_radius: 0.8,
                ring_inner: 1.0,
                ring_outer: 2.0,
                outer_glow: None,
                hit_radius: 4.2,
                ..Self::marker_palette()
            },
            label: LabelStyle {
                font_px: 14.0,
                color: Color::from_hex_u32(0xFFD700),
                offset_y_px: 16.0,
            },
            capital: CapitalStyle {
                outer: 1.2,
                inner: 0.52,
                ..Self::capital_palette()
            },
            region_spots: None,
            flights_enabled: false,
            flight_marker_radius: 0.2,
            flight_marker: Color::from_hex_u32(0x77F077),
            flight_samples: 30,
            ambient: Color::WHITE,
            ambient_intensity: 0.6,
        }
    }

    fn marker_palette() -> MarkerStyle {
        MarkerStyle {
            disc_radius: 0.0,
            inner_glow_radius: 0.0,
            ring_inner: 0.0,
            ring_outer: 0.0,
            outer_glow: None,
            hit_radius: 0.0,
            disc_color: Color::from_hex_u32(0xFFD700),
            disc_opacity: 0.9,
            inner_glow_color: Color::from_hex_u32(0xFFF3A0),
            ring_color: Color::from_hex_u32(0xFFB800),
            ring_opacity: 0.8,
            outer_glow_color: Color::from_hex_u32(0xFFD700),
            hover: Color::from_hex_u32(0xFF4500),
        }
    }

    fn capital_palette() -> CapitalStyle {
        CapitalStyle {
            outer: 0.0,
            inner: 0.0,
            border_scale: 1.12,
            star: Color::from_hex_u32(0xFF2D2D),
            border: Color::WHITE,
            border_opacity: 0.95,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{MapKind, MapStyle, PerformanceMode};

    #[test]
    fn kinds_parse_case_insensitively() {
        assert_eq!("World".parse::<MapKind>(), Ok(MapKind::World));
        assert_eq!("domestic".parse::<MapKind>(), Ok(MapKind::Domestic));
        assert!("moon".parse::<MapKind>().is_err());
        assert_eq!("LOW".parse::<PerformanceMode>(), Ok(PerformanceMode::Low));
    }

    #[test]
    fn world_style_has_no_glow_or_flights() {
        let world = MapStyle::for_kind(MapKind::World);
        assert!(world.marker.outer_glow.is_none());
        assert!(!world.flights_enabled);
        assert_eq!(world.root_scale, 2.2);
        let domestic = MapStyle::for_kind(MapKind::Domestic);
        assert!(domestic.marker.outer_glow.is_some());
        assert!(domestic.flights_enabled);
        assert!(domestic.marker.hit_radius > domestic.marker.ring_outer);
        assert_eq!(domestic.ambient_intensity, 0.6);
        assert_eq!(world.ambient, domestic.ambient);
    }

    #[test]
    fn palette_is_stable_per_feature() {
        let world = MapStyle::for_kind(MapKind::World);
        let a = world.extrusion.fill_for(3);
        assert_eq!(a, world.extrusion.fill_for(3));
        assert_eq!(a, world.extrusion.fill_for(3 + world.extrusion.fill_palette.len()));
    }

    #[test]
    fn wall_gradient_darkens_toward_base() {
        let style = MapStyle::for_kind(MapKind::Domestic).extrusion;
        assert_eq!(style.side_at(0.0), style.side_top.lerp(style.side_bottom, 0.5));
        assert_eq!(style.side_at(6.0), style.side_top);
    }

    #[test]
    fn low_mode_is_cheaper() {
        assert!(PerformanceMode::Low.curve_segments() < PerformanceMode::Normal.curve_segments());
        assert!(!PerformanceMode::Low.gradient_sides());
    }
}
