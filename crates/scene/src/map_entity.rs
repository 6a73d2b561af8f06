//! Tagged union of everything the map renders.
//!
//! Picking, hover recoloring and tooltips read these descriptors directly;
//! nothing is discovered by probing node fields at runtime.

use foundation::color::Color;
use foundation::math::{LonLat, QuadraticCurve, Vec3};

use crate::entity::NodeId;
use crate::resources::MaterialId;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityKind {
    Region,
    City,
    Capital,
    Flight,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistrictLink {
    pub name: String,
    pub url: Option<String>,
}

/// Decorative pulsing dot at a region centroid.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RegionSpot {
    pub disc: NodeId,
    pub ring: NodeId,
    pub ring_material: MaterialId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegionMesh {
    pub name: String,
    pub centroid: Option<LonLat>,
    /// Index of the source feature in its collection.
    pub feature_index: usize,
    /// One extruded solid per ring.
    pub solids: Vec<NodeId>,
    pub borders: Vec<NodeId>,
    pub spot: Option<RegionSpot>,
    /// Shared by every solid's top face; the hover target.
    pub fill_material: MaterialId,
    pub original_color: Color,
    pub original_opacity: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CityMarker {
    pub name: String,
    pub parent_name: String,
    pub url: Option<String>,
    pub districts: Vec<DistrictLink>,
    /// Map-local anchor at marker height.
    pub position: Vec3,
    pub disc: NodeId,
    pub disc_material: MaterialId,
    pub inner_glow: NodeId,
    pub ring: NodeId,
    pub ring_material: MaterialId,
    pub outer_glow: Option<NodeId>,
    /// Invisible, larger than the disc; hovering it recolors `disc`.
    pub hit_zone: NodeId,
    pub hit_radius: f64,
    pub label: Option<NodeId>,
    pub original_color: Color,
    pub original_opacity: f32,
}

impl CityMarker {
    /// A city is worth clicking when it links somewhere.
    pub fn is_interactive_kind(&self) -> bool {
        self.url.as_deref().is_some_and(|u| !u.is_empty()) || !self.districts.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CapitalMarker {
    pub position: Vec3,
    pub border: NodeId,
    pub star: NodeId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlightMarker {
    pub city: String,
    pub path: NodeId,
    pub marker: NodeId,
    pub curve: QuadraticCurve,
    /// Always in `[0, 1)`.
    pub param: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MapEntity {
    Region(RegionMesh),
    City(CityMarker),
    Capital(CapitalMarker),
    Flight(FlightMarker),
}

impl MapEntity {
    pub fn kind(&self) -> EntityKind {
        match self {
            MapEntity::Region(_) => EntityKind::Region,
            MapEntity::City(_) => EntityKind::City,
            MapEntity::Capital(_) => EntityKind::Capital,
            MapEntity::Flight(_) => EntityKind::Flight,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            MapEntity::Region(r) => Some(&r.name),
            MapEntity::City(c) => Some(&c.name),
            MapEntity::Flight(f) => Some(&f.city),
            MapEntity::Capital(_) => None,
        }
    }

    /// Regions and cities take part in picking; decorations never do.
    pub fn is_interactive(&self) -> bool {
        matches!(self, MapEntity::Region(_) | MapEntity::City(_))
    }

    /// Material recolored on hover, with the color and opacity to restore.
    pub fn hover_target(&self) -> Option<(MaterialId, Color, f32)> {
        match self {
            MapEntity::Region(r) => Some((r.fill_material, r.original_color, r.original_opacity)),
            MapEntity::City(c) => Some((c.disc_material, c.original_color, c.original_opacity)),
            _ => None,
        }
    }

    pub fn as_city(&self) -> Option<&CityMarker> {
        match self {
            MapEntity::City(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_region(&self) -> Option<&RegionMesh> {
        match self {
            MapEntity::Region(r) => Some(r),
            _ => None,
        }
    }
}
