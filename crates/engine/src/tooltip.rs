use foundation::math::Vec2;
use scene::map_entity::{DistrictLink, EntityKind, MapEntity};

/// What the detail panel shows for the hovered entity.
#[derive(Debug, Clone, PartialEq)]
pub struct TooltipState {
    pub kind: EntityKind,
    pub label: String,
    pub parent_name: Option<String>,
    pub links: Vec<DistrictLink>,
    /// The entity links somewhere (a URL or at least one district).
    pub is_interactive_kind: bool,
    /// Held open while the pointer is inside the panel.
    pub pinned: bool,
    /// Panel anchor in container pixels.
    pub position: Vec2,
}

impl TooltipState {
    /// `None` for decorations, which never get a tooltip.
    pub fn for_entity(entity: &MapEntity, position: Vec2) -> Option<Self> {
        match entity {
            MapEntity::City(city) => Some(Self {
                kind: EntityKind::City,
                label: city.name.clone(),
                parent_name: Some(city.parent_name.clone()),
                links: city.districts.clone(),
                is_interactive_kind: city.is_interactive_kind(),
                pinned: false,
                position,
            }),
            MapEntity::Region(region) => Some(Self {
                kind: EntityKind::Region,
                label: region.name.clone(),
                parent_name: None,
                links: Vec::new(),
                is_interactive_kind: false,
                pinned: false,
                position,
            }),
            MapEntity::Capital(_) | MapEntity::Flight(_) => None,
        }
    }
}

/// Pointer affordance over the map.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum Cursor {
    #[default]
    Default,
    Pointer,
}
