//! City markers, labels, and the decorative capital star.

use formats::display_config::{DisplayConfig, ResolvedCity};
use foundation::color::Color;
use foundation::math::{LonLat, MercatorProjector, Vec2, Vec3};
use scene::components::{LabelComponent, Transform};
use scene::entity::{EntityKey, NodeId};
use scene::map_entity::{CapitalMarker, CityMarker, DistrictLink, MapEntity};
use scene::picking::{PickPriority, PickShape, PickTarget};
use scene::resources::{GeometryId, Material, MaterialId, ResourceBundle, ResourceRegistry};
use scene::world::SceneGraph;
use tracing::{debug, warn};

use crate::geometry::{disc, radial_glow_texture, ring, star};
use crate::layer::{project_local, Layer, LayerBuilder, LayerId};
use crate::pulse::{PulseKind, PulseRing};
use crate::symbology::{
    MapStyle, PerformanceMode, CAPITAL_LIFT, HIT_ZONE_LIFT, LABEL_Z, SPOT_Z,
};

const GLOW_TEXTURE_PX: u32 = 64;

#[derive(Debug, Default)]
pub struct OverlayLayer {
    pub cities: Vec<EntityKey>,
    pub capital: Option<EntityKey>,
    pub pick_targets: Vec<PickTarget>,
    pub pulse_rings: Vec<PulseRing>,
    pub bundle: ResourceBundle,
    /// Cities whose coordinates did not project.
    pub dropped_cities: usize,
}

impl Layer for OverlayLayer {
    fn id(&self) -> LayerId {
        LayerId::Overlays
    }

    fn bundle(&self) -> &ResourceBundle {
        &self.bundle
    }

    fn take_bundle(&mut self) -> ResourceBundle {
        std::mem::take(&mut self.bundle)
    }
}

/// Geometry and materials reused by every city of one layer.
struct MarkerKit {
    disc: GeometryId,
    inner_glow: GeometryId,
    ring: GeometryId,
    outer_glow: Option<GeometryId>,
    hit: GeometryId,
    inner_glow_material: MaterialId,
    outer_glow_material: Option<MaterialId>,
    hit_material: MaterialId,
}

/// Builds markers for every city in `config` that has usable coordinates.
///
/// Regions of the dataset that the config does not list get no markers.
/// Each city's label, disc, ring, glows, and hit zone are owned by the same
/// `CityMarker` entity. The hit zone is the only pick shape, so a hit on it
/// recolors the visible disc. `capital`, when given and projectable, gets a
/// star that never becomes pickable.
pub fn build_overlays(
    config: &DisplayConfig,
    capital: Option<LonLat>,
    projector: &MercatorProjector,
    style: &MapStyle,
    mode: PerformanceMode,
    scene: &mut SceneGraph,
    registry: &mut ResourceRegistry,
) -> OverlayLayer {
    let mut builder = LayerBuilder::new(scene, registry);
    let mut layer = OverlayLayer::default();
    let cities = config.resolved_cities();

    if let Some(capital) = capital {
        match project_local(projector, capital) {
            Some(at) => layer.capital = Some(capital_star(&mut builder, style, at)),
            None => warn!(lon = capital.lon_deg, lat = capital.lat_deg, "capital does not project"),
        }
    }

    if !cities.is_empty() {
        let kit = marker_kit(&mut builder, style, mode);
        for city in &cities {
            let Some(at) = project_local(projector, city.coordinates) else {
                warn!(city = %city.name, "city coordinates do not project; marker dropped");
                layer.dropped_cities += 1;
                continue;
            };
            let (key, marker) = city_marker(&mut builder, style, &kit, city, at);
            layer.pick_targets.push(PickTarget {
                entity: key,
                priority: PickPriority::City,
                shape: PickShape::Disc {
                    center: marker.position + Vec3::new(0.0, 0.0, HIT_ZONE_LIFT),
                    radius: marker.hit_radius,
                },
            });
            layer.pulse_rings.push(PulseRing {
                node: marker.ring,
                material: marker.ring_material,
                kind: PulseKind::City,
            });
            layer.cities.push(key);
        }
    }

    layer.bundle = builder.finish();
    debug!(
        cities = layer.cities.len(),
        dropped = layer.dropped_cities,
        capital = layer.capital.is_some(),
        resources = layer.bundle.len(),
        "built overlay layer"
    );
    layer
}

fn marker_kit(
    builder: &mut LayerBuilder<'_>,
    style: &MapStyle,
    mode: PerformanceMode,
) -> MarkerKit {
    let m = &style.marker;
    let segments = mode.marker_segments();
    let (outer_glow, outer_glow_material) = match m.outer_glow {
        Some((inner, outer)) => {
            let glow = radial_glow_texture(GLOW_TEXTURE_PX, m.outer_glow_color);
            let texture = builder.texture(glow);
            let material = Material::basic(m.outer_glow_color, 0.4)
                .with_texture(texture)
                .without_depth_write();
            (
                Some(builder.geometry(ring(inner, outer, segments))),
                Some(builder.material(material)),
            )
        }
        None => (None, None),
    };
    MarkerKit {
        disc: builder.geometry(disc(m.disc_radius, segments)),
        inner_glow: builder.geometry(disc(m.inner_glow_radius, segments)),
        ring: builder.geometry(ring(m.ring_inner, m.ring_outer, segments)),
        outer_glow,
        hit: builder.geometry(disc(m.hit_radius, segments)),
        inner_glow_material: builder.material(Material::basic(m.inner_glow_color, 0.6)),
        outer_glow_material,
        hit_material: builder.material(Material::basic(Color::WHITE, 0.0).without_depth_write()),
    }
}

fn city_marker(
    builder: &mut LayerBuilder<'_>,
    style: &MapStyle,
    kit: &MarkerKit,
    city: &ResolvedCity,
    at: Vec2,
) -> (EntityKey, CityMarker) {
    let m = &style.marker;
    let position = Vec3::new(at.x, at.y, SPOT_Z);
    let lifted = |dz: f64| Transform::translate(position + Vec3::new(0.0, 0.0, dz));

    let disc_material = builder.material(Material::basic(m.disc_color, m.disc_opacity));
    let ring_material = builder.material(Material::basic(m.ring_color, m.ring_opacity));
    let disc = builder.mesh_node(lifted(0.0), kit.disc, disc_material);
    let inner_glow = builder.mesh_node(lifted(0.01), kit.inner_glow, kit.inner_glow_material);
    let ring = builder.mesh_node(lifted(0.0), kit.ring, ring_material);
    let outer_glow = match (kit.outer_glow, kit.outer_glow_material) {
        (Some(g), Some(mat)) => Some(builder.mesh_node(lifted(-0.01), g, mat)),
        _ => None,
    };
    let hit_zone = builder.hidden_mesh_node(lifted(HIT_ZONE_LIFT), kit.hit, kit.hit_material);
    let label = city_label(builder, style, &city.name, at);

    let marker = CityMarker {
        name: city.name.clone(),
        parent_name: city.region.clone(),
        url: city.url.clone(),
        districts: city
            .districts
            .iter()
            .map(|d| DistrictLink {
                name: d.name.clone(),
                url: d.url.clone(),
            })
            .collect(),
        position,
        disc,
        disc_material,
        inner_glow,
        ring,
        ring_material,
        outer_glow,
        hit_zone,
        hit_radius: m.hit_radius,
        label,
        original_color: m.disc_color,
        original_opacity: m.disc_opacity,
    };
    let key = builder.scene.add_entity(MapEntity::City(marker.clone()));
    let owned = [Some(disc), Some(inner_glow), Some(ring), outer_glow, Some(hit_zone), label];
    for node in owned.into_iter().flatten() {
        builder.scene.set_owner(node, key);
    }
    (key, marker)
}

fn city_label(
    builder: &mut LayerBuilder<'_>,
    style: &MapStyle,
    name: &str,
    at: Vec2,
) -> Option<NodeId> {
    let text = name.trim();
    if text.is_empty() {
        return None;
    }
    let node = builder.scene.spawn();
    builder
        .scene
        .set_transform(node, Transform::translate(Vec3::new(at.x, at.y, LABEL_Z)));
    builder.scene.set_label(
        node,
        LabelComponent {
            text: text.to_string(),
            font_px: style.label.font_px,
            color: style.label.color,
            offset_y_px: style.label.offset_y_px,
        },
    );
    Some(node)
}

fn capital_star(builder: &mut LayerBuilder<'_>, style: &MapStyle, at: Vec2) -> EntityKey {
    let c = &style.capital;
    let position = Vec3::new(at.x, at.y, SPOT_Z + CAPITAL_LIFT);
    let outline = builder.geometry(star(c.outer, c.inner, 5));
    let border_material = builder.material(Material::basic(c.border, c.border_opacity));
    let star_material = builder.material(Material::basic(c.star, 1.0));
    let border = builder.mesh_node(
        Transform::translate(position).with_scale(c.border_scale),
        outline,
        border_material,
    );
    let star = builder.mesh_node(
        Transform::translate(position + Vec3::new(0.0, 0.0, 0.001)),
        outline,
        star_material,
    );
    let key = builder.scene.add_entity(MapEntity::Capital(CapitalMarker {
        position,
        border,
        star,
    }));
    builder.scene.set_owner(border, key);
    builder.scene.set_owner(star, key);
    key
}
