//! Curved links from every configured city to the hub.

use formats::display_config::{DisplayConfig, HubRef};
use foundation::color::Color;
use foundation::math::{MercatorProjector, QuadraticCurve, Vec3};
use scene::components::Transform;
use scene::entity::EntityKey;
use scene::map_entity::{FlightMarker, MapEntity};
use scene::resources::{GeometryBuffer, Material, ResourceBundle, ResourceRegistry};
use scene::world::SceneGraph;
use tracing::{debug, warn};

use crate::geometry::sphere;
use crate::layer::{project_local, Layer, LayerBuilder, LayerId};
use crate::symbology::{MapKind, MapStyle, FLIGHT_ARC_Z, SPOT_Z};

#[derive(Debug, Default)]
pub struct FlightLayer {
    pub flights: Vec<EntityKey>,
    pub bundle: ResourceBundle,
    /// Hub position in map-local space; the follow light aims here.
    pub light_target: Option<Vec3>,
}

impl Layer for FlightLayer {
    fn id(&self) -> LayerId {
        LayerId::Flights
    }

    fn bundle(&self) -> &ResourceBundle {
        &self.bundle
    }

    fn take_bundle(&mut self) -> ResourceBundle {
        std::mem::take(&mut self.bundle)
    }
}

/// Path color at sample `j`: a fixed green hue, lightening along the path.
pub fn path_color(j: usize) -> Color {
    Color::from_hsl(0.21, 0.77, 0.55 + j as f32 * 0.0025)
}

/// Builds one flight per city, hub excluded.
///
/// Nothing is built for the world kind, for an empty config, or when `hub`
/// is missing or names no geocoded city. The returned `light_target` is set
/// whenever the hub resolves, even if no flight was built.
pub fn build_flight_links(
    config: &DisplayConfig,
    hub: Option<&HubRef>,
    kind: MapKind,
    projector: &MercatorProjector,
    style: &MapStyle,
    scene: &mut SceneGraph,
    registry: &mut ResourceRegistry,
) -> FlightLayer {
    let mut layer = FlightLayer::default();
    if kind == MapKind::World || !style.flights_enabled {
        debug!(kind = %kind, "flights disabled for this map kind");
        return layer;
    }
    if config.is_empty() {
        debug!("no display config; flights skipped");
        return layer;
    }
    let Some(hub) = hub else {
        debug!("no hub configured; flights skipped");
        return layer;
    };
    let Some(hub_city) = config.resolve_hub(hub) else {
        warn!(region = %hub.region, city = %hub.city, "hub not found in display config");
        return layer;
    };
    let Some(hub_at) = project_local(projector, hub_city.coordinates) else {
        warn!(city = %hub_city.name, "hub coordinates do not project");
        return layer;
    };
    let end = Vec3::new(hub_at.x, hub_at.y, SPOT_Z);
    layer.light_target = Some(end);

    let mut builder = LayerBuilder::new(scene, registry);
    let marker_geometry = builder.geometry(sphere(style.flight_marker_radius, 16, 12));
    let marker_material = builder.material(Material::basic(style.flight_marker, 1.0));
    let path_material = builder.material(Material::vertex_colored(1.0));

    for city in config.resolved_cities() {
        if city.region == hub_city.region && city.name == hub_city.name {
            continue;
        }
        let Some(at) = project_local(projector, city.coordinates) else {
            continue;
        };
        let start = Vec3::new(at.x, at.y, SPOT_Z);
        let mid = start.lerp(end, 0.5);
        let curve = QuadraticCurve::new(start, Vec3::new(mid.x, mid.y, FLIGHT_ARC_Z), end);

        let samples = curve.sample(style.flight_samples);
        let positions = samples
            .iter()
            .map(|p| [p.x as f32, p.y as f32, p.z as f32])
            .collect();
        let colors = (0..samples.len()).map(|j| path_color(j).to_array()).collect();
        let path_buffer = GeometryBuffer::line_strip(positions).with_colors(colors);
        let path_geometry = builder.geometry(path_buffer);
        let path = builder.mesh_node(Transform::identity(), path_geometry, path_material);
        let marker = builder.mesh_node(
            Transform::translate(curve.point_at(0.0)),
            marker_geometry,
            marker_material,
        );

        let key = builder.scene.add_entity(MapEntity::Flight(FlightMarker {
            city: city.name.clone(),
            path,
            marker,
            curve,
            param: 0.0,
        }));
        builder.scene.set_owner(path, key);
        builder.scene.set_owner(marker, key);
        layer.flights.push(key);
    }

    layer.bundle = builder.finish();
    debug!(flights = layer.flights.len(), hub = %hub_city.name, "built flight layer");
    layer
}
