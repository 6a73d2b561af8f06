#![allow(dead_code)]

use std::sync::Arc;

use engine::{EngineConfig, HeadlessPlatform, MapInstance, SceneInputs};
use formats::display_config::DisplayConfig;
use formats::geojson::FeatureCollection;
use foundation::math::{LonLat, ProjectionParams, Vec2, Vec3};
use foundation::time::Millis;
use layers::symbology::HIT_ZONE_LIFT;
use layers::MapKind;
use scene::entity::EntityKey;
use scene::map_entity::{CityMarker, MapEntity};

pub const FRAME_MS: f64 = 16.0;

/// One quadrilateral province.
pub const QUAD: &str = r#"{"type": "FeatureCollection", "features": [{
    "type": "Feature",
    "properties": {"name": "Fujian"},
    "geometry": {"type": "Polygon", "coordinates": [[[118, 25], [121, 25], [121, 28], [118, 28], [118, 25]]]}
}]}"#;

/// One city inside the quad, with no url and no districts.
pub const ONE_CITY: &str =
    r#"[{"name": "Fujian", "cities": [{"name": "Ningde", "coordinates": [119.5, 26.6]}]}]"#;

pub fn inputs(display: &str) -> SceneInputs {
    let (dataset, _) = FeatureCollection::from_geojson_str(QUAD).expect("dataset");
    SceneInputs {
        kind: MapKind::Domestic,
        dataset: Arc::new(dataset),
        projection: ProjectionParams::new(LonLat::new(119.5, 26.5), 100.0),
        display: Arc::new(DisplayConfig::from_json_str(display).expect("display config")),
        hub: None,
        capital: None,
    }
}

pub fn config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.picking.grace_ms = 300.0;
    config.picking.sample_interval_ms = 40.0;
    config.build_defer_ms = 100.0;
    config.viewport.width = 800;
    config.viewport.height = 800;
    config
}

/// Runs timers and frames every `FRAME_MS` from `from` through `to`.
/// Returns the next unvisited time.
pub fn drive(map: &mut MapInstance, platform: &mut HeadlessPlatform, from: f64, to: f64) -> f64 {
    let mut now = from;
    while now <= to {
        map.on_timer(Millis(now), platform);
        for id in platform.take_frames() {
            map.on_frame(id, Millis(now), platform);
        }
        now += FRAME_MS;
    }
    now
}

/// A built, active map whose intro has finished.
pub fn ready_map(display: &str) -> (MapInstance, HeadlessPlatform, f64) {
    let mut platform = HeadlessPlatform::default();
    let mut map = MapInstance::new(MapKind::Domestic, config());
    map.mount(inputs(display), &mut platform, Millis(0.0))
        .expect("mount");
    let now = drive(&mut map, &mut platform, 0.0, 1_400.0);
    (map, platform, now)
}

pub fn city(map: &MapInstance) -> (EntityKey, CityMarker) {
    map.scene()
        .entities()
        .find_map(|(key, entity)| match entity {
            MapEntity::City(city) => Some((key, city.clone())),
            _ => None,
        })
        .expect("a city marker")
}

/// Container pixel over the city's hit zone.
pub fn city_pixel(map: &MapInstance) -> Vec2 {
    let (_, city) = city(map);
    map.screen_position(city.position + Vec3::new(0.0, 0.0, HIT_ZONE_LIFT))
        .expect("city on screen")
}

pub fn disc_color(map: &MapInstance) -> foundation::color::Color {
    let (_, city) = city(map);
    map.registry()
        .material(city.disc_material)
        .expect("disc material")
        .color
}
