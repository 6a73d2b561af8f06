//! One full scene build: regions, overlays, then flights.

use std::sync::Arc;

use formats::display_config::{DisplayConfig, HubRef};
use formats::geojson::FeatureCollection;
use foundation::math::{LonLat, MercatorProjector, ProjectionParams, Vec3};
use layers::{
    build_flight_links, build_overlays, build_regions, FlightLayer, Layer, MapKind, MapStyle,
    OverlayLayer, PerformanceMode, RegionLayer,
};
use scene::picking::PickTarget;
use scene::resources::{ResourceBundle, ResourceRegistry};
use scene::world::SceneGraph;
use tracing::info;

use crate::animation::{IntroTween, SceneBindings};

/// Everything a build depends on. Any change means a full rebuild.
#[derive(Debug, Clone)]
pub struct SceneInputs {
    pub kind: MapKind,
    pub dataset: Arc<FeatureCollection>,
    pub projection: ProjectionParams,
    pub display: Arc<DisplayConfig>,
    /// Flight links converge here; unset means no flights.
    pub hub: Option<HubRef>,
    /// Decorative star position.
    pub capital: Option<LonLat>,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct BuildCounts {
    pub regions: usize,
    pub cities: usize,
    pub flights: usize,
    pub skipped_features: usize,
    pub skipped_rings: usize,
    pub dropped_cities: usize,
}

/// The three layers of a built scene, until their handles are handed over.
#[derive(Debug)]
pub struct BuiltScene {
    pub regions: RegionLayer,
    pub overlays: OverlayLayer,
    pub flights: FlightLayer,
}

impl BuiltScene {
    pub fn counts(&self) -> BuildCounts {
        BuildCounts {
            regions: self.regions.regions.len(),
            cities: self.overlays.cities.len(),
            flights: self.flights.flights.len(),
            skipped_features: self.regions.skipped_features,
            skipped_rings: self.regions.skipped_rings,
            dropped_cities: self.overlays.dropped_cities,
        }
    }

    /// Region and city pick shapes, in build order.
    pub fn take_pick_targets(&mut self) -> Vec<PickTarget> {
        let mut targets = std::mem::take(&mut self.regions.pick_targets);
        targets.append(&mut self.overlays.pick_targets);
        targets
    }

    /// Pulses, flights, and the light target for the animation loop.
    pub fn take_bindings(&mut self, intro: Option<IntroTween>) -> SceneBindings {
        let mut pulse_rings = std::mem::take(&mut self.regions.pulse_rings);
        pulse_rings.append(&mut self.overlays.pulse_rings);
        SceneBindings {
            pulse_rings,
            flights: std::mem::take(&mut self.flights.flights),
            light_target: self.flights.light_target,
            intro,
        }
    }

    /// Every resource handle the layers allocated, in one bundle.
    pub fn take_bundle(&mut self) -> ResourceBundle {
        let mut bundle = ResourceBundle::new();
        bundle.absorb(self.regions.take_bundle());
        bundle.absorb(self.overlays.take_bundle());
        bundle.absorb(self.flights.take_bundle());
        bundle
    }
}

/// Builds the whole scene for `inputs` into `scene` and `registry`.
pub fn build_scene(
    inputs: &SceneInputs,
    style: &MapStyle,
    mode: PerformanceMode,
    scene: &mut SceneGraph,
    registry: &mut ResourceRegistry,
) -> BuiltScene {
    let projector = MercatorProjector::new(inputs.projection);
    let regions = build_regions(&inputs.dataset, &projector, style, mode, scene, registry);
    let overlays = build_overlays(
        &inputs.display,
        inputs.capital,
        &projector,
        style,
        mode,
        scene,
        registry,
    );
    let flights = build_flight_links(
        &inputs.display,
        inputs.hub.as_ref(),
        inputs.kind,
        &projector,
        style,
        scene,
        registry,
    );
    let built = BuiltScene {
        regions,
        overlays,
        flights,
    };
    let counts = built.counts();
    info!(
        kind = %inputs.kind,
        regions = counts.regions,
        cities = counts.cities,
        flights = counts.flights,
        skipped_features = counts.skipped_features,
        resources = registry.counts().total(),
        "scene built"
    );
    built
}

/// Center of the built geometry at `z = 0`, the intro's fixed point.
pub fn scene_pivot(scene: &SceneGraph) -> Vec3 {
    let bounds = scene.local_bounds();
    if bounds.is_empty() {
        return Vec3::ZERO;
    }
    let [x, y, _] = bounds.center();
    Vec3::new(x, y, 0.0)
}

#[cfg(test)]
mod tests {
    use super::{build_scene, scene_pivot, SceneInputs};
    use formats::display_config::{DisplayConfig, HubRef};
    use formats::geojson::FeatureCollection;
    use foundation::math::{LonLat, ProjectionParams};
    use layers::{MapKind, MapStyle, PerformanceMode};
    use pretty_assertions::assert_eq;
    use scene::resources::ResourceRegistry;
    use scene::world::SceneGraph;
    use std::sync::Arc;

    const DATASET: &str = r#"{"type": "FeatureCollection", "features": [{
        "type": "Feature",
        "properties": {"name": "Fujian", "centroid": [119.3, 26.1]},
        "geometry": {"type": "Polygon", "coordinates": [[[116, 23], [121, 23], [121, 28], [116, 28], [116, 23]]]}
    }]}"#;

    const CONFIG: &str = r#"[{"name": "Fujian", "cities": [
        {"name": "Ningde", "coordinates": [119.5, 26.6]},
        {"name": "Fuzhou", "coordinates": [119.3, 26.1]},
        {"name": "Nowhere"}
    ]}]"#;

    fn inputs(kind: MapKind) -> SceneInputs {
        let (dataset, _) = FeatureCollection::from_geojson_str(DATASET).expect("dataset");
        SceneInputs {
            kind,
            dataset: Arc::new(dataset),
            projection: ProjectionParams::new(LonLat::new(118.5, 25.5), 40.0),
            display: Arc::new(DisplayConfig::from_json_str(CONFIG).expect("config")),
            hub: Some(HubRef {
                region: "Fujian".into(),
                city: "Ningde".into(),
            }),
            capital: Some(LonLat::new(119.3, 26.1)),
        }
    }

    #[test]
    fn builds_every_layer_and_hands_over_all_handles() {
        let mut scene = SceneGraph::new();
        let mut registry = ResourceRegistry::new();
        let inputs = inputs(MapKind::Domestic);
        let style = MapStyle::for_kind(MapKind::Domestic);
        let mut built = build_scene(&inputs, &style, PerformanceMode::Normal, &mut scene, &mut registry);
        let counts = built.counts();
        assert_eq!(counts.regions, 1);
        assert_eq!(counts.cities, 2);
        assert_eq!(counts.flights, 1);

        let targets = built.take_pick_targets();
        assert_eq!(targets.len(), 3);
        let bindings = built.take_bindings(None);
        assert!(bindings.light_target.is_some());
        assert_eq!(bindings.flights.len(), 1);
        // One region spot plus two city rings.
        assert_eq!(bindings.pulse_rings.len(), 3);

        let mut bundle = built.take_bundle();
        assert_eq!(bundle.counts(), registry.counts());
        let report = bundle.dispose_into(&mut registry);
        assert!(report.errors.is_empty());
        assert!(registry.counts().is_zero());
    }

    #[test]
    fn world_build_has_no_flights_and_no_light_target() {
        let mut scene = SceneGraph::new();
        let mut registry = ResourceRegistry::new();
        let style = MapStyle::for_kind(MapKind::World);
        let mut built = build_scene(
            &inputs(MapKind::World),
            &style,
            PerformanceMode::Low,
            &mut scene,
            &mut registry,
        );
        assert_eq!(built.counts().flights, 0);
        assert!(built.take_bindings(None).light_target.is_none());
    }

    #[test]
    fn pivot_is_the_center_of_the_geometry() {
        let mut scene = SceneGraph::new();
        let mut registry = ResourceRegistry::new();
        let style = MapStyle::for_kind(MapKind::Domestic);
        build_scene(
            &inputs(MapKind::Domestic),
            &style,
            PerformanceMode::Normal,
            &mut scene,
            &mut registry,
        );
        let pivot = scene_pivot(&scene);
        assert_eq!(pivot.z, 0.0);
        assert!(pivot.x.is_finite() && pivot.y.is_finite());
        assert_eq!(scene_pivot(&SceneGraph::new()), foundation::math::Vec3::ZERO);
    }
}
