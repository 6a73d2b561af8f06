//! Pointer hover: ray picking against a cached target list, hover
//! recoloring, and tooltip state with a grace window.

use foundation::color::Color;
use foundation::math::Vec2;
use foundation::time::{Deadline, Millis};
use layers::{CameraLabelProjector, LabelIndex, MapStyle};
use runtime::throttle::RateLimiter;
use scene::camera::{PerspectiveCamera, Viewport};
use scene::entity::EntityKey;
use scene::map_entity::MapEntity;
use scene::picking::{PickIndex, PickTarget, Ray};
use scene::resources::{MaterialId, ResourceRegistry};
use scene::world::SceneGraph;
use tracing::debug;

use crate::config::PickingConfig;
use crate::tooltip::{Cursor, TooltipState};

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum HoverState {
    Idle,
    Hovering(EntityKey),
    /// Target lost; the tooltip stays until `deadline`.
    GracePeriod { entity: EntityKey, deadline: Deadline },
}

/// Colors written to a hovered entity's material.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct HoverColors {
    pub region: Color,
    pub region_opacity: f32,
    pub city: Color,
}

impl HoverColors {
    pub fn from_style(style: &MapStyle) -> Self {
        Self {
            region: style.extrusion.hover,
            region_opacity: style.extrusion.hover_opacity,
            city: style.marker.hover,
        }
    }
}

/// One recolor, as seen from the material.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PickResult {
    pub entity: EntityKey,
    pub prior_color: Color,
    pub current_color: Color,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SampleOutcome {
    /// Rate-limited, no pointer, or the pointer is inside the tooltip.
    Skipped,
    /// A new target; the tooltip moved to the pointer.
    Entered(PickResult),
    /// Same target as before; nothing re-issued.
    Unchanged,
    /// The target lost during grace came back.
    Resumed,
    Grace,
    Hidden,
    Idle,
}

/// What a pick needs to see of the scene.
#[derive(Debug, Copy, Clone)]
pub struct PickContext<'a> {
    pub scene: &'a SceneGraph,
    pub camera: &'a PerspectiveCamera,
    pub viewport: Viewport,
}

/// Hover material currently applied, with what to restore.
#[derive(Debug, Copy, Clone, PartialEq)]
struct AppliedHover {
    entity: EntityKey,
    material: MaterialId,
    original_color: Color,
    original_opacity: f32,
    hover_color: Color,
}

/// `Idle` / `Hovering` / `GracePeriod` state machine over pointer samples.
///
/// Targets are cached once per scene by [`PickingEngine::rebuild_cache`]; a
/// sample never walks the scene. Label boxes are checked before the 3D
/// ray, and city hits beat region hits.
#[derive(Debug)]
pub struct PickingEngine {
    index: PickIndex,
    labels: LabelIndex,
    state: HoverState,
    applied: Option<AppliedHover>,
    tooltip: Option<TooltipState>,
    cursor: Cursor,
    pointer: Option<Vec2>,
    in_tooltip: bool,
    limiter: RateLimiter,
    grace_ms: f64,
    tooltip_offset: Vec2,
    colors: HoverColors,
}

impl PickingEngine {
    pub fn new(config: &PickingConfig, colors: HoverColors) -> Self {
        Self {
            index: PickIndex::default(),
            labels: LabelIndex::default(),
            state: HoverState::Idle,
            applied: None,
            tooltip: None,
            cursor: Cursor::Default,
            pointer: None,
            in_tooltip: false,
            limiter: RateLimiter::new(config.sample_interval_ms),
            grace_ms: config.grace_ms,
            tooltip_offset: Vec2::new(config.tooltip_offset_px[0], config.tooltip_offset_px[1]),
            colors,
        }
    }

    /// Caches the interactive targets and labels of a freshly built scene.
    ///
    /// Targets whose entity is missing or decorative are dropped here.
    pub fn rebuild_cache(&mut self, scene: &SceneGraph, targets: Vec<PickTarget>) {
        let targets: Vec<PickTarget> = targets
            .into_iter()
            .filter(|t| scene.entity(t.entity).is_some_and(MapEntity::is_interactive))
            .collect();
        self.index = PickIndex::build(targets);
        self.labels = LabelIndex::from_scene(scene);
        debug!(
            targets = self.index.len(),
            entities = self.index.entity_count(),
            labels = self.labels.len(),
            "pick cache rebuilt"
        );
    }

    pub fn interactive_entities(&self) -> usize {
        self.index.entity_count()
    }

    pub fn state(&self) -> HoverState {
        self.state
    }

    pub fn tooltip(&self) -> Option<&TooltipState> {
        self.tooltip.as_ref()
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn hovered(&self) -> Option<EntityKey> {
        match self.state {
            HoverState::Hovering(e) => Some(e),
            _ => None,
        }
    }

    /// Records the latest pointer position; picking happens in `sample`.
    pub fn pointer_move(&mut self, px: Vec2) {
        self.pointer = Some(px);
    }

    /// Resolves the latest pointer position, at most once per sampling
    /// interval.
    pub fn sample(
        &mut self,
        ctx: PickContext<'_>,
        registry: &mut ResourceRegistry,
        now: Millis,
    ) -> SampleOutcome {
        if self.in_tooltip {
            return SampleOutcome::Skipped;
        }
        let Some(px) = self.pointer else {
            return SampleOutcome::Skipped;
        };
        if !self.limiter.allow(now) {
            return SampleOutcome::Skipped;
        }
        let target = self.resolve(px, ctx);
        self.transition(target, px, ctx.scene, registry, now)
    }

    /// The pointer left the container: the target is lost right away.
    pub fn pointer_leave(
        &mut self,
        scene: &SceneGraph,
        registry: &mut ResourceRegistry,
        now: Millis,
    ) -> SampleOutcome {
        self.pointer = None;
        if self.in_tooltip {
            return SampleOutcome::Skipped;
        }
        self.transition(None, Vec2::ZERO, scene, registry, now)
    }

    /// Ends an elapsed grace period. Returns `true` when the tooltip was
    /// hidden.
    pub fn expire(&mut self, now: Millis) -> bool {
        if self.in_tooltip {
            return false;
        }
        match self.state {
            HoverState::GracePeriod { deadline, .. } if deadline.is_expired(now) => {
                self.hide();
                true
            }
            _ => false,
        }
    }

    /// The pointer reached the tooltip panel; the tooltip is held.
    pub fn enter_tooltip(&mut self) {
        self.in_tooltip = true;
        if let Some(tooltip) = self.tooltip.as_mut() {
            tooltip.pinned = true;
        }
    }

    /// The pointer left the panel: hide and go idle.
    pub fn leave_tooltip(&mut self, registry: &mut ResourceRegistry) {
        self.in_tooltip = false;
        self.release_hover(registry);
        self.hide();
    }

    /// Restores the hovered material, if any. Each applied hover is restored
    /// exactly once.
    pub fn release_hover(&mut self, registry: &mut ResourceRegistry) -> Option<PickResult> {
        let applied = self.applied.take()?;
        if let Some(material) = registry.material_mut(applied.material) {
            material.color = applied.original_color;
            material.opacity = applied.original_opacity;
        }
        Some(PickResult {
            entity: applied.entity,
            prior_color: applied.hover_color,
            current_color: applied.original_color,
        })
    }

    /// Drops hover, tooltip, and pointer state while keeping the cache.
    pub fn deactivate(&mut self, registry: &mut ResourceRegistry) -> Option<PickResult> {
        let released = self.release_hover(registry);
        self.hide();
        self.pointer = None;
        self.in_tooltip = false;
        self.limiter.reset();
        released
    }

    /// Forgets every reference into the scene. The materials are assumed
    /// gone, so nothing is restored.
    pub fn clear(&mut self) {
        self.index = PickIndex::default();
        self.labels = LabelIndex::default();
        self.applied = None;
        self.pointer = None;
        self.in_tooltip = false;
        self.limiter.reset();
        self.hide();
    }

    fn hide(&mut self) {
        self.state = HoverState::Idle;
        self.tooltip = None;
        self.cursor = Cursor::Default;
    }

    fn resolve(&self, px: Vec2, ctx: PickContext<'_>) -> Option<EntityKey> {
        let root = ctx.scene.root();
        let projector = CameraLabelProjector::new(ctx.camera, root, ctx.viewport);
        if let Some(hit) = self.labels.hit(px, &projector) {
            return Some(hit);
        }
        let ray = ctx.camera.ray_from_screen(px, ctx.viewport)?;
        let inverse = root.inverse()?;
        let local = Ray::new(
            inverse.transform_point(ray.origin),
            inverse.transform_vector(ray.dir),
        );
        self.index.pick(&local).map(|hit| hit.entity)
    }

    fn transition(
        &mut self,
        target: Option<EntityKey>,
        px: Vec2,
        scene: &SceneGraph,
        registry: &mut ResourceRegistry,
        now: Millis,
    ) -> SampleOutcome {
        match (target, self.state) {
            (Some(t), HoverState::Hovering(current)) if t == current => SampleOutcome::Unchanged,
            (Some(t), HoverState::GracePeriod { entity, .. }) if t == entity => {
                self.apply_hover(t, scene, registry);
                self.state = HoverState::Hovering(t);
                SampleOutcome::Resumed
            }
            (Some(t), _) => {
                self.release_hover(registry);
                let Some(result) = self.apply_hover(t, scene, registry) else {
                    self.hide();
                    return SampleOutcome::Idle;
                };
                let Some(entity) = scene.entity(t) else {
                    self.hide();
                    return SampleOutcome::Idle;
                };
                self.tooltip = TooltipState::for_entity(entity, px + self.tooltip_offset);
                self.cursor = match entity.as_city() {
                    Some(city) if city.is_interactive_kind() => Cursor::Pointer,
                    _ => Cursor::Default,
                };
                self.state = HoverState::Hovering(t);
                SampleOutcome::Entered(result)
            }
            (None, HoverState::Hovering(entity)) => {
                self.release_hover(registry);
                self.state = HoverState::GracePeriod {
                    entity,
                    deadline: Deadline::after(now, self.grace_ms),
                };
                SampleOutcome::Grace
            }
            (None, HoverState::GracePeriod { deadline, .. }) => {
                if deadline.is_expired(now) {
                    self.hide();
                    SampleOutcome::Hidden
                } else {
                    SampleOutcome::Grace
                }
            }
            (None, HoverState::Idle) => SampleOutcome::Idle,
        }
    }

    fn apply_hover(
        &mut self,
        entity: EntityKey,
        scene: &SceneGraph,
        registry: &mut ResourceRegistry,
    ) -> Option<PickResult> {
        let mapped = scene.entity(entity)?;
        let (material_id, original_color, original_opacity) = mapped.hover_target()?;
        let (hover_color, hover_opacity) = match mapped {
            MapEntity::Region(_) => (self.colors.region, self.colors.region_opacity),
            _ => (self.colors.city, original_opacity),
        };
        let material = registry.material_mut(material_id)?;
        let prior_color = material.color;
        material.color = hover_color;
        material.opacity = hover_opacity;
        self.applied = Some(AppliedHover {
            entity,
            material: material_id,
            original_color,
            original_opacity,
            hover_color,
        });
        Some(PickResult {
            entity,
            prior_color,
            current_color: hover_color,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{HoverColors, HoverState, PickContext, PickingEngine, SampleOutcome};
    use crate::config::PickingConfig;
    use layers::labels::LabelProjector;
    use layers::CameraLabelProjector;
    use scene::picking::Ray;
    use crate::tooltip::Cursor;
    use formats::display_config::DisplayConfig;
    use formats::geojson::FeatureCollection;
    use foundation::math::{LonLat, MercatorProjector, ProjectionParams, Vec2, Vec3};
    use foundation::time::Millis;
    use layers::{build_overlays, build_regions, MapKind, MapStyle, PerformanceMode};
    use layers::symbology::{HIT_ZONE_LIFT, REGION_DEPTH, SPOT_Z};
    use pretty_assertions::assert_eq;
    use scene::camera::{PerspectiveCamera, Viewport};
    use scene::entity::EntityKey;
    use scene::resources::ResourceRegistry;
    use scene::world::SceneGraph;

    const DATASET: &str = r#"{"type": "FeatureCollection", "features": [{
        "type": "Feature",
        "properties": {"name": "Fujian"},
        "geometry": {"type": "Polygon", "coordinates": [[[118, 25], [121, 25], [121, 28], [118, 28], [118, 25]]]}
    }]}"#;

    const CONFIG: &str = r#"[{"name": "Fujian", "cities": [
        {"name": "Ningde", "coordinates": [119.5, 26.6], "url": "https://example.com/ningde"}
    ]}]"#;

    struct Fixture {
        scene: SceneGraph,
        registry: ResourceRegistry,
        camera: PerspectiveCamera,
        viewport: Viewport,
        projector: MercatorProjector,
        region: EntityKey,
        city: EntityKey,
        engine: PickingEngine,
    }

    impl Fixture {
        fn new() -> Self {
            let (collection, _) = FeatureCollection::from_geojson_str(DATASET).expect("dataset");
            let config = DisplayConfig::from_json_str(CONFIG).expect("config");
            let projector = MercatorProjector::new(ProjectionParams {
                center: LonLat::new(119.5, 26.5),
                scale: 100.0,
            });
            let style = MapStyle::for_kind(MapKind::Domestic);
            let mut scene = SceneGraph::new();
            let mut registry = ResourceRegistry::new();
            let regions = build_regions(
                &collection,
                &projector,
                &style,
                PerformanceMode::Normal,
                &mut scene,
                &mut registry,
            );
            let overlays = build_overlays(
                &config,
                None,
                &projector,
                &style,
                PerformanceMode::Normal,
                &mut scene,
                &mut registry,
            );
            let mut engine = PickingEngine::new(
                &PickingConfig {
                    grace_ms: 300.0,
                    sample_interval_ms: 40.0,
                    tooltip_offset_px: [15.0, 15.0],
                },
                HoverColors::from_style(&style),
            );
            let mut targets = regions.pick_targets.clone();
            targets.extend(overlays.pick_targets.iter().cloned());
            engine.rebuild_cache(&scene, targets);
            Self {
                region: regions.regions[0],
                city: overlays.cities[0],
                scene,
                registry,
                camera: PerspectiveCamera::default(),
                viewport: Viewport::new(800.0, 800.0),
                projector,
                engine,
            }
        }

        /// Screen pixel of a geographic point at height `z`.
        fn pixel(&self, lon: f64, lat: f64, z: f64) -> Vec2 {
            let local = layers::project_local(&self.projector, LonLat::new(lon, lat))
                .expect("projects");
            self.camera
                .project_to_screen(Vec3::new(local.x, local.y, z), self.viewport)
                .expect("on screen")
        }

        fn sample(&mut self, px: Vec2, now: f64) -> SampleOutcome {
            self.engine.pointer_move(px);
            let ctx = PickContext {
                scene: &self.scene,
                camera: &self.camera,
                viewport: self.viewport,
            };
            self.engine.sample(ctx, &mut self.registry, Millis(now))
        }

        fn fill_color(&self, key: EntityKey) -> foundation::color::Color {
            let (material, _, _) = self
                .scene
                .entity(key)
                .and_then(|e| e.hover_target())
                .expect("hover target");
            self.registry.material(material).expect("material").color
        }
    }

    #[test]
    fn decorations_are_not_cached() {
        let fixture = Fixture::new();
        assert_eq!(fixture.engine.interactive_entities(), 2);
    }

    #[test]
    fn city_beats_the_region_under_it() {
        let mut f = Fixture::new();
        let px = f.pixel(119.5, 26.6, SPOT_Z + HIT_ZONE_LIFT);
        match f.sample(px, 0.0) {
            SampleOutcome::Entered(result) => assert_eq!(result.entity, f.city),
            other => panic!("expected a city hit, got {other:?}"),
        }
        assert_eq!(f.engine.cursor(), Cursor::Pointer);
        let tooltip = f.engine.tooltip().expect("tooltip");
        assert_eq!(tooltip.label, "Ningde");
        assert_eq!(tooltip.parent_name.as_deref(), Some("Fujian"));
    }

    #[test]
    fn label_box_over_the_region_picks_the_city() {
        let mut f = Fixture::new();
        let root = f.scene.root();
        let projector = CameraLabelProjector::new(&f.camera, root, f.viewport);
        let label = f
            .engine
            .labels
            .anchors()
            .iter()
            .find(|a| a.entity == f.city)
            .cloned()
            .expect("city label");
        let anchor = projector.project(label.position).expect("label on screen");
        let px = Vec2::new(anchor.x + 24.0, anchor.y - 16.0);
        let placed = f.engine.labels.layout(&projector);
        assert!(placed.iter().any(|l| l.entity == f.city && l.contains(px)));

        let ray = f.camera.ray_from_screen(px, f.viewport).expect("ray");
        let inverse = root.inverse().expect("invertible root");
        let local = Ray::new(
            inverse.transform_point(ray.origin),
            inverse.transform_vector(ray.dir),
        );
        assert_eq!(f.engine.index.pick(&local).map(|hit| hit.entity), Some(f.region));

        match f.sample(px, 0.0) {
            SampleOutcome::Entered(result) => assert_eq!(result.entity, f.city),
            other => panic!("expected the labelled city, got {other:?}"),
        }
    }

    #[test]
    fn same_target_does_not_move_the_tooltip() {
        let mut f = Fixture::new();
        let px = f.pixel(118.3, 25.3, REGION_DEPTH);
        assert!(matches!(f.sample(px, 0.0), SampleOutcome::Entered(_)));
        let first = f.engine.tooltip().expect("tooltip").position;
        let nudged = Vec2::new(px.x + 3.0, px.y + 2.0);
        assert_eq!(f.sample(nudged, 100.0), SampleOutcome::Unchanged);
        assert_eq!(f.engine.tooltip().expect("tooltip").position, first);
        assert_eq!(f.engine.state(), HoverState::Hovering(f.region));
    }

    #[test]
    fn samples_are_rate_limited() {
        let mut f = Fixture::new();
        let px = f.pixel(118.3, 25.3, REGION_DEPTH);
        assert!(matches!(f.sample(px, 0.0), SampleOutcome::Entered(_)));
        assert_eq!(f.sample(px, 10.0), SampleOutcome::Skipped);
        assert_eq!(f.sample(px, 45.0), SampleOutcome::Unchanged);
    }

    #[test]
    fn switching_targets_restores_the_previous_color() {
        let mut f = Fixture::new();
        let original = f.fill_color(f.region);
        let region_px = f.pixel(118.3, 25.3, REGION_DEPTH);
        f.sample(region_px, 0.0);
        assert_ne!(f.fill_color(f.region), original);

        let city_px = f.pixel(119.5, 26.6, SPOT_Z + HIT_ZONE_LIFT);
        assert!(matches!(f.sample(city_px, 100.0), SampleOutcome::Entered(_)));
        assert_eq!(f.fill_color(f.region), original);

        f.sample(region_px, 200.0);
        f.sample(city_px, 300.0);
        assert_eq!(f.fill_color(f.region), original);
    }

    #[test]
    fn grace_keeps_the_tooltip_then_hides_it() {
        let mut f = Fixture::new();
        let px = f.pixel(119.5, 26.6, SPOT_Z + HIT_ZONE_LIFT);
        f.sample(px, 0.0);
        let off_map = Vec2::new(5.0, 5.0);
        assert_eq!(f.sample(off_map, 100.0), SampleOutcome::Grace);
        assert!(f.engine.tooltip().is_some());
        assert!(!f.engine.expire(Millis(399.0)));
        assert!(f.engine.expire(Millis(400.0)));
        assert!(f.engine.tooltip().is_none());
        assert_eq!(f.engine.state(), HoverState::Idle);
    }

    #[test]
    fn tooltip_panel_holds_the_tooltip_past_the_deadline() {
        let mut f = Fixture::new();
        let px = f.pixel(119.5, 26.6, SPOT_Z + HIT_ZONE_LIFT);
        f.sample(px, 0.0);
        assert_eq!(
            f.engine.pointer_leave(&f.scene, &mut f.registry, Millis(50.0)),
            SampleOutcome::Grace
        );
        f.engine.enter_tooltip();
        assert!(!f.engine.expire(Millis(5_000.0)));
        assert!(f.engine.tooltip().expect("held").pinned);

        f.engine.leave_tooltip(&mut f.registry);
        assert!(f.engine.tooltip().is_none());
        assert_eq!(f.engine.state(), HoverState::Idle);
    }

    #[test]
    fn rehover_during_grace_resumes_without_moving_the_tooltip() {
        let mut f = Fixture::new();
        let original = f.fill_color(f.region);
        let px = f.pixel(118.3, 25.3, REGION_DEPTH);
        f.sample(px, 0.0);
        let anchored = f.engine.tooltip().expect("tooltip").position;
        f.sample(Vec2::new(5.0, 5.0), 100.0);
        assert_eq!(f.fill_color(f.region), original);

        assert_eq!(f.sample(px, 200.0), SampleOutcome::Resumed);
        assert_ne!(f.fill_color(f.region), original);
        assert_eq!(f.engine.tooltip().expect("tooltip").position, anchored);
    }

    #[test]
    fn release_restores_exactly_once() {
        let mut f = Fixture::new();
        let original = f.fill_color(f.region);
        let px = f.pixel(118.3, 25.3, REGION_DEPTH);
        f.sample(px, 0.0);
        let released = f.engine.release_hover(&mut f.registry).expect("restored");
        assert_eq!(released.entity, f.region);
        assert_eq!(released.current_color, original);
        assert!(f.engine.release_hover(&mut f.registry).is_none());
    }
}
