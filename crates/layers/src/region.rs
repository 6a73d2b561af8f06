//! Extruded region solids built from a feature collection.

use formats::geojson::{FeatureCollection, GeoFeature};
use foundation::color::Color;
use foundation::math::{MercatorProjector, Vec2, Vec3};
use scene::components::Transform;
use scene::entity::{EntityKey, NodeId};
use scene::map_entity::{MapEntity, RegionMesh, RegionSpot};
use scene::picking::{PickPriority, PickShape, PickTarget};
use scene::resources::{
    GeometryBuffer, GeometryId, Material, MaterialId, ResourceBundle, ResourceRegistry,
};
use scene::world::SceneGraph;
use tracing::{debug, warn};

use crate::geometry::{
    disc, drop_closing_duplicate, extrude_ring, is_degenerate_ring, ring, ExtrudedRing,
};
use crate::layer::{project_local, Layer, LayerBuilder, LayerId};
use crate::pulse::{PulseKind, PulseRing};
use crate::symbology::{MapStyle, PerformanceMode, BORDER_Z, REGION_DEPTH, SPOT_Z};

#[derive(Debug, Default)]
pub struct RegionLayer {
    /// One entity per feature that produced at least one solid.
    pub regions: Vec<EntityKey>,
    pub pick_targets: Vec<PickTarget>,
    pub pulse_rings: Vec<PulseRing>,
    pub bundle: ResourceBundle,
    pub skipped_rings: usize,
    pub skipped_features: usize,
}

impl Layer for RegionLayer {
    fn id(&self) -> LayerId {
        LayerId::Regions
    }

    fn bundle(&self) -> &ResourceBundle {
        &self.bundle
    }

    fn take_bundle(&mut self) -> ResourceBundle {
        std::mem::take(&mut self.bundle)
    }
}

/// Layer-wide shared resources.
struct Shared {
    side: MaterialId,
    border: MaterialId,
    spot: Option<SpotShared>,
}

struct SpotShared {
    disc: GeometryId,
    ring: GeometryId,
    disc_material: MaterialId,
    ring_color: Color,
}

/// Builds one `RegionMesh` entity per feature.
///
/// Every ring of a feature (outer rings, holes, and the extra polygons of a
/// `MultiPolygon`) is extruded on its own. Rings that fail to project or
/// triangulate are skipped; a feature with no surviving ring is skipped.
/// All rings of a region share its fill material, so a hover recolors the
/// whole region.
pub fn build_regions(
    collection: &FeatureCollection,
    projector: &MercatorProjector,
    style: &MapStyle,
    mode: PerformanceMode,
    scene: &mut SceneGraph,
    registry: &mut ResourceRegistry,
) -> RegionLayer {
    let mut builder = LayerBuilder::new(scene, registry);
    let mut layer = RegionLayer::default();
    let shared = shared_resources(&mut builder, style, mode);

    for (feature_index, feature) in collection.features.iter().enumerate() {
        let (rings, skipped) = extrude_feature(feature, projector, style, mode);
        layer.skipped_rings += skipped;
        if rings.is_empty() {
            warn!(
                feature = feature_index,
                name = %feature.name,
                "region has no usable ring; skipped"
            );
            layer.skipped_features += 1;
            continue;
        }

        let fill = style.extrusion.fill_for(feature_index);
        let opacity = style.extrusion.fill_opacity;
        let fill_material = builder.material(Material::lambert(fill, opacity));

        let mut solids = Vec::with_capacity(rings.len() * 2);
        let mut borders = Vec::with_capacity(rings.len());
        let mut triangles = Vec::new();
        for (outline, extruded) in rings {
            let ExtrudedRing {
                top,
                sides,
                top_triangles,
            } = extruded;
            let top = builder.geometry(top);
            let sides = builder.geometry(sides);
            solids.push(builder.mesh_node(Transform::identity(), top, fill_material));
            solids.push(builder.mesh_node(Transform::identity(), sides, shared.side));
            borders.push(border_node(&mut builder, &outline, shared.border));
            triangles.extend(top_triangles);
        }

        let spot = match (&shared.spot, feature.centroid) {
            (Some(spot_shared), Some(centroid)) => project_local(projector, centroid)
                .map(|c| region_spot(&mut builder, spot_shared, c)),
            _ => None,
        };

        let key = builder.scene.add_entity(MapEntity::Region(RegionMesh {
            name: feature.name.clone(),
            centroid: feature.centroid,
            feature_index,
            solids: solids.clone(),
            borders: borders.clone(),
            spot,
            fill_material,
            original_color: fill,
            original_opacity: opacity,
        }));
        for node in solids.iter().chain(borders.iter()) {
            builder.scene.set_owner(*node, key);
        }
        if let Some(spot) = spot {
            builder.scene.set_owner(spot.disc, key);
            builder.scene.set_owner(spot.ring, key);
            layer.pulse_rings.push(PulseRing {
                node: spot.ring,
                material: spot.ring_material,
                kind: PulseKind::Region,
            });
        }
        layer.pick_targets.push(PickTarget {
            entity: key,
            priority: PickPriority::Region,
            shape: PickShape::Triangles(triangles),
        });
        layer.regions.push(key);
    }

    layer.bundle = builder.finish();
    debug!(
        regions = layer.regions.len(),
        skipped_rings = layer.skipped_rings,
        skipped_features = layer.skipped_features,
        resources = layer.bundle.len(),
        "built region layer"
    );
    layer
}

fn shared_resources(
    builder: &mut LayerBuilder<'_>,
    style: &MapStyle,
    mode: PerformanceMode,
) -> Shared {
    let ex = &style.extrusion;
    let side = if mode.gradient_sides() {
        Material::vertex_colored(ex.fill_opacity)
    } else {
        Material::lambert(ex.side_top, ex.fill_opacity)
    };
    let side = builder.material(side);
    let border = builder.material(Material::basic(ex.border, 1.0));
    let spot = style.region_spots.as_ref().map(|s| {
        let segments = mode.marker_segments();
        SpotShared {
            disc: builder.geometry(disc(s.disc_radius, segments)),
            ring: builder.geometry(ring(s.ring_inner, s.ring_outer, segments)),
            disc_material: builder.material(Material::basic(s.disc, 1.0)),
            ring_color: s.ring,
        }
    });
    Shared { side, border, spot }
}

type RingBuild = (Vec<Vec2>, ExtrudedRing);

fn extrude_feature(
    feature: &GeoFeature,
    projector: &MercatorProjector,
    style: &MapStyle,
    mode: PerformanceMode,
) -> (Vec<RingBuild>, usize) {
    let shade = |z: f64| style.extrusion.side_at(z);
    let side_colors: Option<&dyn Fn(f64) -> Color> = if mode.gradient_sides() {
        Some(&shade)
    } else {
        None
    };

    let mut out = Vec::with_capacity(feature.rings.len());
    let mut skipped = 0;
    for ring in &feature.rings {
        let mut planar: Vec<Vec2> = ring.iter().map(|ll| Vec2::new(ll.lon_deg, ll.lat_deg)).collect();
        drop_closing_duplicate(&mut planar);
        if is_degenerate_ring(&planar) {
            skipped += 1;
            continue;
        }
        let mut points: Vec<Vec2> = ring
            .iter()
            .filter_map(|ll| project_local(projector, *ll))
            .collect();
        drop_closing_duplicate(&mut points);
        match extrude_ring(&points, REGION_DEPTH, mode.curve_segments(), side_colors) {
            Some(extruded) => out.push((points, extruded)),
            None => skipped += 1,
        }
    }
    (out, skipped)
}

fn border_node(builder: &mut LayerBuilder<'_>, outline: &[Vec2], material: MaterialId) -> NodeId {
    let mut positions: Vec<[f32; 3]> = outline
        .iter()
        .map(|p| [p.x as f32, p.y as f32, BORDER_Z as f32])
        .collect();
    if let Some(first) = positions.first().copied() {
        positions.push(first);
    }
    let geometry = builder.geometry(GeometryBuffer::line_strip(positions));
    builder.mesh_node(Transform::identity(), geometry, material)
}

fn region_spot(builder: &mut LayerBuilder<'_>, shared: &SpotShared, center: Vec2) -> RegionSpot {
    let at = Transform::translate(Vec3::new(center.x, center.y, SPOT_Z));
    let ring_material =
        builder.material(Material::basic(shared.ring_color, 1.0).without_depth_write());
    RegionSpot {
        disc: builder.mesh_node(at, shared.disc, shared.disc_material),
        ring: builder.mesh_node(at, shared.ring, ring_material),
        ring_material,
    }
}
