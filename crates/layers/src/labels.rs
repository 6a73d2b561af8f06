use foundation::math::{Affine3, Vec2, Vec3};
use scene::camera::{PerspectiveCamera, Viewport};
use scene::components::LabelComponent;
use scene::entity::{EntityKey, NodeId};
use scene::world::SceneGraph;

/// Maps a world-space point to screen pixels (y down).
pub trait LabelProjector {
    fn project(&self, world: Vec3) -> Option<Vec2>;
}

/// Projects map-local anchors through the map root and a camera.
#[derive(Debug, Copy, Clone)]
pub struct CameraLabelProjector<'a> {
    pub camera: &'a PerspectiveCamera,
    pub root: Affine3,
    pub viewport: Viewport,
}

impl<'a> CameraLabelProjector<'a> {
    pub fn new(camera: &'a PerspectiveCamera, root: Affine3, viewport: Viewport) -> Self {
        Self {
            camera,
            root,
            viewport,
        }
    }
}

impl LabelProjector for CameraLabelProjector<'_> {
    fn project(&self, local: Vec3) -> Option<Vec2> {
        self.camera
            .project_to_screen(self.root.transform_point(local), self.viewport)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabelAnchor {
    pub node: NodeId,
    pub entity: EntityKey,
    pub text: String,
    /// Map-local anchor.
    pub position: Vec3,
    pub font_px: f64,
    pub offset_y_px: f64,
}

/// Screen rectangle of one label, centered on `center_px`.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLabel {
    pub entity: EntityKey,
    pub text: String,
    pub center_px: Vec2,
    pub size_px: Vec2,
}

impl PlacedLabel {
    pub fn contains(&self, px: Vec2) -> bool {
        (px.x - self.center_px.x).abs() <= self.size_px.x * 0.5
            && (px.y - self.center_px.y).abs() <= self.size_px.y * 0.5
    }
}

/// Label nodes and the entity each one resolves to, collected once per
/// scene.
///
/// Ordering contract: anchors are in node order. When several placed labels
/// contain a point, the one whose center is nearest wins; exact ties go to
/// the lower `EntityKey`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelIndex {
    anchors: Vec<LabelAnchor>,
}

impl LabelIndex {
    /// Labels without an owning entity are left out.
    pub fn from_scene(scene: &SceneGraph) -> Self {
        let anchors = scene
            .label_nodes()
            .into_iter()
            .filter_map(|(node, transform, label)| {
                let entity = scene.owner(node)?;
                Some(anchor(node, entity, transform.position, label))
            })
            .collect();
        Self { anchors }
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    pub fn anchors(&self) -> &[LabelAnchor] {
        &self.anchors
    }

    pub fn layout<P: LabelProjector + ?Sized>(&self, projector: &P) -> Vec<PlacedLabel> {
        self.anchors
            .iter()
            .filter_map(|a| {
                let screen = projector.project(a.position)?;
                if !screen.is_finite() {
                    return None;
                }
                Some(PlacedLabel {
                    entity: a.entity,
                    text: a.text.clone(),
                    center_px: Vec2::new(screen.x, screen.y - a.offset_y_px),
                    size_px: estimate_text_size(&a.text, a.font_px),
                })
            })
            .collect()
    }

    /// Entity whose label box contains `px`, if any.
    pub fn hit<P: LabelProjector + ?Sized>(&self, px: Vec2, projector: &P) -> Option<EntityKey> {
        self.layout(projector)
            .into_iter()
            .filter(|l| l.contains(px))
            .min_by(|a, b| {
                let da = a.center_px.distance(px);
                let db = b.center_px.distance(px);
                da.total_cmp(&db).then_with(|| a.entity.cmp(&b.entity))
            })
            .map(|l| l.entity)
    }
}

fn anchor(node: NodeId, entity: EntityKey, position: Vec3, label: &LabelComponent) -> LabelAnchor {
    LabelAnchor {
        node,
        entity,
        text: label.text.clone(),
        position,
        font_px: label.font_px,
        offset_y_px: label.offset_y_px,
    }
}

fn estimate_text_size(text: &str, font_px: f64) -> Vec2 {
    let count = text.chars().count().max(1) as f64;
    Vec2::new(font_px * 0.6 * count, font_px * 1.2)
}

#[cfg(test)]
mod tests {
    use super::{LabelIndex, LabelProjector};
    use foundation::color::Color;
    use foundation::math::{Vec2, Vec3};
    use pretty_assertions::assert_eq;
    use scene::components::{LabelComponent, Transform};
    use scene::entity::EntityKey;
    use scene::world::SceneGraph;

    /// Local units are pixels; y is flipped.
    struct FlatProjector;

    impl LabelProjector for FlatProjector {
        fn project(&self, world: Vec3) -> Option<Vec2> {
            Some(Vec2::new(world.x, -world.y))
        }
    }

    fn label(scene: &mut SceneGraph, text: &str, at: Vec3, owner: Option<EntityKey>) {
        let node = scene.spawn();
        scene.set_transform(node, Transform::translate(at));
        scene.set_label(
            node,
            LabelComponent {
                text: text.into(),
                font_px: 10.0,
                color: Color::WHITE,
                offset_y_px: 16.0,
            },
        );
        if let Some(owner) = owner {
            scene.set_owner(node, owner);
        }
    }

    #[test]
    fn hit_accounts_for_the_lift() {
        let mut scene = SceneGraph::new();
        label(&mut scene, "Fuzhou", Vec3::new(100.0, -100.0, 8.0), Some(EntityKey(4)));
        let index = LabelIndex::from_scene(&scene);
        assert_eq!(index.len(), 1);

        // Box is 36x12 centered at (100, 84).
        assert_eq!(index.hit(Vec2::new(100.0, 84.0), &FlatProjector), Some(EntityKey(4)));
        assert_eq!(index.hit(Vec2::new(117.0, 89.0), &FlatProjector), Some(EntityKey(4)));
        assert_eq!(index.hit(Vec2::new(100.0, 100.0), &FlatProjector), None);
    }

    #[test]
    fn nearest_center_wins_between_overlapping_labels() {
        let mut scene = SceneGraph::new();
        label(&mut scene, "Alpha", Vec3::new(100.0, -100.0, 8.0), Some(EntityKey(1)));
        label(&mut scene, "Beta", Vec3::new(110.0, -100.0, 8.0), Some(EntityKey(2)));
        let index = LabelIndex::from_scene(&scene);
        assert_eq!(index.hit(Vec2::new(108.0, 84.0), &FlatProjector), Some(EntityKey(2)));
        assert_eq!(index.hit(Vec2::new(101.0, 84.0), &FlatProjector), Some(EntityKey(1)));
    }

    #[test]
    fn unowned_labels_are_ignored() {
        let mut scene = SceneGraph::new();
        label(&mut scene, "Orphan", Vec3::new(0.0, 0.0, 8.0), None);
        assert!(LabelIndex::from_scene(&scene).is_empty());
    }
}
