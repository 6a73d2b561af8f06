use foundation::bounds::Aabb3;
use foundation::handles::Handle;
use foundation::math::{Affine3, Vec3};

use crate::components::{ComponentBounds, LabelComponent, MeshComponent, Transform, Visibility};
use crate::entity::{EntityKey, NodeId};
use crate::map_entity::MapEntity;

/// Flat scene graph: every node sits directly under one map root.
///
/// Components are stored in parallel vectors indexed by node. `clear` starts
/// a new epoch, so node ids from a previous scene never resolve again.
#[derive(Debug)]
pub struct SceneGraph {
    epoch: u32,
    next_index: u32,
    transforms: Vec<Option<Transform>>,
    meshes: Vec<Option<MeshComponent>>,
    labels: Vec<Option<LabelComponent>>,
    visibility: Vec<Option<Visibility>>,
    bounds: Vec<Option<ComponentBounds>>,
    owners: Vec<Option<EntityKey>>,
    entities: Vec<MapEntity>,
    root: Affine3,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self {
            epoch: 0,
            next_index: 0,
            transforms: Vec::new(),
            meshes: Vec::new(),
            labels: Vec::new(),
            visibility: Vec::new(),
            bounds: Vec::new(),
            owners: Vec::new(),
            entities: Vec::new(),
            root: Affine3::IDENTITY,
        }
    }
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self) -> NodeId {
        let id = NodeId(Handle::new(self.next_index, self.epoch));
        self.next_index += 1;
        self.ensure_capacity(id.index() as usize);
        self.transforms[id.index() as usize] = Some(Transform::identity());
        id
    }

    /// Spawns a mesh node with bounds taken from `positions`.
    pub fn spawn_mesh(
        &mut self,
        transform: Transform,
        mesh: MeshComponent,
        positions: &[[f32; 3]],
    ) -> NodeId {
        let node = self.spawn();
        self.set_transform(node, transform);
        self.set_mesh(node, mesh);
        if let Some(b) = ComponentBounds::from_points(positions) {
            self.set_bounds(node, b);
        }
        node
    }

    pub fn node_count(&self) -> usize {
        self.next_index as usize
    }

    pub fn contains(&self, node: NodeId) -> bool {
        node.0.generation() == self.epoch && node.index() < self.next_index
    }

    pub fn set_transform(&mut self, node: NodeId, transform: Transform) {
        if let Some(slot) = self.slot(node) {
            self.transforms[slot] = Some(transform);
        }
    }

    pub fn transform(&self, node: NodeId) -> Option<Transform> {
        self.slot(node).and_then(|i| self.transforms[i])
    }

    pub fn transform_mut(&mut self, node: NodeId) -> Option<&mut Transform> {
        let i = self.slot(node)?;
        self.transforms[i].as_mut()
    }

    pub fn set_mesh(&mut self, node: NodeId, mesh: MeshComponent) {
        if let Some(slot) = self.slot(node) {
            self.meshes[slot] = Some(mesh);
        }
    }

    pub fn mesh(&self, node: NodeId) -> Option<MeshComponent> {
        self.slot(node).and_then(|i| self.meshes[i])
    }

    pub fn set_label(&mut self, node: NodeId, label: LabelComponent) {
        if let Some(slot) = self.slot(node) {
            self.labels[slot] = Some(label);
        }
    }

    pub fn label(&self, node: NodeId) -> Option<&LabelComponent> {
        self.slot(node).and_then(|i| self.labels[i].as_ref())
    }

    pub fn set_visibility(&mut self, node: NodeId, visibility: Visibility) {
        if let Some(slot) = self.slot(node) {
            self.visibility[slot] = Some(visibility);
        }
    }

    pub fn is_visible(&self, node: NodeId) -> bool {
        self.slot(node)
            .and_then(|i| self.visibility[i])
            .map(|v| v.visible)
            .unwrap_or(true)
    }

    pub fn set_bounds(&mut self, node: NodeId, bounds: ComponentBounds) {
        if let Some(slot) = self.slot(node) {
            self.bounds[slot] = Some(bounds);
        }
    }

    pub fn bounds(&self, node: NodeId) -> Option<ComponentBounds> {
        self.slot(node).and_then(|i| self.bounds[i])
    }

    pub fn set_owner(&mut self, node: NodeId, owner: EntityKey) {
        if let Some(slot) = self.slot(node) {
            self.owners[slot] = Some(owner);
        }
    }

    pub fn owner(&self, node: NodeId) -> Option<EntityKey> {
        self.slot(node).and_then(|i| self.owners[i])
    }

    pub fn add_entity(&mut self, entity: MapEntity) -> EntityKey {
        let key = EntityKey(self.entities.len() as u32);
        self.entities.push(entity);
        key
    }

    pub fn entity(&self, key: EntityKey) -> Option<&MapEntity> {
        self.entities.get(key.index())
    }

    pub fn entity_mut(&mut self, key: EntityKey) -> Option<&mut MapEntity> {
        self.entities.get_mut(key.index())
    }

    /// Entities in insertion order.
    pub fn entities(&self) -> impl Iterator<Item = (EntityKey, &MapEntity)> + '_ {
        self.entities
            .iter()
            .enumerate()
            .map(|(i, e)| (EntityKey(i as u32), e))
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn root(&self) -> Affine3 {
        self.root
    }

    pub fn set_root(&mut self, root: Affine3) {
        self.root = root;
    }

    /// Map-local to world space.
    pub fn local_to_world(&self, local: Vec3) -> Vec3 {
        self.root.transform_point(local)
    }

    /// Visible mesh nodes in node order.
    pub fn draw_list(&self) -> Vec<(NodeId, Transform, MeshComponent)> {
        let mut out = Vec::new();
        for (idx, mesh) in self.meshes.iter().enumerate() {
            let Some(mesh) = mesh else { continue };
            let Some(transform) = self.transforms[idx] else {
                continue;
            };
            let visible = self.visibility[idx].map(|v| v.visible).unwrap_or(true);
            if !visible {
                continue;
            }
            out.push((NodeId(Handle::new(idx as u32, self.epoch)), transform, *mesh));
        }
        out
    }

    pub fn label_nodes(&self) -> Vec<(NodeId, Transform, &LabelComponent)> {
        let mut out = Vec::new();
        for (idx, label) in self.labels.iter().enumerate() {
            let Some(label) = label else { continue };
            let Some(transform) = self.transforms[idx] else {
                continue;
            };
            out.push((NodeId(Handle::new(idx as u32, self.epoch)), transform, label));
        }
        out
    }

    /// Map-local bounds of every node with geometry bounds.
    pub fn local_bounds(&self) -> Aabb3 {
        let mut out = Aabb3::empty();
        for (idx, b) in self.bounds.iter().enumerate() {
            let (Some(b), Some(t)) = (b, self.transforms[idx]) else {
                continue;
            };
            let lo = t.apply(b.min);
            let hi = t.apply(b.max);
            out.include([lo.x, lo.y, lo.z]);
            out.include([hi.x, hi.y, hi.z]);
        }
        out
    }

    /// Drops every node and entity and resets the root.
    pub fn clear(&mut self) {
        self.epoch = self.epoch.wrapping_add(1);
        self.next_index = 0;
        self.transforms.clear();
        self.meshes.clear();
        self.labels.clear();
        self.visibility.clear();
        self.bounds.clear();
        self.owners.clear();
        self.entities.clear();
        self.root = Affine3::IDENTITY;
    }

    fn slot(&self, node: NodeId) -> Option<usize> {
        self.contains(node).then_some(node.index() as usize)
    }

    fn ensure_capacity(&mut self, idx: usize) {
        if self.transforms.len() <= idx {
            let new_len = idx + 1;
            self.transforms.resize(new_len, None);
            self.meshes.resize(new_len, None);
            self.labels.resize(new_len, None);
            self.visibility.resize(new_len, None);
            self.bounds.resize(new_len, None);
            self.owners.resize(new_len, None);
        }
    }
}
