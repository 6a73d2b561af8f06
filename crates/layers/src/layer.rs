use foundation::math::{LonLat, MercatorProjector, Vec2};
use scene::components::{ComponentBounds, MeshComponent, Transform, Visibility};
use scene::entity::NodeId;
use scene::resources::{
    GeometryBuffer, GeometryId, Material, MaterialId, ResourceBundle, ResourceRegistry, Texture,
    TextureId,
};
use scene::world::SceneGraph;

/// Projects into map-local space, where north is `+y`.
pub fn project_local(projector: &MercatorProjector, lon_lat: LonLat) -> Option<Vec2> {
    projector.project(lon_lat).map(|p| Vec2::new(p.x, -p.y))
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LayerId {
    Regions,
    Overlays,
    Flights,
}

/// A built layer owns the GPU resources it created.
pub trait Layer {
    fn id(&self) -> LayerId;

    fn bundle(&self) -> &ResourceBundle;

    /// Hands the resources over for disposal, leaving the layer empty.
    fn take_bundle(&mut self) -> ResourceBundle;
}

/// Scene and registry access shared by the layer builders. Every resource
/// created through it is recorded in the builder's bundle.
pub(crate) struct LayerBuilder<'a> {
    pub scene: &'a mut SceneGraph,
    pub registry: &'a mut ResourceRegistry,
    bundle: ResourceBundle,
}

impl<'a> LayerBuilder<'a> {
    pub fn new(scene: &'a mut SceneGraph, registry: &'a mut ResourceRegistry) -> Self {
        Self {
            scene,
            registry,
            bundle: ResourceBundle::new(),
        }
    }

    pub fn geometry(&mut self, geometry: GeometryBuffer) -> GeometryId {
        self.bundle
            .push_geometry(self.registry.create_geometry(geometry))
    }

    pub fn material(&mut self, material: Material) -> MaterialId {
        self.bundle
            .push_material(self.registry.create_material(material))
    }

    pub fn texture(&mut self, texture: Texture) -> TextureId {
        self.bundle.push_texture(self.registry.create_texture(texture))
    }

    pub fn mesh_node(
        &mut self,
        transform: Transform,
        geometry: GeometryId,
        material: MaterialId,
    ) -> NodeId {
        let node = self.scene.spawn();
        self.scene.set_transform(node, transform);
        self.scene
            .set_mesh(node, MeshComponent::new(geometry, material));
        if let Some(b) = self
            .registry
            .geometry(geometry)
            .and_then(|g| ComponentBounds::from_points(&g.positions))
        {
            self.scene.set_bounds(node, b);
        }
        node
    }

    /// Mesh node that is pickable but never drawn.
    pub fn hidden_mesh_node(
        &mut self,
        transform: Transform,
        geometry: GeometryId,
        material: MaterialId,
    ) -> NodeId {
        let node = self.mesh_node(transform, geometry, material);
        self.scene.set_visibility(node, Visibility::hidden());
        node
    }

    pub fn finish(self) -> ResourceBundle {
        self.bundle
    }
}
