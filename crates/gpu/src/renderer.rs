use foundation::color::Color;
use foundation::math::{Affine3, Vec3};
use scene::camera::PerspectiveCamera;
use scene::components::Transform;
use scene::entity::NodeId;
use scene::resources::{GeometryId, MaterialId, ResourceRegistry};
use scene::world::SceneGraph;

/// Point light that follows a target in world space.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FollowLight {
    pub position: Vec3,
    pub target: Vec3,
    pub intensity: f64,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct AmbientLight {
    pub color: Color,
    pub intensity: f64,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RenderCommand {
    pub node: NodeId,
    /// Node-local to world.
    pub model: Affine3,
    pub geometry: GeometryId,
    pub material: MaterialId,
    pub transparent: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderFrame {
    pub camera: PerspectiveCamera,
    pub light: Option<FollowLight>,
    pub ambient: Option<AmbientLight>,
    pub commands: Vec<RenderCommand>,
}

impl RenderFrame {
    pub fn with_ambient(mut self, ambient: AmbientLight) -> Self {
        self.ambient = Some(ambient);
        self
    }

    pub fn draw_calls(&self) -> usize {
        self.commands.len()
    }
}

pub struct Renderer;

impl Renderer {
    /// Draw commands for every visible mesh whose resources are still alive.
    ///
    /// Ordering contract: opaque commands first, then transparent ones; node
    /// order within each group.
    pub fn collect(
        scene: &SceneGraph,
        registry: &ResourceRegistry,
        camera: PerspectiveCamera,
        light: Option<FollowLight>,
    ) -> RenderFrame {
        let root = scene.root();
        let mut commands: Vec<RenderCommand> = scene
            .draw_list()
            .into_iter()
            .filter_map(|(node, transform, mesh)| {
                registry.geometry(mesh.geometry)?;
                let material = registry.material(mesh.material)?;
                Some(RenderCommand {
                    node,
                    model: root.then(&node_affine(transform)),
                    geometry: mesh.geometry,
                    material: mesh.material,
                    transparent: material.transparent,
                })
            })
            .collect();
        commands.sort_by_key(|c| c.transparent);
        RenderFrame {
            camera,
            light,
            ambient: None,
            commands,
        }
    }
}

fn node_affine(t: Transform) -> Affine3 {
    Affine3::from_scale_translation(t.scale, t.position)
}
