//! GPU-resident resource bookkeeping.
//!
//! Every geometry buffer, material and texture lives in a generational arena.
//! Builders record what they allocate in a [`ResourceBundle`]; teardown frees
//! bundles, never by walking the scene graph.

use std::collections::BTreeSet;
use std::fmt;

use foundation::arena::Arena;
use foundation::color::Color;
use foundation::handles::Handle;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GeometryId(pub Handle);

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MaterialId(pub Handle);

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TextureId(pub Handle);

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Topology {
    Triangles,
    LineStrip,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeometryBuffer {
    pub topology: Topology,
    pub positions: Vec<[f32; 3]>,
    /// Per-vertex colors; empty when the material color applies.
    pub colors: Vec<[f32; 3]>,
    /// Triangle indices; empty for non-indexed line strips.
    pub indices: Vec<u32>,
}

impl GeometryBuffer {
    pub fn triangles(positions: Vec<[f32; 3]>, indices: Vec<u32>) -> Self {
        Self {
            topology: Topology::Triangles,
            positions,
            colors: Vec::new(),
            indices,
        }
    }

    pub fn line_strip(positions: Vec<[f32; 3]>) -> Self {
        Self {
            topology: Topology::LineStrip,
            positions,
            colors: Vec::new(),
            indices: Vec::new(),
        }
    }

    pub fn with_colors(mut self, colors: Vec<[f32; 3]>) -> Self {
        self.colors = colors;
        self
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        match self.topology {
            Topology::Triangles => self.indices.len() / 3,
            Topology::LineStrip => 0,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Shading {
    /// Unlit flat color.
    Basic,
    /// Diffuse-lit color.
    Lambert,
    /// Color taken from vertex colors.
    VertexColor,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub shading: Shading,
    pub color: Color,
    pub opacity: f32,
    pub transparent: bool,
    pub depth_write: bool,
    pub texture: Option<TextureId>,
}

impl Material {
    pub fn basic(color: Color, opacity: f32) -> Self {
        Self {
            shading: Shading::Basic,
            color,
            opacity,
            transparent: opacity < 1.0,
            depth_write: true,
            texture: None,
        }
    }

    pub fn lambert(color: Color, opacity: f32) -> Self {
        Self {
            shading: Shading::Lambert,
            ..Self::basic(color, opacity)
        }
    }

    pub fn vertex_colored(opacity: f32) -> Self {
        Self {
            shading: Shading::VertexColor,
            ..Self::basic(Color::WHITE, opacity)
        }
    }

    pub fn without_depth_write(mut self) -> Self {
        self.depth_write = false;
        self.transparent = true;
        self
    }

    pub fn with_texture(mut self, texture: TextureId) -> Self {
        self.texture = Some(texture);
        self
    }
}

/// RGBA8 pixel data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Texture {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct ResourceCounts {
    pub geometries: usize,
    pub materials: usize,
    pub textures: usize,
}

impl ResourceCounts {
    pub fn is_zero(&self) -> bool {
        self.geometries == 0 && self.materials == 0 && self.textures == 0
    }

    pub fn total(&self) -> usize {
        self.geometries + self.materials + self.textures
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DisposeError {
    UnknownGeometry(GeometryId),
    UnknownMaterial(MaterialId),
    UnknownTexture(TextureId),
}

impl fmt::Display for DisposeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisposeError::UnknownGeometry(id) => write!(f, "geometry {:?} is not live", id.0),
            DisposeError::UnknownMaterial(id) => write!(f, "material {:?} is not live", id.0),
            DisposeError::UnknownTexture(id) => write!(f, "texture {:?} is not live", id.0),
        }
    }
}

impl std::error::Error for DisposeError {}

#[derive(Debug, Default)]
pub struct ResourceRegistry {
    geometries: Arena<GeometryBuffer>,
    materials: Arena<Material>,
    textures: Arena<Texture>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_geometry(&mut self, geometry: GeometryBuffer) -> GeometryId {
        GeometryId(self.geometries.insert(geometry))
    }

    pub fn create_material(&mut self, material: Material) -> MaterialId {
        MaterialId(self.materials.insert(material))
    }

    pub fn create_texture(&mut self, texture: Texture) -> TextureId {
        TextureId(self.textures.insert(texture))
    }

    pub fn geometry(&self, id: GeometryId) -> Option<&GeometryBuffer> {
        self.geometries.get(id.0)
    }

    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id.0)
    }

    pub fn material_mut(&mut self, id: MaterialId) -> Option<&mut Material> {
        self.materials.get_mut(id.0)
    }

    pub fn texture(&self, id: TextureId) -> Option<&Texture> {
        self.textures.get(id.0)
    }

    pub fn dispose_geometry(&mut self, id: GeometryId) -> Result<(), DisposeError> {
        self.geometries
            .remove(id.0)
            .map(|_| ())
            .ok_or(DisposeError::UnknownGeometry(id))
    }

    /// Frees the material only; textures are owned by the bundle that
    /// created them and may be shared between materials.
    pub fn dispose_material(&mut self, id: MaterialId) -> Result<(), DisposeError> {
        self.materials
            .remove(id.0)
            .map(|_| ())
            .ok_or(DisposeError::UnknownMaterial(id))
    }

    pub fn dispose_texture(&mut self, id: TextureId) -> Result<(), DisposeError> {
        self.textures
            .remove(id.0)
            .map(|_| ())
            .ok_or(DisposeError::UnknownTexture(id))
    }

    pub fn counts(&self) -> ResourceCounts {
        ResourceCounts {
            geometries: self.geometries.len(),
            materials: self.materials.len(),
            textures: self.textures.len(),
        }
    }
}

/// Outcome of freeing one bundle.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DisposeReport {
    pub freed: ResourceCounts,
    pub errors: Vec<DisposeError>,
}

/// Handles allocated by one builder, in allocation order, without duplicates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceBundle {
    geometries: Vec<GeometryId>,
    materials: Vec<MaterialId>,
    textures: Vec<TextureId>,
    seen: BTreeSet<(ResourceKind, Handle)>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum ResourceKind {
    Geometry,
    Material,
    Texture,
}

impl ResourceBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_geometry(&mut self, id: GeometryId) -> GeometryId {
        if self.seen.insert((ResourceKind::Geometry, id.0)) {
            self.geometries.push(id);
        }
        id
    }

    pub fn push_material(&mut self, id: MaterialId) -> MaterialId {
        if self.seen.insert((ResourceKind::Material, id.0)) {
            self.materials.push(id);
        }
        id
    }

    pub fn push_texture(&mut self, id: TextureId) -> TextureId {
        if self.seen.insert((ResourceKind::Texture, id.0)) {
            self.textures.push(id);
        }
        id
    }

    /// Moves every handle of `other` into `self`.
    pub fn absorb(&mut self, mut other: ResourceBundle) {
        for id in other.geometries.drain(..) {
            self.push_geometry(id);
        }
        for id in other.materials.drain(..) {
            self.push_material(id);
        }
        for id in other.textures.drain(..) {
            self.push_texture(id);
        }
    }

    pub fn len(&self) -> usize {
        self.geometries.len() + self.materials.len() + self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn counts(&self) -> ResourceCounts {
        ResourceCounts {
            geometries: self.geometries.len(),
            materials: self.materials.len(),
            textures: self.textures.len(),
        }
    }

    /// Frees geometries, then materials, then textures. A failed release is
    /// recorded and the remaining handles are still freed. Leaves the bundle
    /// empty.
    pub fn dispose_into(&mut self, registry: &mut ResourceRegistry) -> DisposeReport {
        let mut report = DisposeReport::default();
        for id in self.geometries.drain(..) {
            match registry.dispose_geometry(id) {
                Ok(()) => report.freed.geometries += 1,
                Err(e) => report.errors.push(e),
            }
        }
        for id in self.materials.drain(..) {
            match registry.dispose_material(id) {
                Ok(()) => report.freed.materials += 1,
                Err(e) => report.errors.push(e),
            }
        }
        for id in self.textures.drain(..) {
            match registry.dispose_texture(id) {
                Ok(()) => report.freed.textures += 1,
                Err(e) => report.errors.push(e),
            }
        }
        self.seen.clear();
        report
    }
}

#[cfg(test)]
mod tests {
    use super::{GeometryBuffer, Material, ResourceBundle, ResourceRegistry, Texture};
    use foundation::color::Color;

    fn tri() -> GeometryBuffer {
        GeometryBuffer::triangles(vec![[0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]], vec![0, 1, 2])
    }

    #[test]
    fn bundle_disposal_zeroes_registry() {
        let mut reg = ResourceRegistry::new();
        let mut bundle = ResourceBundle::new();
        let tex = bundle.push_texture(reg.create_texture(Texture {
            width: 1,
            height: 1,
            rgba: vec![255; 4],
        }));
        bundle.push_geometry(reg.create_geometry(tri()));
        bundle.push_material(reg.create_material(Material::basic(Color::WHITE, 1.0).with_texture(tex)));
        bundle.push_material(reg.create_material(Material::basic(Color::WHITE, 1.0).with_texture(tex)));
        assert_eq!(reg.counts().total(), 4);

        let report = bundle.dispose_into(&mut reg);
        assert!(report.errors.is_empty());
        assert_eq!(report.freed.materials, 2);
        assert!(reg.counts().is_zero());
        assert!(bundle.is_empty());
    }

    #[test]
    fn duplicate_handles_are_recorded_once() {
        let mut reg = ResourceRegistry::new();
        let mut bundle = ResourceBundle::new();
        let g = reg.create_geometry(tri());
        bundle.push_geometry(g);
        bundle.push_geometry(g);
        assert_eq!(bundle.len(), 1);
    }

    #[test]
    fn failed_release_does_not_stop_the_rest() {
        let mut reg = ResourceRegistry::new();
        let mut bundle = ResourceBundle::new();
        let stale = reg.create_geometry(tri());
        reg.dispose_geometry(stale).expect("first dispose");
        bundle.push_geometry(stale);
        bundle.push_geometry(reg.create_geometry(tri()));
        bundle.push_material(reg.create_material(Material::lambert(Color::BLACK, 0.9)));

        let report = bundle.dispose_into(&mut reg);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.freed.geometries, 1);
        assert_eq!(report.freed.materials, 1);
        assert!(reg.counts().is_zero());
    }

    #[test]
    fn material_mut_edits_in_place() {
        let mut reg = ResourceRegistry::new();
        let id = reg.create_material(Material::basic(Color::BLACK, 0.9));
        reg.material_mut(id).expect("live").color = Color::WHITE;
        assert_eq!(reg.material(id).map(|m| m.color), Some(Color::WHITE));
    }
}
