use crate::resources::{GeometryId, MaterialId};

/// A drawable: one geometry buffer rendered with one material.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MeshComponent {
    pub geometry: GeometryId,
    pub material: MaterialId,
}

impl MeshComponent {
    pub fn new(geometry: GeometryId, material: MaterialId) -> Self {
        Self { geometry, material }
    }
}
