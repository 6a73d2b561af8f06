use foundation::handles::Handle;

/// A node in the scene graph (one drawable: mesh, line, or label anchor).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub Handle);

impl NodeId {
    pub fn index(&self) -> u32 {
        self.0.index()
    }
}

/// A logical map entity (region, city, capital, flight), which may own
/// several nodes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityKey(pub u32);

impl EntityKey {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}
