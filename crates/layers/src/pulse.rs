use scene::entity::NodeId;
use scene::resources::MaterialId;

/// Which sawtooth a ring follows.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PulseKind {
    Region,
    City,
}

/// A ring whose scale and opacity are driven by the animation tick.
///
/// Each ring owns its material so opacity changes stay local to it.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PulseRing {
    pub node: NodeId,
    pub material: MaterialId,
    pub kind: PulseKind,
}
