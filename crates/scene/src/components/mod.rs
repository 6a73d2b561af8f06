pub mod bounds;
pub mod label;
pub mod mesh;
pub mod transform;
pub mod visibility;

pub use bounds::*;
pub use label::*;
pub use mesh::*;
pub use transform::*;
pub use visibility::*;
