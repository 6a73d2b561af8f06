pub mod arena;
pub mod bounds;
pub mod color;
pub mod handles;
pub mod math;
pub mod time;

// Foundation crate: small, well-tested primitives only.
pub use arena::*;
pub use bounds::*;
pub use color::*;
pub use handles::*;
pub use time::*;
