pub mod affine;
pub mod curve;
pub mod precision;
pub mod projection;
pub mod vec;

pub use affine::*;
pub use curve::*;
pub use precision::*;
pub use projection::*;
pub use vec::*;
