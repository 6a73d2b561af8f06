pub mod flight;
pub mod geometry;
pub mod labels;
pub mod layer;
pub mod overlay;
pub mod pulse;
pub mod region;
pub mod symbology;

pub use flight::*;
pub use labels::*;
pub use layer::{project_local, Layer, LayerId};
pub use overlay::*;
pub use pulse::*;
pub use region::*;
pub use symbology::*;
