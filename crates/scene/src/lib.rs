pub mod camera;
pub mod components;
pub mod entity;
pub mod map_entity;
pub mod picking;
pub mod resources;
pub mod spatial;
pub mod world;

pub use camera::*;
pub use entity::*;
pub use map_entity::*;
pub use picking::*;
pub use resources::*;
pub use world::*;
