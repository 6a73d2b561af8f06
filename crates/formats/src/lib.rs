pub mod display_config;
pub mod geojson;

pub use display_config::*;
pub use geojson::*;
