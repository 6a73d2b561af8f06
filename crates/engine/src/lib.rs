pub mod animation;
pub mod build;
pub mod cache;
pub mod config;
pub mod controls;
pub mod diagnostics;
pub mod host;
pub mod hover;
pub mod lifecycle;
pub mod platform;
pub mod tooltip;

pub use animation::{AnimationScheduler, IntroTween, SceneBindings, TickReport};
pub use build::{build_scene, BuildCounts, BuiltScene, SceneInputs};
pub use cache::{CacheStats, DatasetCache, DatasetKey};
pub use config::{ConfigError, EngineConfig};
pub use controls::MapControls;
pub use diagnostics::DiagnosticsSnapshot;
pub use host::MapHost;
pub use hover::{HoverState, PickResult, PickingEngine, SampleOutcome};
pub use lifecycle::{LifecycleError, LifecycleState, MapInstance};
pub use platform::{HeadlessPlatform, ListenerId, ListenerKind, ListenerScope, Platform};
pub use tooltip::{Cursor, TooltipState};
