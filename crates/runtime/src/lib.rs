pub mod frame;
pub mod governor;
pub mod metrics;
pub mod scheduler;
pub mod throttle;
pub mod timer;

pub use frame::*;
pub use governor::*;
pub use metrics::*;
pub use scheduler::*;
pub use throttle::*;
pub use timer::*;
