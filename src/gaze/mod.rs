pub mod capability;
pub mod lifecycle;
pub mod replay;
pub mod throttle;

pub use capability::{GazeCapability, GazeListener, Regression};
pub use lifecycle::GazeModelLifecycle;
pub use replay::{ReplayCapability, ReplayHandle};
pub use throttle::{GazeSampleThrottle, LOGGING_INTERVAL_MS};
