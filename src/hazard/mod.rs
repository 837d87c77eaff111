pub mod recorder;

pub use recorder::{HazardEventRecorder, HazardPhase, ToggleOutcome};
