use serde::{Deserialize, Serialize};

use crate::clock::Millis;

/// One prediction as emitted by the gaze capability, before throttling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawGaze {
    pub x: f64,
    pub y: f64,
}

/// Accepted on-screen fixation estimate. Immutable once recorded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GazeSample {
    pub x: f64,
    pub y: f64,
    pub time: Millis,
}

impl GazeSample {
    pub fn stamped(raw: RawGaze, time: Millis) -> Self {
        Self {
            x: raw.x,
            y: raw.y,
            time,
        }
    }
}

/// Viewport size in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowDimensions {
    pub width: u32,
    pub height: u32,
}

impl WindowDimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}
