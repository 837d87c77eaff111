use anyhow::Result;
use async_trait::async_trait;

use crate::models::RawGaze;

/// Callback invoked by the capability for every prediction. `None` means
/// the model produced no estimate for that frame.
pub type GazeListener = Box<dyn FnMut(Option<RawGaze>) + Send + 'static>;

/// Regression used to map eye features onto screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Regression {
    Ridge,
    WeightedRidge,
    ThreadedRidge,
}

impl Regression {
    pub fn as_str(&self) -> &'static str {
        match self {
            Regression::Ridge => "ridge",
            Regression::WeightedRidge => "weightedRidge",
            Regression::ThreadedRidge => "threadedRidge",
        }
    }
}

/// The opaque gaze-prediction engine. Only one capture may be active per
/// process; [`crate::gaze::GazeModelLifecycle`] is the sole caller.
#[async_trait]
pub trait GazeCapability: Send + Sync {
    /// Whether the engine is present in this execution environment.
    fn is_loaded(&self) -> bool;

    fn configure_regression(&mut self, regression: Regression);

    fn set_listener(&mut self, listener: GazeListener);

    fn show_preview(&mut self, visible: bool);

    /// Opens the camera and starts predicting.
    async fn begin(&mut self) -> Result<()>;

    fn end(&mut self);
}
