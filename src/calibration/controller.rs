use crate::error::CaptureResult;
use crate::gaze::GazeModelLifecycle;
use crate::models::WindowDimensions;

use super::state::{CalibrationState, ClickOutcome, ScreenPoint};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

/// A mounted calibration view.
///
/// Mounting starts the gaze capture; the capture is stopped when the
/// session is unmounted or dropped, whether or not calibration finished.
pub struct CalibrationSession<'a> {
    gaze: &'a mut GazeModelLifecycle,
    state: CalibrationState,
}

impl<'a> CalibrationSession<'a> {
    pub async fn mount(
        gaze: &'a mut GazeModelLifecycle,
        viewport: WindowDimensions,
        required_clicks: u32,
    ) -> CaptureResult<CalibrationSession<'a>> {
        gaze.set_calibrated(false);
        gaze.start().await?;

        log_info!(
            "calibration mounted at {}x{} ({} clicks per point)",
            viewport.width,
            viewport.height,
            required_clicks
        );

        Ok(Self {
            gaze,
            state: CalibrationState::with_required_clicks(viewport, required_clicks),
        })
    }

    /// Registers a click on the displayed target.
    pub fn click(&mut self) -> ClickOutcome {
        let outcome = self.state.register_click();
        match outcome {
            ClickOutcome::Completed => {
                self.gaze.set_calibrated(true);
                log_info!("calibration complete");
            }
            ClickOutcome::Advanced { point_index } => {
                log_debug!("calibration advanced to point {point_index}");
            }
            ClickOutcome::Counted { .. } | ClickOutcome::Ignored => {}
        }
        outcome
    }

    pub fn state(&self) -> &CalibrationState {
        &self.state
    }

    pub fn target(&self) -> ScreenPoint {
        self.state.active_point()
    }

    pub fn is_complete(&self) -> bool {
        self.state.is_complete()
    }

    /// Leaves the view. Equivalent to dropping the session.
    pub fn unmount(self) {}
}

impl Drop for CalibrationSession<'_> {
    fn drop(&mut self) {
        self.gaze.stop();
    }
}
