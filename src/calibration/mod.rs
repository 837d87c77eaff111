pub mod controller;
pub mod state;

pub use controller::CalibrationSession;
pub use state::{
    calibration_points, CalibrationPhase, CalibrationState, ClickOutcome, ScreenPoint,
    CALIBRATION_POINT_COUNT, REQUIRED_CLICKS,
};
