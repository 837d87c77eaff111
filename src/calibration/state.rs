use serde::Serialize;

use crate::models::WindowDimensions;

pub const CALIBRATION_POINT_COUNT: usize = 9;
pub const REQUIRED_CLICKS: u32 = 5;
/// Distance of the edge targets from the viewport border.
pub const CALIBRATION_MARGIN_PX: f64 = 100.0;
const MIN_OPACITY: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

/// Row-major 3x3 grid: corners, edge midpoints and centre, computed once
/// from the viewport at calibration entry.
pub fn calibration_points(viewport: WindowDimensions) -> [ScreenPoint; CALIBRATION_POINT_COUNT] {
    let width = f64::from(viewport.width);
    let height = f64::from(viewport.height);
    let columns = [CALIBRATION_MARGIN_PX, width / 2.0, width - CALIBRATION_MARGIN_PX];
    let rows = [CALIBRATION_MARGIN_PX, height / 2.0, height - CALIBRATION_MARGIN_PX];

    let mut points = [ScreenPoint { x: 0.0, y: 0.0 }; CALIBRATION_POINT_COUNT];
    for (index, point) in points.iter_mut().enumerate() {
        *point = ScreenPoint {
            x: columns[index % 3],
            y: rows[index / 3],
        };
    }
    points
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationPhase {
    AwaitingClick { point_index: usize, click_count: u32 },
    Calibrated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    /// Click counted; the same point stays on screen.
    Counted { point_index: usize, click_count: u32 },
    /// Point finished; the next target is now displayed.
    Advanced { point_index: usize },
    /// Last point finished. Reported exactly once.
    Completed,
    /// Calibration was already complete; the click is ignored.
    Ignored,
}

#[derive(Debug, Clone)]
pub struct CalibrationState {
    points: [ScreenPoint; CALIBRATION_POINT_COUNT],
    required_clicks: u32,
    phase: CalibrationPhase,
}

impl CalibrationState {
    pub fn new(viewport: WindowDimensions) -> Self {
        Self::with_required_clicks(viewport, REQUIRED_CLICKS)
    }

    pub fn with_required_clicks(viewport: WindowDimensions, required_clicks: u32) -> Self {
        Self {
            points: calibration_points(viewport),
            required_clicks: required_clicks.max(1),
            phase: CalibrationPhase::AwaitingClick {
                point_index: 0,
                click_count: 0,
            },
        }
    }

    pub fn register_click(&mut self) -> ClickOutcome {
        let CalibrationPhase::AwaitingClick {
            point_index,
            click_count,
        } = self.phase
        else {
            return ClickOutcome::Ignored;
        };

        let click_count = click_count + 1;
        if click_count < self.required_clicks {
            self.phase = CalibrationPhase::AwaitingClick {
                point_index,
                click_count,
            };
            return ClickOutcome::Counted {
                point_index,
                click_count,
            };
        }

        if point_index + 1 == CALIBRATION_POINT_COUNT {
            self.phase = CalibrationPhase::Calibrated;
            ClickOutcome::Completed
        } else {
            let next = point_index + 1;
            self.phase = CalibrationPhase::AwaitingClick {
                point_index: next,
                click_count: 0,
            };
            ClickOutcome::Advanced { point_index: next }
        }
    }

    pub fn phase(&self) -> CalibrationPhase {
        self.phase
    }

    pub fn is_complete(&self) -> bool {
        self.phase == CalibrationPhase::Calibrated
    }

    /// Index of the displayed target; stays on the last point once complete.
    pub fn active_point_index(&self) -> usize {
        match self.phase {
            CalibrationPhase::AwaitingClick { point_index, .. } => point_index,
            CalibrationPhase::Calibrated => CALIBRATION_POINT_COUNT - 1,
        }
    }

    pub fn confirmations_at_point(&self) -> u32 {
        match self.phase {
            CalibrationPhase::AwaitingClick { click_count, .. } => click_count,
            CalibrationPhase::Calibrated => self.required_clicks,
        }
    }

    pub fn required_clicks(&self) -> u32 {
        self.required_clicks
    }

    pub fn active_point(&self) -> ScreenPoint {
        self.points[self.active_point_index()]
    }

    pub fn points(&self) -> &[ScreenPoint; CALIBRATION_POINT_COUNT] {
        &self.points
    }

    /// Feedback intensity in `[0, 1]`, a pure function of the click count.
    pub fn intensity(&self) -> f64 {
        f64::from(self.confirmations_at_point()) / f64::from(self.required_clicks)
    }

    /// Dot opacity, floored so an unclicked target is still visible.
    pub fn opacity(&self) -> f64 {
        self.intensity().max(MIN_OPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> CalibrationState {
        CalibrationState::new(WindowDimensions::new(1920, 1080))
    }

    #[test]
    fn grid_uses_margin_midpoints_and_centre() {
        let points = calibration_points(WindowDimensions::new(1000, 800));
        assert_eq!(points[0], ScreenPoint { x: 100.0, y: 100.0 });
        assert_eq!(points[1], ScreenPoint { x: 500.0, y: 100.0 });
        assert_eq!(points[2], ScreenPoint { x: 900.0, y: 100.0 });
        assert_eq!(points[4], ScreenPoint { x: 500.0, y: 400.0 });
        assert_eq!(points[6], ScreenPoint { x: 100.0, y: 700.0 });
        assert_eq!(points[8], ScreenPoint { x: 900.0, y: 700.0 });
    }

    #[test]
    fn completes_after_exactly_forty_five_clicks() {
        let mut state = state();
        let mut completions = 0;

        for click in 1..=45 {
            assert!(!state.is_complete(), "complete before click {click}");
            if click > 40 {
                assert_eq!(state.active_point_index(), 8);
            }
            if state.register_click() == ClickOutcome::Completed {
                completions += 1;
            }
            assert!(state.confirmations_at_point() <= REQUIRED_CLICKS);
        }

        assert!(state.is_complete());
        assert_eq!(completions, 1);
        assert_eq!(state.active_point_index(), 8);
        assert_eq!(state.register_click(), ClickOutcome::Ignored);
    }

    #[test]
    fn fifth_click_advances_to_next_target() {
        let mut state = state();
        for _ in 0..4 {
            assert!(matches!(state.register_click(), ClickOutcome::Counted { point_index: 0, .. }));
        }
        assert_eq!(state.register_click(), ClickOutcome::Advanced { point_index: 1 });
        assert_eq!(state.confirmations_at_point(), 0);
        assert_eq!(state.active_point(), ScreenPoint { x: 960.0, y: 100.0 });
    }

    #[test]
    fn intensity_tracks_click_ratio() {
        let mut state = state();
        assert_eq!(state.intensity(), 0.0);
        assert_eq!(state.opacity(), 0.3);
        state.register_click();
        state.register_click();
        assert!((state.intensity() - 0.4).abs() < f64::EPSILON);
        assert!((state.opacity() - 0.4).abs() < f64::EPSILON);
    }

    #[test]
    fn custom_click_requirement() {
        let mut state = CalibrationState::with_required_clicks(WindowDimensions::new(800, 600), 1);
        for _ in 0..8 {
            assert!(matches!(state.register_click(), ClickOutcome::Advanced { .. }));
        }
        assert_eq!(state.register_click(), ClickOutcome::Completed);
    }
}
