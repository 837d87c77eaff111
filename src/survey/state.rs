use serde::Serialize;

use crate::clock::Millis;
use crate::hazard::HazardEventRecorder;
use crate::models::VideoAssignment;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SurveyPhase {
    /// No cycle in progress (before the first video or after leaving).
    #[default]
    Idle,
    Playing,
    Answering,
    /// Results handled; waiting for the participant to ask for another video.
    ConfirmNext,
    /// The last video fetch failed; a retry starts a fresh cycle.
    FetchFailed,
}

impl SurveyPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SurveyPhase::Idle => "Idle",
            SurveyPhase::Playing => "Playing",
            SurveyPhase::Answering => "Answering",
            SurveyPhase::ConfirmNext => "ConfirmNext",
            SurveyPhase::FetchFailed => "FetchFailed",
        }
    }

    /// Phases from which a new video may be requested.
    pub fn can_start_cycle(&self) -> bool {
        matches!(
            self,
            SurveyPhase::Idle | SurveyPhase::ConfirmNext | SurveyPhase::FetchFailed
        )
    }
}

/// Per-cycle data, discarded when the next cycle starts.
#[derive(Debug)]
pub struct CycleState {
    pub video: VideoAssignment,
    /// Present only while the video is playing.
    pub recorder: Option<HazardEventRecorder>,
    pub hazard_events: Vec<Millis>,
    pub started_at: Option<Millis>,
    pub ended_at: Option<Millis>,
}

impl CycleState {
    pub fn new(video: VideoAssignment) -> Self {
        Self {
            video,
            recorder: Some(HazardEventRecorder::new()),
            hazard_events: Vec::new(),
            started_at: None,
            ended_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_phase_is_idle_and_can_start() {
        assert_eq!(SurveyPhase::default(), SurveyPhase::Idle);
        assert!(SurveyPhase::default().can_start_cycle());
        assert!(!SurveyPhase::Playing.can_start_cycle());
    }
}
