//! Drives the capture pipeline from a recorded session script.
//!
//! A script is a JSON document of timestamped participant events. Each
//! event moves a [`ManualClock`] to its `at` time before it is dispatched,
//! so throttling and hazard timestamps come out exactly as recorded.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::{PlaylistVideoSource, ResultSink, VideoSource};
use crate::clock::{ManualClock, Millis};
use crate::db::Database;
use crate::error::CaptureError;
use crate::gaze::{GazeModelLifecycle, ReplayCapability, ReplayHandle};
use crate::models::{Participant, QuestionnaireAnswers, RawGaze, VideoAssignment, WindowDimensions};
use crate::settings::CaptureSettings;
use crate::survey::{SubmissionOutcome, SurveyPhase, SurveySessionOrchestrator};

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ReplayEvent {
    CalibrationClick,
    Gaze { x: f64, y: f64 },
    /// A frame for which the model produced no estimate.
    GazeMissing,
    FirstFrame,
    HazardToggle,
    VideoEnded,
    Submit { answers: QuestionnaireAnswers },
    /// Requests a video: starts the first cycle, retries a failed fetch, or
    /// confirms the next video after a submission.
    Next,
    Leave,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedEvent {
    pub at: Millis,
    #[serde(flatten)]
    pub event: ReplayEvent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayScript {
    pub participant: Participant,
    pub viewport: WindowDimensions,
    /// Serves this video for every cycle instead of asking the retrieval
    /// service.
    #[serde(default)]
    pub video: Option<VideoAssignment>,
    pub events: Vec<TimedEvent>,
}

impl ReplayScript {
    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read replay script {}", path.display()))?;
        Self::from_json(&contents)
            .with_context(|| format!("Invalid replay script {}", path.display()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let mut script: ReplayScript = serde_json::from_str(json)?;
        script.events.sort_by_key(|event| event.at);
        Ok(script)
    }

    /// The fixed video as a source, when the script names one.
    pub fn fixed_video_source(&self) -> Option<Arc<dyn VideoSource>> {
        self.video
            .clone()
            .map(|video| Arc::new(PlaylistVideoSource::new(vec![video])) as Arc<dyn VideoSource>)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayIssue {
    pub at: Millis,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayReport {
    pub calibrated: bool,
    pub calibration_clicks: usize,
    pub submissions: Vec<SubmissionOutcome>,
    pub surveys_completed: u32,
    pub final_phase: SurveyPhase,
    pub issues: Vec<ReplayIssue>,
}

pub struct ReplayDriver {
    orchestrator: SurveySessionOrchestrator,
    gaze: ReplayHandle,
    clock: Arc<ManualClock>,
}

impl ReplayDriver {
    pub fn new(
        settings: &CaptureSettings,
        viewport: WindowDimensions,
        videos: Arc<dyn VideoSource>,
        results: Arc<dyn ResultSink>,
        outbox: Option<Database>,
    ) -> Self {
        let clock = Arc::new(ManualClock::new(0));
        let (capability, gaze) = ReplayCapability::new();
        let lifecycle = GazeModelLifecycle::with_logging_interval(
            Box::new(capability),
            clock.clone(),
            settings.logging_interval_ms,
        );

        let mut orchestrator = SurveySessionOrchestrator::new(lifecycle, videos, results, viewport)
            .with_calibration_clicks(settings.calibration_clicks);
        if let Some(db) = outbox {
            orchestrator = orchestrator.with_outbox(db);
        }

        Self {
            orchestrator,
            gaze,
            clock,
        }
    }

    pub fn orchestrator(&self) -> &SurveySessionOrchestrator {
        &self.orchestrator
    }

    /// Plays every event in order. Pipeline errors are collected into the
    /// report rather than aborting the replay, the way the participant
    /// would see a message and carry on.
    pub async fn run(mut self, script: &ReplayScript) -> ReplayReport {
        self.orchestrator.sign_in(script.participant.clone());
        self.orchestrator.set_viewport(script.viewport);

        let mut report = ReplayReport {
            calibrated: false,
            calibration_clicks: 0,
            submissions: Vec::new(),
            surveys_completed: script.participant.surveys_completed,
            final_phase: SurveyPhase::Idle,
            issues: Vec::new(),
        };

        let events = &script.events;
        let mut index = 0;
        while index < events.len() {
            let timed = &events[index];
            self.clock.set(timed.at);

            if timed.event == ReplayEvent::CalibrationClick {
                index = self.run_calibration(events, index, &mut report).await;
                continue;
            }

            if let Err(err) = self.dispatch(&timed.event, &mut report).await {
                log_warn!("replay event at {} failed: {err}", timed.at);
                report.issues.push(ReplayIssue {
                    at: timed.at,
                    message: err.to_string(),
                });
            }
            index += 1;
        }

        self.orchestrator.leave();
        report.final_phase = self.orchestrator.phase();
        if let Some(participant) = self.orchestrator.participant() {
            report.surveys_completed = participant.surveys_completed;
        }
        log_info!(
            "replay finished: {} submissions, {} issues",
            report.submissions.len(),
            report.issues.len()
        );
        report
    }

    /// Mounts a calibration session and feeds it clicks and gaze frames
    /// until calibration completes or another kind of event comes up.
    /// Returns the index of the first event not consumed.
    async fn run_calibration(
        &mut self,
        events: &[TimedEvent],
        start: usize,
        report: &mut ReplayReport,
    ) -> usize {
        let at = events[start].at;
        let mut session = match self.orchestrator.begin_calibration().await {
            Ok(session) => session,
            Err(err) => {
                report.issues.push(ReplayIssue {
                    at,
                    message: err.to_string(),
                });
                return start + 1;
            }
        };

        let mut index = start;
        while let Some(timed) = events.get(index) {
            match &timed.event {
                ReplayEvent::CalibrationClick => {
                    self.clock.set(timed.at);
                    session.click();
                    report.calibration_clicks += 1;
                }
                ReplayEvent::Gaze { x, y } => {
                    self.clock.set(timed.at);
                    self.gaze.emit(RawGaze { x: *x, y: *y });
                }
                ReplayEvent::GazeMissing => {
                    self.clock.set(timed.at);
                    self.gaze.emit_empty();
                }
                _ => break,
            }
            index += 1;
            if session.is_complete() {
                break;
            }
        }

        report.calibrated = session.is_complete();
        session.unmount();
        index
    }

    async fn dispatch(
        &mut self,
        event: &ReplayEvent,
        report: &mut ReplayReport,
    ) -> Result<(), CaptureError> {
        match event {
            ReplayEvent::Gaze { x, y } => self.gaze.emit(RawGaze { x: *x, y: *y }),
            ReplayEvent::GazeMissing => self.gaze.emit_empty(),
            ReplayEvent::FirstFrame => self.orchestrator.on_first_frame().await?,
            ReplayEvent::HazardToggle => {
                self.orchestrator.on_hazard_toggle();
            }
            ReplayEvent::VideoEnded => self.orchestrator.on_video_ended()?,
            ReplayEvent::Submit { answers } => {
                let outcome = self.orchestrator.submit_answers(answers.clone()).await?;
                report.submissions.push(outcome);
            }
            ReplayEvent::Next => {
                if self.orchestrator.phase() == SurveyPhase::ConfirmNext {
                    self.orchestrator.confirm_next().await?;
                } else {
                    self.orchestrator.start_cycle().await?;
                }
            }
            ReplayEvent::Leave => self.orchestrator.leave(),
            ReplayEvent::CalibrationClick => {}
        }
        Ok(())
    }
}
