use std::sync::Arc;

use chrono::{TimeZone, Utc};
use serde::Serialize;

use crate::api::{ResultSink, VideoSource};
use crate::calibration::{CalibrationSession, REQUIRED_CLICKS};
use crate::clock::Clock;
use crate::db::Database;
use crate::error::{CaptureError, CaptureResult};
use crate::gaze::GazeModelLifecycle;
use crate::hazard::ToggleOutcome;
use crate::models::{
    FormData, Participant, QuestionnaireAnswers, SurveySessionResult, VideoAssignment,
    WindowDimensions,
};

use super::state::{CycleState, SurveyPhase};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", rename_all_fields = "camelCase", tag = "status")]
pub enum SubmissionOutcome {
    Delivered,
    /// Posting failed; the result waits in the local outbox.
    Queued { outbox_id: String },
    /// Posting failed and no outbox could hold the result.
    Lost { reason: String },
}

/// Sequences calibration and the Playing -> Answering -> ConfirmNext loop,
/// and is the only owner of the gaze capability.
pub struct SurveySessionOrchestrator {
    gaze: GazeModelLifecycle,
    videos: Arc<dyn VideoSource>,
    results: Arc<dyn ResultSink>,
    outbox: Option<Database>,
    clock: Arc<dyn Clock>,
    participant: Option<Participant>,
    viewport: WindowDimensions,
    calibration_clicks: u32,
    phase: SurveyPhase,
    cycle: Option<CycleState>,
    last_error: Option<CaptureError>,
}

impl SurveySessionOrchestrator {
    pub fn new(
        gaze: GazeModelLifecycle,
        videos: Arc<dyn VideoSource>,
        results: Arc<dyn ResultSink>,
        viewport: WindowDimensions,
    ) -> Self {
        let clock = gaze.clock();
        Self {
            gaze,
            videos,
            results,
            outbox: None,
            clock,
            participant: None,
            viewport,
            calibration_clicks: REQUIRED_CLICKS,
            phase: SurveyPhase::Idle,
            cycle: None,
            last_error: None,
        }
    }

    pub fn with_outbox(mut self, db: Database) -> Self {
        self.outbox = Some(db);
        self
    }

    pub fn with_calibration_clicks(mut self, clicks: u32) -> Self {
        self.calibration_clicks = clicks.max(1);
        self
    }

    pub fn sign_in(&mut self, participant: Participant) {
        log_info!("participant {} signed in", participant.user_id);
        self.participant = Some(participant);
    }

    /// Signs out and abandons any cycle in progress.
    pub fn sign_out(&mut self) {
        self.leave();
        self.participant = None;
    }

    pub fn participant(&self) -> Option<&Participant> {
        self.participant.as_ref()
    }

    fn require_participant(&self) -> CaptureResult<&Participant> {
        self.participant.as_ref().ok_or(CaptureError::Unauthorized)
    }

    fn expect_phase(&self, expected: SurveyPhase) -> CaptureResult<()> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(CaptureError::UnexpectedPhase {
                expected: expected.as_str(),
                actual: self.phase.as_str(),
            })
        }
    }

    pub fn set_viewport(&mut self, viewport: WindowDimensions) {
        self.viewport = viewport;
    }

    pub fn viewport(&self) -> WindowDimensions {
        self.viewport
    }

    pub fn phase(&self) -> SurveyPhase {
        self.phase
    }

    pub fn last_error(&self) -> Option<&CaptureError> {
        self.last_error.as_ref()
    }

    pub fn current_video(&self) -> Option<&VideoAssignment> {
        self.cycle.as_ref().map(|cycle| &cycle.video)
    }

    pub fn gaze(&self) -> &GazeModelLifecycle {
        &self.gaze
    }

    pub fn is_calibrated(&self) -> bool {
        self.gaze.is_calibrated()
    }

    pub fn hazard_flashing(&self) -> bool {
        self.cycle
            .as_ref()
            .and_then(|cycle| cycle.recorder.as_ref())
            .map_or(false, |recorder| recorder.is_flashing())
    }

    /// Mounts the calibration view. Only allowed between cycles, so the
    /// capability is never shared with a playing video.
    pub async fn begin_calibration(&mut self) -> CaptureResult<CalibrationSession<'_>> {
        self.require_participant()?;
        if !self.phase.can_start_cycle() {
            return Err(CaptureError::UnexpectedPhase {
                expected: "Idle",
                actual: self.phase.as_str(),
            });
        }

        CalibrationSession::mount(&mut self.gaze, self.viewport, self.calibration_clicks).await
    }

    /// Fetches a random video and enters `Playing` with fresh per-cycle
    /// state. A fetch failure leaves the orchestrator in `FetchFailed`, from
    /// which calling this again retries.
    pub async fn start_cycle(&mut self) -> CaptureResult<()> {
        self.require_participant()?;
        if !self.phase.can_start_cycle() {
            return Err(CaptureError::UnexpectedPhase {
                expected: "ConfirmNext",
                actual: self.phase.as_str(),
            });
        }

        self.cycle = None;
        // Samples from calibration or an abandoned cycle never belong to
        // the next video.
        self.gaze.reset_final_buffer();
        match self.videos.fetch_random_video().await {
            Ok(video) => {
                log_info!("cycle started with video {}", video.video_id);
                self.cycle = Some(CycleState::new(video));
                self.last_error = None;
                self.phase = SurveyPhase::Playing;
                Ok(())
            }
            Err(err) => {
                log_warn!("video fetch failed: {err}");
                self.last_error = Some(err.clone());
                self.phase = SurveyPhase::FetchFailed;
                Err(err)
            }
        }
    }

    /// User-gated continuation after a submission.
    pub async fn confirm_next(&mut self) -> CaptureResult<()> {
        self.expect_phase(SurveyPhase::ConfirmNext)?;
        self.start_cycle().await
    }

    /// Starts gaze capture on the first rendered frame rather than on
    /// mount, so load time is not recorded. Later frames are ignored.
    pub async fn on_first_frame(&mut self) -> CaptureResult<()> {
        self.expect_phase(SurveyPhase::Playing)?;
        if self.cycle.as_ref().map_or(false, |c| c.started_at.is_some()) {
            return Ok(());
        }

        if let Err(err) = self.gaze.start().await {
            self.last_error = Some(err.clone());
            return Err(err);
        }

        let now = self.clock.now_millis();
        if let Some(cycle) = self.cycle.as_mut() {
            cycle.started_at = Some(now);
        }
        log_debug!("playback started at {now}");
        Ok(())
    }

    /// Hazard key press. Ignored outside `Playing`.
    pub fn on_hazard_toggle(&mut self) -> Option<ToggleOutcome> {
        if self.phase != SurveyPhase::Playing {
            return None;
        }
        let now = self.clock.now_millis();
        let recorder = self.cycle.as_mut()?.recorder.as_mut()?;
        Some(recorder.on_toggle(now))
    }

    /// Natural end of playback: stops capture, closes any open hazard and
    /// moves to the questionnaire.
    pub fn on_video_ended(&mut self) -> CaptureResult<()> {
        self.expect_phase(SurveyPhase::Playing)?;
        let now = self.clock.now_millis();

        if self.gaze.is_initialized() {
            self.gaze.stop();
        } else {
            // Capture never started for this video.
            self.gaze.reset_final_buffer();
        }

        if let Some(cycle) = self.cycle.as_mut() {
            if let Some(recorder) = cycle.recorder.take() {
                cycle.hazard_events = recorder.finalize(now);
            }
            cycle.started_at.get_or_insert(now);
            cycle.ended_at = Some(now);
            log_info!(
                "video {} ended: {} gaze samples, {} hazard timestamps",
                cycle.video.video_id,
                self.gaze.final_samples().len(),
                cycle.hazard_events.len()
            );
        }

        self.phase = SurveyPhase::Answering;
        Ok(())
    }

    fn assemble_result(&self, answers: QuestionnaireAnswers) -> CaptureResult<SurveySessionResult> {
        let participant = self.require_participant()?;
        let cycle = self.cycle.as_ref().ok_or(CaptureError::UnexpectedPhase {
            expected: "Answering",
            actual: self.phase.as_str(),
        })?;

        let end_time = cycle.ended_at.unwrap_or_else(|| self.clock.now_millis());
        let start_time = cycle.started_at.unwrap_or(end_time);

        Ok(SurveySessionResult {
            user_id: participant.user_id.clone(),
            video_id: cycle.video.video_id.clone(),
            window_dimensions: self.viewport,
            gaze: self.gaze.final_samples().to_vec(),
            form_data: FormData::new(answers, cycle.hazard_events.clone(), start_time, end_time),
            num_surveys_completed: participant.surveys_completed + 1,
        })
    }

    /// Submits the questionnaire. A failed post never blocks the
    /// participant: the result is queued in the outbox when one is
    /// configured, and the cycle moves on to `ConfirmNext` either way.
    pub async fn submit_answers(
        &mut self,
        answers: QuestionnaireAnswers,
    ) -> CaptureResult<SubmissionOutcome> {
        self.expect_phase(SurveyPhase::Answering)?;
        answers.validate()?;
        let result = self.assemble_result(answers)?;

        let outcome = match self.results.post_results(&result).await {
            Ok(()) => SubmissionOutcome::Delivered,
            Err(err) => {
                log_warn!("result for video {} not delivered: {err}", result.video_id);
                self.queue_undelivered(&result, &err).await
            }
        };

        match &outcome {
            SubmissionOutcome::Delivered | SubmissionOutcome::Queued { .. } => {
                self.gaze.reset_final_buffer();
                if let Some(participant) = self.participant.as_mut() {
                    participant.surveys_completed += 1;
                }
            }
            SubmissionOutcome::Lost { reason } => {
                log_error!("survey result for video {} lost: {reason}", result.video_id);
            }
        }

        self.cycle = None;
        self.phase = SurveyPhase::ConfirmNext;
        Ok(outcome)
    }

    async fn queue_undelivered(
        &self,
        result: &SurveySessionResult,
        err: &CaptureError,
    ) -> SubmissionOutcome {
        let Some(db) = self.outbox.as_ref() else {
            return SubmissionOutcome::Lost {
                reason: err.to_string(),
            };
        };

        let queued_at = Utc
            .timestamp_millis_opt(self.clock.now_millis())
            .single()
            .unwrap_or_else(Utc::now);
        match db.enqueue_result(result, &err.to_string(), queued_at).await {
            Ok(outbox_id) => {
                log_info!("result for video {} queued as {outbox_id}", result.video_id);
                SubmissionOutcome::Queued { outbox_id }
            }
            Err(queue_err) => SubmissionOutcome::Lost {
                reason: format!("{err}; outbox write failed: {queue_err:#}"),
            },
        }
    }

    /// Navigating away from any gaze-consuming view.
    pub fn leave(&mut self) {
        self.gaze.stop();
        self.cycle = None;
        if self.phase != SurveyPhase::Idle {
            log_info!("left survey during {}", self.phase.as_str());
        }
        self.phase = SurveyPhase::Idle;
    }
}
