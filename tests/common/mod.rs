#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use hazardlens_lib::api::{ResultSink, VideoSource};
use hazardlens_lib::clock::ManualClock;
use hazardlens_lib::error::CaptureError;
use hazardlens_lib::gaze::{GazeModelLifecycle, ReplayCapability, ReplayHandle};
use hazardlens_lib::models::{
    Participant, QuestionnaireAnswers, SurveySessionResult, VideoAssignment, WindowDimensions,
};
use hazardlens_lib::survey::SurveySessionOrchestrator;

/// Serves `video-<n>` and fails the first `failures` requests.
pub struct FlakyVideos {
    failures: AtomicUsize,
    served: AtomicUsize,
}

impl FlakyVideos {
    pub fn new(failures: usize) -> Self {
        Self {
            failures: AtomicUsize::new(failures),
            served: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl VideoSource for FlakyVideos {
    async fn fetch_random_video(&self) -> Result<VideoAssignment, CaptureError> {
        if self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(CaptureError::VideoFetch("service unavailable".into()));
        }
        let n = self.served.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(VideoAssignment {
            url: format!("https://cdn.example/video-{n}.mp4"),
            video_id: format!("video-{n}"),
        })
    }
}

/// Records every delivered result; fails the first `failures` posts.
#[derive(Default)]
pub struct RecordingSink {
    failures: AtomicUsize,
    pub delivered: Mutex<Vec<SurveySessionResult>>,
}

impl RecordingSink {
    pub fn failing(failures: usize) -> Self {
        Self {
            failures: AtomicUsize::new(failures),
            delivered: Mutex::new(Vec::new()),
        }
    }

    pub fn delivered(&self) -> Vec<SurveySessionResult> {
        self.delivered.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResultSink for RecordingSink {
    async fn post_results(&self, result: &SurveySessionResult) -> Result<(), CaptureError> {
        if self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(CaptureError::ResultSubmission("HTTP 502".into()));
        }
        self.delivered.lock().unwrap().push(result.clone());
        Ok(())
    }
}

pub struct Harness {
    pub orchestrator: SurveySessionOrchestrator,
    pub gaze: ReplayHandle,
    pub clock: Arc<ManualClock>,
    pub sink: Arc<RecordingSink>,
}

pub fn harness(videos: FlakyVideos, sink: RecordingSink) -> Harness {
    harness_with(ReplayCapability::new(), videos, sink)
}

pub fn harness_with(
    (capability, gaze): (ReplayCapability, ReplayHandle),
    videos: FlakyVideos,
    sink: RecordingSink,
) -> Harness {
    let clock = Arc::new(ManualClock::new(0));
    let lifecycle = GazeModelLifecycle::new(Box::new(capability), clock.clone());
    let sink = Arc::new(sink);
    let orchestrator = SurveySessionOrchestrator::new(
        lifecycle,
        Arc::new(videos),
        sink.clone(),
        WindowDimensions::new(1920, 1080),
    );

    Harness {
        orchestrator,
        gaze,
        clock,
        sink,
    }
}

pub fn participant(prior_surveys: u32) -> Participant {
    let mut participant = Participant::new("participant-7");
    participant.surveys_completed = prior_surveys;
    participant
}

pub fn answers() -> QuestionnaireAnswers {
    QuestionnaireAnswers {
        hazard_detected: "yes".into(),
        no_detection_reason: String::new(),
        detection_confidence: 7.0,
        hazard_severity: 4.0,
        attention_factors: vec!["pedestrian".into()],
    }
}
