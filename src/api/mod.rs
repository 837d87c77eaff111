//! Network collaborators: the video-retrieval service and results ingestion.

pub mod http;
pub mod playlist;

use async_trait::async_trait;

use crate::error::CaptureError;
use crate::models::{SurveySessionResult, VideoAssignment};

pub use http::HttpSurveyApi;
pub use playlist::PlaylistVideoSource;

#[async_trait]
pub trait VideoSource: Send + Sync {
    async fn fetch_random_video(&self) -> Result<VideoAssignment, CaptureError>;
}

#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn post_results(&self, result: &SurveySessionResult) -> Result<(), CaptureError>;
}

/// Sink that never delivers, so every result lands in the local outbox.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineSink;

#[async_trait]
impl ResultSink for OfflineSink {
    async fn post_results(&self, _result: &SurveySessionResult) -> Result<(), CaptureError> {
        Err(CaptureError::ResultSubmission("running offline".into()))
    }
}
