use thiserror::Error;

/// Failures that can reach the calibration and survey views.
///
/// None of these crash the orchestrator; each is converted to a
/// user-visible message via [`CaptureError::user_message`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CaptureError {
    #[error("gaze capability is not loaded")]
    CapabilityUnavailable,

    #[error("gaze capability failed: {0}")]
    CapabilityFailed(String),

    #[error("video fetch failed: {0}")]
    VideoFetch(String),

    #[error("result submission failed: {0}")]
    ResultSubmission(String),

    #[error("no authenticated participant")]
    Unauthorized,

    #[error("invalid questionnaire answers: {0}")]
    InvalidAnswers(String),

    #[error("expected phase {expected}, orchestrator is {actual}")]
    UnexpectedPhase {
        expected: &'static str,
        actual: &'static str,
    },
}

pub type CaptureResult<T> = Result<T, CaptureError>;

impl CaptureError {
    pub fn user_message(&self) -> String {
        match self {
            CaptureError::CapabilityUnavailable => {
                "Eye tracking could not be loaded. Reload the page and allow camera access.".into()
            }
            CaptureError::CapabilityFailed(_) => {
                "Eye tracking failed to start. Check camera permissions and try again.".into()
            }
            CaptureError::VideoFetch(_) => {
                "The next video could not be loaded. Please retry.".into()
            }
            CaptureError::ResultSubmission(_) => {
                "Your answers could not be sent yet; they will be retried.".into()
            }
            CaptureError::Unauthorized => "Please sign in before continuing.".into(),
            CaptureError::InvalidAnswers(reason) => format!("Please check your answers: {reason}"),
            CaptureError::UnexpectedPhase { .. } => {
                "That action is not available right now.".into()
            }
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CaptureError::CapabilityFailed(_)
                | CaptureError::VideoFetch(_)
                | CaptureError::ResultSubmission(_)
        )
    }
}
