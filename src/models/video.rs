use serde::{Deserialize, Serialize};

/// A video handed out by the video-retrieval service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoAssignment {
    pub url: String,
    pub video_id: String,
}
