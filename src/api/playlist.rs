use async_trait::async_trait;
use rand::seq::SliceRandom;

use crate::error::CaptureError;
use crate::models::VideoAssignment;

use super::VideoSource;

/// Hands out a uniformly random video from a fixed list.
#[derive(Debug, Clone, Default)]
pub struct PlaylistVideoSource {
    videos: Vec<VideoAssignment>,
}

impl PlaylistVideoSource {
    pub fn new(videos: Vec<VideoAssignment>) -> Self {
        Self { videos }
    }

    pub fn len(&self) -> usize {
        self.videos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.videos.is_empty()
    }
}

#[async_trait]
impl VideoSource for PlaylistVideoSource {
    async fn fetch_random_video(&self) -> Result<VideoAssignment, CaptureError> {
        self.videos
            .choose(&mut rand::thread_rng())
            .cloned()
            .ok_or_else(|| CaptureError::VideoFetch("no videos available".into()))
    }
}
