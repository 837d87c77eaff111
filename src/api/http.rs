use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::CaptureError;
use crate::models::{SurveySessionResult, VideoAssignment};

use super::{ResultSink, VideoSource};

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

const RANDOM_VIDEO_PATH: &str = "/api/videos/random";
const RESULTS_PATH: &str = "/survey/results";

/// Blocking `ureq` client for the survey backend, moved off the async
/// runtime with `spawn_blocking` for every request.
#[derive(Clone)]
pub struct HttpSurveyApi {
    base_url: String,
    agent: ureq::Agent,
    bearer_token: Option<String>,
}

impl HttpSurveyApi {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
            bearer_token: None,
        }
    }

    pub fn with_bearer_token(mut self, token: Option<String>) -> Self {
        self.bearer_token = token;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: ureq::Request) -> ureq::Request {
        match &self.bearer_token {
            Some(token) => request.set("Authorization", &format!("Bearer {token}")),
            None => request,
        }
    }
}

fn describe(err: ureq::Error) -> String {
    match err {
        ureq::Error::Status(code, response) => {
            format!("server returned status {code} ({})", response.status_text())
        }
        ureq::Error::Transport(transport) => format!("transport error: {transport}"),
    }
}

/// Validates the random-video response body. Both `url` and `videoId`
/// must be non-empty strings.
pub fn parse_video_assignment(body: &Value) -> Result<VideoAssignment, CaptureError> {
    let field = |name: &str| {
        body.get(name)
            .and_then(Value::as_str)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .ok_or_else(|| CaptureError::VideoFetch(format!("response is missing '{name}'")))
    };

    Ok(VideoAssignment {
        url: field("url")?,
        video_id: field("videoId")?,
    })
}

#[async_trait]
impl VideoSource for HttpSurveyApi {
    async fn fetch_random_video(&self) -> Result<VideoAssignment, CaptureError> {
        let request = self.authorize(self.agent.get(&self.url(RANDOM_VIDEO_PATH)));

        let body = tokio::task::spawn_blocking(move || -> Result<Value, CaptureError> {
            let response = request
                .call()
                .map_err(|err| CaptureError::VideoFetch(describe(err)))?;
            response
                .into_json::<Value>()
                .map_err(|err| CaptureError::VideoFetch(format!("malformed body: {err}")))
        })
        .await
        .map_err(|err| CaptureError::VideoFetch(format!("fetch worker join failed: {err}")))??;

        let video = parse_video_assignment(&body)?;
        log_info!("assigned video {}", video.video_id);
        Ok(video)
    }
}

#[async_trait]
impl ResultSink for HttpSurveyApi {
    async fn post_results(&self, result: &SurveySessionResult) -> Result<(), CaptureError> {
        let payload = serde_json::to_value(result)
            .map_err(|err| CaptureError::ResultSubmission(format!("serialize failed: {err}")))?;
        let request = self.authorize(self.agent.post(&self.url(RESULTS_PATH)));
        let video_id = result.video_id.clone();

        tokio::task::spawn_blocking(move || {
            request
                .send_json(payload)
                .map(|_| ())
                .map_err(|err| CaptureError::ResultSubmission(describe(err)))
        })
        .await
        .map_err(|err| CaptureError::ResultSubmission(format!("post worker join failed: {err}")))?
        .map_err(|err| {
            log_warn!("posting results for video {video_id} failed: {err}");
            err
        })?;

        log_info!("survey results posted for video {video_id}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_complete_body() {
        let video = parse_video_assignment(&json!({
            "url": "https://bucket.example/clip.mp4?sig=1",
            "videoId": "clips/clip.mp4"
        }))
        .unwrap();
        assert_eq!(video.video_id, "clips/clip.mp4");
    }

    #[test]
    fn missing_url_is_a_fetch_error() {
        let err = parse_video_assignment(&json!({ "videoId": "a" })).unwrap_err();
        assert_eq!(err, CaptureError::VideoFetch("response is missing 'url'".into()));
    }

    #[test]
    fn non_string_fields_are_rejected() {
        assert!(parse_video_assignment(&json!({ "url": 3, "videoId": "a" })).is_err());
        assert!(parse_video_assignment(&json!({ "url": "u", "videoId": "" })).is_err());
        assert!(parse_video_assignment(&json!([])).is_err());
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let api = HttpSurveyApi::new("http://localhost:3001/", Duration::from_secs(1));
        assert_eq!(api.url(RESULTS_PATH), "http://localhost:3001/survey/results");
    }
}
