//! Outbound survey result, field-exact with the results-ingestion endpoint.

use serde::{Deserialize, Serialize};

use crate::clock::Millis;
use crate::error::CaptureError;

use super::gaze::{GazeSample, WindowDimensions};

const SCALE_MIN: f64 = 1.0;
const SCALE_MAX: f64 = 10.0;

/// What the participant typed into the post-video questionnaire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionnaireAnswers {
    pub hazard_detected: String,
    #[serde(default)]
    pub no_detection_reason: String,
    pub detection_confidence: f64,
    pub hazard_severity: f64,
    #[serde(default)]
    pub attention_factors: Vec<String>,
}

impl QuestionnaireAnswers {
    pub fn validate(&self) -> Result<(), CaptureError> {
        if self.hazard_detected.trim().is_empty() {
            return Err(CaptureError::InvalidAnswers(
                "hazardDetected is required".into(),
            ));
        }
        check_scale("detectionConfidence", self.detection_confidence)?;
        check_scale("hazardSeverity", self.hazard_severity)
    }
}

fn check_scale(field: &str, value: f64) -> Result<(), CaptureError> {
    if value.is_finite() && (SCALE_MIN..=SCALE_MAX).contains(&value) {
        Ok(())
    } else {
        Err(CaptureError::InvalidAnswers(format!(
            "{field} must be between {SCALE_MIN} and {SCALE_MAX}, got {value}"
        )))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormData {
    pub hazard_detected: String,
    pub no_detection_reason: String,
    pub detection_confidence: f64,
    pub hazard_severity: f64,
    pub attention_factors: Vec<String>,
    /// Paired hazard start/end toggles, always even length.
    pub spacebar_timestamps: Vec<Millis>,
    pub start_time: Millis,
    pub end_time: Millis,
}

impl FormData {
    pub fn new(
        answers: QuestionnaireAnswers,
        spacebar_timestamps: Vec<Millis>,
        start_time: Millis,
        end_time: Millis,
    ) -> Self {
        Self {
            hazard_detected: answers.hazard_detected,
            no_detection_reason: answers.no_detection_reason,
            detection_confidence: answers.detection_confidence,
            hazard_severity: answers.hazard_severity,
            attention_factors: answers.attention_factors,
            spacebar_timestamps,
            start_time,
            end_time,
        }
    }
}

/// One completed video + questionnaire cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveySessionResult {
    pub user_id: String,
    pub video_id: String,
    pub window_dimensions: WindowDimensions,
    pub gaze: Vec<GazeSample>,
    pub form_data: FormData,
    pub num_surveys_completed: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn answers() -> QuestionnaireAnswers {
        QuestionnaireAnswers {
            hazard_detected: "yes".into(),
            no_detection_reason: String::new(),
            detection_confidence: 7.0,
            hazard_severity: 4.0,
            attention_factors: vec!["mirror".into()],
        }
    }

    #[test]
    fn serializes_with_wire_field_names() {
        let result = SurveySessionResult {
            user_id: "u1".into(),
            video_id: "clips/a.mp4".into(),
            window_dimensions: WindowDimensions::new(1280, 720),
            gaze: vec![GazeSample {
                x: 10.5,
                y: 20.0,
                time: 1_000,
            }],
            form_data: FormData::new(answers(), vec![1_100, 1_500], 1_000, 2_000),
            num_surveys_completed: 3,
        };

        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(
            value,
            json!({
                "userId": "u1",
                "videoId": "clips/a.mp4",
                "windowDimensions": { "width": 1280, "height": 720 },
                "gaze": [ { "x": 10.5, "y": 20.0, "time": 1000 } ],
                "formData": {
                    "hazardDetected": "yes",
                    "noDetectionReason": "",
                    "detectionConfidence": 7.0,
                    "hazardSeverity": 4.0,
                    "attentionFactors": ["mirror"],
                    "spacebarTimestamps": [1100, 1500],
                    "startTime": 1000,
                    "endTime": 2000
                },
                "numSurveysCompleted": 3
            })
        );
    }

    #[test]
    fn rejects_out_of_scale_answers() {
        let mut bad = answers();
        bad.hazard_severity = 11.0;
        assert!(matches!(bad.validate(), Err(CaptureError::InvalidAnswers(_))));

        let mut nan = answers();
        nan.detection_confidence = f64::NAN;
        assert!(nan.validate().is_err());

        let mut blank = answers();
        blank.hazard_detected = "  ".into();
        assert!(blank.validate().is_err());

        assert!(answers().validate().is_ok());
    }
}
