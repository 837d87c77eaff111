//! A survey result that could not be delivered and waits in the outbox.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::SurveySessionResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingResult {
    pub id: String,
    pub result: SurveySessionResult,
    pub attempts: u32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
