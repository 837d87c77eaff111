use serde::{Deserialize, Serialize};

/// The signed-in participant. Registration and sign-in happen elsewhere;
/// the capture pipeline only needs to know someone is present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub user_id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    /// Surveys completed before this sign-in.
    #[serde(default)]
    pub surveys_completed: u32,
}

impl Participant {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            email: None,
            token: None,
            surveys_completed: 0,
        }
    }
}
