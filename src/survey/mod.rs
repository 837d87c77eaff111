pub mod orchestrator;
pub mod state;

pub use orchestrator::{SubmissionOutcome, SurveySessionOrchestrator};
pub use state::{CycleState, SurveyPhase};
