pub mod gaze;
pub mod participant;
pub mod result;
pub mod video;

pub use gaze::{GazeSample, RawGaze, WindowDimensions};
pub use participant::Participant;
pub use result::{FormData, QuestionnaireAnswers, SurveySessionResult};
pub use video::VideoAssignment;
