// Shared models for the triage engine, its gateway prompts and UI clients

pub mod assessment;
pub mod language;
pub mod question;
pub mod response;
pub mod session;
pub mod typescript_gen;

pub use typescript_gen::generate_typescript_definitions;

pub use assessment::{
    AssessmentPayload, AssessmentResult, ConditionPayload, PossibleCondition, Severity,
};
pub use language::Language;
pub use question::{
    sanitize_options, slugify, AnswerContext, GeneratedOption, GeneratedQuestion,
    ImageUploadConfig, Question, QuestionError, QuestionKind, QuestionOption,
};
pub use response::{Answer, ImageAnalysisResult, ImageData, QuestionResponse};
pub use session::{QuestionnaireSession, SessionBoundsError, DEFAULT_MAX_QUESTIONS};
