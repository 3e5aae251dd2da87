pub mod answers;
pub mod assessment;
pub mod config;
pub mod context;
pub mod emergency;
pub mod error;
pub mod flow;
pub mod gateway;
pub mod image;
pub mod repair;
pub mod session;
pub mod severity;

#[cfg(test)]
mod test_support;

pub use answers::AnswerGenerator;
pub use assessment::AssessmentEngine;
pub use config::{get_config_path, IntakeConfig};
pub use emergency::EmergencyDetector;
pub use error::IntakeError;
pub use flow::QuestionFlow;
pub use gateway::{CapabilityTier, Gateway, GenerateOptions, OutputFormat};
pub use image::{ImageAnalysisRequest, ImageAnalyzer};
pub use repair::{parse_structured, MalformedResponse};
pub use session::{IntakeService, SessionStep};
pub use severity::SeverityClassifier;
