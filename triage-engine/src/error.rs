use thiserror::Error;
use triage_llm_sdk::error::LlmError;
use triage_types::{Language, QuestionError, SessionBoundsError};
use uuid::Uuid;

use crate::repair::MalformedResponse;

/// Errors surfaced by the intake engine
#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("Text generation gateway unavailable: {0}")]
    GatewayUnavailable(#[from] LlmError),

    #[error(transparent)]
    MalformedResponse(#[from] MalformedResponse),

    #[error("Session bounds exceeded: {0}")]
    SessionBoundsExceeded(#[from] SessionBoundsError),

    #[error("Session not found: {0}")]
    SessionNotFound(Uuid),

    #[error("Session {0} is already handling a request")]
    SessionBusy(Uuid),

    #[error("Answer for '{received}' does not match the outstanding question {expected:?}")]
    UnexpectedAnswer {
        expected: Option<String>,
        received: String,
    },

    #[error("Invalid question: {0}")]
    InvalidQuestion(#[from] QuestionError),
}

impl IntakeError {
    /// Whether the same call may succeed if repeated
    pub fn is_retryable(&self) -> bool {
        match self {
            IntakeError::GatewayUnavailable(e) => e.is_retryable(),
            IntakeError::MalformedResponse(_) | IntakeError::SessionBusy(_) => true,
            _ => false,
        }
    }

    /// Text that can be shown to the person filling in the questionnaire
    pub fn user_message(&self, language: Language) -> &'static str {
        match (self, language) {
            (
                IntakeError::GatewayUnavailable(_) | IntakeError::MalformedResponse(_),
                Language::En,
            ) => {
                "We could not complete your assessment right now. Please try again in a moment \
                 or consult a healthcare professional."
            }
            (
                IntakeError::GatewayUnavailable(_) | IntakeError::MalformedResponse(_),
                Language::De,
            ) => {
                "Ihre Einschätzung konnte gerade nicht erstellt werden. Bitte versuchen Sie es \
                 gleich noch einmal oder wenden Sie sich an medizinisches Fachpersonal."
            }
            (IntakeError::SessionBusy(_), Language::En) => {
                "Your previous answer is still being processed. Please wait a moment."
            }
            (IntakeError::SessionBusy(_), Language::De) => {
                "Ihre vorherige Antwort wird noch verarbeitet. Bitte warten Sie einen Moment."
            }
            (_, Language::En) => "Something went wrong with this questionnaire. Please start again.",
            (_, Language::De) => {
                "Bei diesem Fragebogen ist ein Fehler aufgetreten. Bitte beginnen Sie erneut."
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_failure_message_mentions_professional() {
        let error = IntakeError::GatewayUnavailable(LlmError::api_error(503, "down"));
        assert!(error.user_message(Language::En).contains("healthcare professional"));
        assert!(error.user_message(Language::De).contains("Fachpersonal"));
        assert!(error.is_retryable());
    }

    #[test]
    fn test_bounds_error_is_not_retryable() {
        let error = IntakeError::from(SessionBoundsError::Completed);
        assert!(!error.is_retryable());
    }
}
