use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

use crate::language::Language;
use crate::response::QuestionResponse;

/// Upper bound on the number of answers collected in one session
pub const DEFAULT_MAX_QUESTIONS: usize = 8;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionBoundsError {
    #[error("Session is already completed")]
    Completed,

    #[error("Session already holds the maximum of {max} responses")]
    CapReached { max: usize },
}

/// One user's questionnaire conversation.
///
/// The response list is append-only and ordered; once `completed` is set no
/// further responses are accepted.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct QuestionnaireSession {
    pub id: Uuid,
    pub language: Language,
    responses: Vec<QuestionResponse>,
    pub current_question_id: Option<String>,
    completed: bool,
    pub started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    max_questions: usize,
}

impl QuestionnaireSession {
    pub fn new(language: Language, max_questions: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            language,
            responses: Vec::new(),
            current_question_id: None,
            completed: false,
            started_at: Utc::now(),
            completed_at: None,
            max_questions,
        }
    }

    pub fn responses(&self) -> &[QuestionResponse] {
        &self.responses
    }

    pub fn question_count(&self) -> usize {
        self.responses.len()
    }

    pub fn max_questions(&self) -> usize {
        self.max_questions
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn has_answered(&self, question_id: &str) -> bool {
        self.responses.iter().any(|r| r.question_id == question_id)
    }

    /// Append a response, enforcing the terminal state and the response cap
    pub fn push_response(&mut self, response: QuestionResponse) -> Result<(), SessionBoundsError> {
        if self.completed {
            return Err(SessionBoundsError::Completed);
        }
        if self.responses.len() >= self.max_questions {
            return Err(SessionBoundsError::CapReached {
                max: self.max_questions,
            });
        }

        self.responses.push(response);
        self.current_question_id = None;
        Ok(())
    }

    /// Mark the session as completed. Calling this twice keeps the first timestamp.
    pub fn complete(&mut self) {
        if self.completed {
            return;
        }
        self.completed = true;
        self.completed_at = Some(Utc::now());
        self.current_question_id = None;
    }
}
