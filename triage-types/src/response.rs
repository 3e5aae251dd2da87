use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// The user's answer to a question. Never null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(untagged)]
pub enum Answer {
    Boolean(bool),
    Number(f64),
    Text(String),
    List(Vec<String>),
}

impl Answer {
    /// Numeric value of the answer, accepting numeric strings as well
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Answer::Number(n) if n.is_finite() => Some(*n),
            Answer::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        }
    }

    /// Every string carried by the answer (the text itself or the list items)
    pub fn strings(&self) -> Vec<&str> {
        match self {
            Answer::Text(s) => vec![s.as_str()],
            Answer::List(items) => items.iter().map(String::as_str).collect(),
            Answer::Boolean(_) | Answer::Number(_) => Vec::new(),
        }
    }

    /// Single-line rendering used for prompt context. Lists are joined with ", ".
    pub fn flatten(&self) -> String {
        match self {
            Answer::Text(s) => s.clone(),
            Answer::Number(n) => format_number(*n),
            Answer::Boolean(true) => "yes".to_string(),
            Answer::Boolean(false) => "no".to_string(),
            Answer::List(items) => items.join(", "),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{:.0}", n)
    } else {
        n.to_string()
    }
}

impl From<&str> for Answer {
    fn from(value: &str) -> Self {
        Answer::Text(value.to_string())
    }
}

impl From<String> for Answer {
    fn from(value: String) -> Self {
        Answer::Text(value)
    }
}

impl From<f64> for Answer {
    fn from(value: f64) -> Self {
        Answer::Number(value)
    }
}

impl From<bool> for Answer {
    fn from(value: bool) -> Self {
        Answer::Boolean(value)
    }
}

impl From<Vec<String>> for Answer {
    fn from(value: Vec<String>) -> Self {
        Answer::List(value)
    }
}

/// One submitted answer. Immutable once appended to a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResponse {
    /// ID of the question being answered
    pub question_id: String,
    pub answer: Answer,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub image_data: Option<ImageData>,
}

impl QuestionResponse {
    pub fn new(question_id: impl Into<String>, answer: impl Into<Answer>) -> Self {
        Self {
            question_id: question_id.into(),
            answer: answer.into(),
            timestamp: Utc::now(),
            image_data: None,
        }
    }

    pub fn with_image(mut self, image_data: ImageData) -> Self {
        self.image_data = Some(image_data);
        self
    }
}

/// An uploaded image, already decoded by the surrounding application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ImageData {
    /// Base64 encoded image bytes
    pub payload: String,
    pub filename: String,
    pub size: u64,
    pub media_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub analysis_result: Option<ImageAnalysisResult>,
}

/// Output of the image analysis collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ImageAnalysisResult {
    pub analysis_text: String,
    #[serde(default)]
    pub findings: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    pub urgency_level: String,
    #[serde(default)]
    pub suggested_specialties: Vec<String>,
    pub confidence: f64,
}
