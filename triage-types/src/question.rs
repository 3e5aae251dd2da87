// Question types shared between the engine, the gateway prompts and the UI

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;
use ts_rs::TS;

/// A single prompt shown to the user.
///
/// The kind-specific payload (options, numeric bounds, answer hints, upload
/// settings) lives in [`QuestionKind`], so every consumer has to match on the
/// kind explicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    /// Identifier, stable within a session
    pub id: String,
    /// Question text displayed to the user
    pub text: String,
    /// Additional help text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub description: Option<String>,
    /// Whether an answer is required to continue
    #[serde(default = "default_required")]
    pub required: bool,
    /// Placeholder for free-text inputs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub placeholder: Option<String>,
    /// Kind of question and its kind-specific payload
    #[serde(flatten)]
    pub kind: QuestionKind,
}

fn default_required() -> bool {
    true
}

/// Type of question and its expected response format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum QuestionKind {
    /// Multiple answers from a fixed option list
    MultipleChoice { options: Vec<QuestionOption> },
    /// One answer from a fixed option list
    SingleChoice { options: Vec<QuestionOption> },
    /// Free text input
    Text,
    /// Numeric input
    Number {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        #[ts(optional)]
        min: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        #[ts(optional)]
        max: Option<f64>,
    },
    /// Yes/No question
    Boolean,
    /// Numeric rating scale
    Scale { min: f64, max: f64 },
    /// Body region picker
    BodyPart { options: Vec<QuestionOption> },
    /// Single choice whose options are produced by the gateway
    AiSingleChoice {
        #[serde(default)]
        options: Vec<QuestionOption>,
        #[serde(rename = "answerContext")]
        #[serde(default, skip_serializing_if = "Option::is_none")]
        #[ts(optional, rename = "answerContext")]
        answer_context: Option<AnswerContext>,
    },
    /// Multiple choice whose options are produced by the gateway
    AiMultipleChoice {
        #[serde(default)]
        options: Vec<QuestionOption>,
        #[serde(rename = "answerContext")]
        #[serde(default, skip_serializing_if = "Option::is_none")]
        #[ts(optional, rename = "answerContext")]
        answer_context: Option<AnswerContext>,
    },
    /// Free text question generated by the gateway
    AiText {
        #[serde(rename = "answerContext")]
        #[serde(default, skip_serializing_if = "Option::is_none")]
        #[ts(optional, rename = "answerContext")]
        answer_context: Option<AnswerContext>,
    },
    /// Photo upload, analyzed by the image analysis collaborator
    ImageUpload {
        #[serde(rename = "imageUpload", default)]
        #[ts(rename = "imageUpload")]
        config: ImageUploadConfig,
    },
}

/// One selectable answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct QuestionOption {
    pub id: String,
    pub label: String,
    pub value: String,
}

impl QuestionOption {
    pub fn new(id: impl Into<String>, label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            value: value.into(),
        }
    }
}

/// Hints used when options are generated dynamically
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct AnswerContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub body_part: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub symptom_category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub max_options: Option<usize>,
}

/// Settings for an image upload question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ImageUploadConfig {
    /// Accepted media types, e.g. "image/jpeg"
    pub accepted_media_types: Vec<String>,
    pub max_size_bytes: u64,
    /// Category forwarded to the image analysis collaborator (skin, wound, eye, ...)
    pub image_category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub analysis_prompt: Option<String>,
}

impl Default for ImageUploadConfig {
    fn default() -> Self {
        Self {
            accepted_media_types: vec![
                "image/jpeg".to_string(),
                "image/png".to_string(),
                "image/webp".to_string(),
            ],
            max_size_bytes: 10 * 1024 * 1024,
            image_category: "general".to_string(),
            analysis_prompt: None,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum QuestionError {
    #[error("Unknown question type: {0}")]
    UnknownKind(String),

    #[error("Invalid question '{id}': {message}")]
    Invalid { id: String, message: String },
}

impl QuestionError {
    fn invalid(id: &str, message: impl Into<String>) -> Self {
        Self::Invalid {
            id: id.to_string(),
            message: message.into(),
        }
    }
}

impl Question {
    pub fn new(id: impl Into<String>, text: impl Into<String>, kind: QuestionKind) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            description: None,
            required: true,
            placeholder: None,
            kind,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    /// Wire name of the kind, as used in the `type` tag
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            QuestionKind::MultipleChoice { .. } => "multiple-choice",
            QuestionKind::SingleChoice { .. } => "single-choice",
            QuestionKind::Text => "text",
            QuestionKind::Number { .. } => "number",
            QuestionKind::Boolean => "boolean",
            QuestionKind::Scale { .. } => "scale",
            QuestionKind::BodyPart { .. } => "body-part",
            QuestionKind::AiSingleChoice { .. } => "ai-single-choice",
            QuestionKind::AiMultipleChoice { .. } => "ai-multiple-choice",
            QuestionKind::AiText { .. } => "ai-text",
            QuestionKind::ImageUpload { .. } => "image-upload",
        }
    }

    pub fn options(&self) -> &[QuestionOption] {
        match &self.kind {
            QuestionKind::MultipleChoice { options }
            | QuestionKind::SingleChoice { options }
            | QuestionKind::BodyPart { options }
            | QuestionKind::AiSingleChoice { options, .. }
            | QuestionKind::AiMultipleChoice { options, .. } => options,
            QuestionKind::Text
            | QuestionKind::Number { .. }
            | QuestionKind::Boolean
            | QuestionKind::Scale { .. }
            | QuestionKind::AiText { .. }
            | QuestionKind::ImageUpload { .. } => &[],
        }
    }

    pub fn answer_context(&self) -> Option<&AnswerContext> {
        match &self.kind {
            QuestionKind::AiSingleChoice { answer_context, .. }
            | QuestionKind::AiMultipleChoice { answer_context, .. }
            | QuestionKind::AiText { answer_context } => answer_context.as_ref(),
            _ => None,
        }
    }

    /// Whether several options may be selected at once
    pub fn allows_multiple(&self) -> bool {
        matches!(
            self.kind,
            QuestionKind::MultipleChoice { .. } | QuestionKind::AiMultipleChoice { .. }
        )
    }

    /// Whether the options of this question still have to be generated
    pub fn generate_answers(&self) -> bool {
        match &self.kind {
            QuestionKind::AiSingleChoice { options, .. }
            | QuestionKind::AiMultipleChoice { options, .. } => options.is_empty(),
            _ => false,
        }
    }

    /// Replace the options of a dynamically answered question.
    ///
    /// Kinds without generated options are returned unchanged.
    pub fn with_generated_options(mut self, generated: Vec<QuestionOption>) -> Self {
        match &mut self.kind {
            QuestionKind::AiSingleChoice { options, .. }
            | QuestionKind::AiMultipleChoice { options, .. } => *options = generated,
            _ => {}
        }
        self
    }

    /// Validate identifiers, text, option uniqueness and numeric bounds
    pub fn validate(&self) -> Result<(), QuestionError> {
        if self.id.trim().is_empty() {
            return Err(QuestionError::invalid(&self.id, "empty id"));
        }
        if self.text.trim().is_empty() {
            return Err(QuestionError::invalid(&self.id, "empty text"));
        }

        let mut labels = HashSet::new();
        let mut values = HashSet::new();
        for option in self.options() {
            if !labels.insert(option.label.as_str()) {
                return Err(QuestionError::invalid(
                    &self.id,
                    format!("duplicate option label '{}'", option.label),
                ));
            }
            if !values.insert(option.value.as_str()) {
                return Err(QuestionError::invalid(
                    &self.id,
                    format!("duplicate option value '{}'", option.value),
                ));
            }
        }

        match &self.kind {
            QuestionKind::MultipleChoice { options }
            | QuestionKind::SingleChoice { options }
            | QuestionKind::BodyPart { options }
                if options.is_empty() =>
            {
                Err(QuestionError::invalid(
                    &self.id,
                    format!("{} requires at least one option", self.kind_name()),
                ))
            }
            QuestionKind::Scale { min, max } if min > max => {
                Err(QuestionError::invalid(&self.id, "min is greater than max"))
            }
            QuestionKind::Number {
                min: Some(min),
                max: Some(max),
            } if min > max => Err(QuestionError::invalid(&self.id, "min is greater than max")),
            _ => Ok(()),
        }
    }
}

/// Question as emitted by the gateway: a flat object with a string type tag.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedQuestion {
    pub id: String,
    /// One of: multiple-choice, single-choice, text, number, boolean, scale,
    /// body-part, ai-single-choice, ai-multiple-choice, ai-text, image-upload
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub required: Option<bool>,
    #[serde(default)]
    pub options: Vec<GeneratedOption>,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub placeholder: Option<String>,
    #[serde(default)]
    pub generate_answers: bool,
    #[serde(default)]
    pub answer_context: Option<AnswerContext>,
}

/// Option as emitted by the gateway; only the label is mandatory.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct GeneratedOption {
    #[serde(default)]
    pub id: Option<String>,
    pub label: String,
    #[serde(default)]
    pub value: Option<String>,
}

/// Turn gateway-produced options into a clean option list.
///
/// Empty labels are dropped, missing ids and values are derived from the
/// label, duplicate labels or values are removed and the list is cut to
/// `max_options`.
pub fn sanitize_options(generated: Vec<GeneratedOption>, max_options: usize) -> Vec<QuestionOption> {
    let mut labels = HashSet::new();
    let mut values = HashSet::new();
    let mut ids = HashSet::new();
    let mut options = Vec::new();

    for option in generated {
        let label = option.label.trim().to_string();
        if label.is_empty() {
            continue;
        }

        let value = option
            .value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| slugify(&label));
        if labels.contains(&label.to_lowercase()) || values.contains(&value) {
            continue;
        }

        let mut id = option
            .id
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| value.clone());
        if ids.contains(&id) {
            id = format!("{}_{}", id, options.len() + 1);
        }

        labels.insert(label.to_lowercase());
        values.insert(value.clone());
        ids.insert(id.clone());
        options.push(QuestionOption { id, label, value });

        if options.len() >= max_options {
            break;
        }
    }

    options
}

/// Lowercase identifier made of alphanumerics and underscores
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut prev_underscore = true;
    for c in text.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
            prev_underscore = false;
        } else if !prev_underscore {
            slug.push('_');
            prev_underscore = true;
        }
    }
    while slug.ends_with('_') {
        slug.pop();
    }
    if slug.is_empty() {
        "option".to_string()
    } else {
        slug
    }
}

impl TryFrom<GeneratedQuestion> for Question {
    type Error = QuestionError;

    fn try_from(generated: GeneratedQuestion) -> Result<Self, Self::Error> {
        let normalized = generated.kind.trim().to_lowercase().replace(['_', ' '], "-");
        let options = sanitize_options(generated.options, usize::MAX);
        let answer_context = generated.answer_context;
        let needs_generation = generated.generate_answers || options.is_empty();

        let kind = match normalized.as_str() {
            "multiple-choice" | "multiselect" if needs_generation => {
                QuestionKind::AiMultipleChoice {
                    options: if generated.generate_answers { Vec::new() } else { options },
                    answer_context,
                }
            }
            "multiple-choice" | "multiselect" => QuestionKind::MultipleChoice { options },
            "single-choice" | "select" | "body-part" | "body-part-selector"
                if needs_generation =>
            {
                QuestionKind::AiSingleChoice {
                    options: if generated.generate_answers { Vec::new() } else { options },
                    answer_context,
                }
            }
            "single-choice" | "select" => QuestionKind::SingleChoice { options },
            "body-part" | "body-part-selector" => QuestionKind::BodyPart { options },
            "ai-single-choice" => QuestionKind::AiSingleChoice {
                options: if generated.generate_answers { Vec::new() } else { options },
                answer_context,
            },
            "ai-multiple-choice" => QuestionKind::AiMultipleChoice {
                options: if generated.generate_answers { Vec::new() } else { options },
                answer_context,
            },
            "text" | "free-text" => QuestionKind::Text,
            "ai-text" => QuestionKind::AiText { answer_context },
            "number" | "numeric" => QuestionKind::Number {
                min: generated.min,
                max: generated.max,
            },
            "boolean" | "yes-no" => QuestionKind::Boolean,
            "scale" => QuestionKind::Scale {
                min: generated.min.unwrap_or(1.0),
                max: generated.max.unwrap_or(10.0),
            },
            "image-upload" | "image" => QuestionKind::ImageUpload {
                config: ImageUploadConfig::default(),
            },
            other => return Err(QuestionError::UnknownKind(other.to_string())),
        };

        let question = Question {
            id: generated.id.trim().to_string(),
            text: generated.text.trim().to_string(),
            description: generated.description.filter(|d| !d.trim().is_empty()),
            required: generated.required.unwrap_or(true),
            placeholder: generated.placeholder.filter(|p| !p.trim().is_empty()),
            kind,
        };
        question.validate()?;
        Ok(question)
    }
}
