use serde::Deserialize;
use std::sync::Arc;
use triage_llm_sdk::types::Message;
use triage_types::{
    generate_typescript_definitions, sanitize_options, GeneratedOption, Language, Question,
    QuestionOption, QuestionResponse,
};

use crate::context;
use crate::error::IntakeError;
use crate::gateway::{CapabilityTier, Gateway, GenerateOptions};
use crate::repair::{parse_structured, MalformedResponse};

/// Accepts both `{"options": [...]}` and a bare array
#[derive(Deserialize)]
#[serde(untagged)]
enum OptionsReply {
    Wrapped { options: Vec<GeneratedOption> },
    Bare(Vec<GeneratedOption>),
}

impl OptionsReply {
    fn into_options(self) -> Vec<GeneratedOption> {
        match self {
            OptionsReply::Wrapped { options } | OptionsReply::Bare(options) => options,
        }
    }
}

/// Produces answer options for questions whose options are generated per session
pub struct AnswerGenerator {
    gateway: Arc<Gateway>,
    default_max_options: usize,
    system_prompt: String,
}

impl AnswerGenerator {
    pub fn new(gateway: Arc<Gateway>, default_max_options: usize) -> anyhow::Result<Self> {
        let type_definitions = generate_typescript_definitions(&["GeneratedOption"])
            .map_err(|e| anyhow::anyhow!("Failed to generate TypeScript definitions: {}", e))?;

        Ok(Self {
            gateway,
            default_max_options: default_max_options.max(1),
            system_prompt: Self::generate_system_prompt(&type_definitions),
        })
    }

    fn generate_system_prompt(type_defs: &str) -> String {
        format!(
            r#"You are a JSON API that proposes answer options for a medical intake question.

Your entire output MUST be a JSON object with a single field "options", an array of:

<TYPE_DEFINITIONS>
{type_defs}
</TYPE_DEFINITIONS>

Rules:
- Labels are short, patient-friendly and mutually distinct
- Values are lowercase snake_case identifiers
- Cover the common answers; add an "Other" or "Not sure" option when it helps
- Do not diagnose; only list possible answers to the question

Example:
Question: How would you describe the pain?
Output: {{"options": [{{"id": "sharp", "label": "Sharp", "value": "sharp"}}, {{"id": "dull", "label": "Dull", "value": "dull"}}]}}

Return ONLY the JSON object. No markdown, no code blocks."#
        )
    }

    fn build_prompt(
        &self,
        question: &Question,
        responses: &[QuestionResponse],
        language: Language,
        max_options: usize,
    ) -> String {
        let mut prompt = format!("Question: {}\n", question.text);
        if let Some(description) = &question.description {
            prompt.push_str(&format!("Help text: {}\n", description));
        }
        prompt.push_str(&format!(
            "Selection: {}\n",
            if question.allows_multiple() {
                "multiple answers allowed"
            } else {
                "exactly one answer"
            }
        ));

        if let Some(hints) = question.answer_context() {
            if let Some(body_part) = &hints.body_part {
                prompt.push_str(&format!("Body part: {}\n", body_part));
            }
            if let Some(category) = &hints.symptom_category {
                prompt.push_str(&format!("Symptom category: {}\n", category));
            }
        }

        prompt.push_str(&format!(
            "Maximum number of options: {}\nWrite the labels in {}.\n",
            max_options,
            language.prompt_name()
        ));

        let history = context::build(responses);
        if !history.is_empty() {
            prompt.push_str(&format!("\nPatient answers so far:\n{}\n", history));
        }

        prompt
    }

    fn max_options_for(&self, question: &Question) -> usize {
        question
            .answer_context()
            .and_then(|hints| hints.max_options)
            .filter(|max| *max > 0)
            .unwrap_or(self.default_max_options)
    }

    async fn request_options(
        &self,
        question: &Question,
        responses: &[QuestionResponse],
        language: Language,
        max_options: usize,
    ) -> Result<Vec<QuestionOption>, IntakeError> {
        let messages = vec![
            Message::system(self.system_prompt.clone()),
            Message::user(self.build_prompt(question, responses, language, max_options)),
        ];

        let raw = self
            .gateway
            .generate(messages, CapabilityTier::Fast, GenerateOptions::structured())
            .await?;

        let reply: OptionsReply = parse_structured(&raw)?;
        let options = sanitize_options(reply.into_options(), max_options);
        if options.is_empty() {
            return Err(MalformedResponse::Empty.into());
        }
        Ok(options)
    }

    /// Options for `question`. Questions that do not need generated options
    /// keep their own; gateway or parse failures yield a fixed fallback list.
    pub async fn generate_options(
        &self,
        question: &Question,
        responses: &[QuestionResponse],
        language: Language,
    ) -> Vec<QuestionOption> {
        if !question.generate_answers() {
            return question.options().to_vec();
        }

        let max_options = self.max_options_for(question);
        match self
            .request_options(question, responses, language, max_options)
            .await
        {
            Ok(options) => options,
            Err(e) => {
                tracing::warn!(
                    question_id = %question.id,
                    error = %e,
                    "Answer option generation failed, using fallback options"
                );
                fallback_options(language)
            }
        }
    }

    /// `question` with its generated options filled in
    pub async fn fill_options(
        &self,
        question: Question,
        responses: &[QuestionResponse],
        language: Language,
    ) -> Question {
        if !question.generate_answers() {
            return question;
        }
        let options = self.generate_options(&question, responses, language).await;
        question.with_generated_options(options)
    }
}

/// "Yes / No / Not sure" in the session language
pub fn fallback_options(language: Language) -> Vec<QuestionOption> {
    let labels = match language {
        Language::En => ["Yes", "No", "Not sure"],
        Language::De => ["Ja", "Nein", "Weiß nicht"],
    };

    ["yes", "no", "not_sure"]
        .iter()
        .zip(labels)
        .map(|(value, label)| QuestionOption::new(*value, label, *value))
        .collect()
}
