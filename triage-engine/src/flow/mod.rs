use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use triage_llm_sdk::types::Message;
use triage_types::{
    generate_typescript_definitions, GeneratedQuestion, Language, Question, QuestionResponse,
    Severity,
};

use crate::config::QuestionnaireConfig;
use crate::context::{self, INITIAL_QUESTION_ID};
use crate::emergency::{self, EMERGENCY_QUESTION_ID};
use crate::error::IntakeError;
use crate::gateway::{CapabilityTier, Gateway, GenerateOptions};
use crate::repair::{parse_structured, MalformedResponse};
use crate::severity::SeverityClassifier;

mod fallback;


/// Reply to a follow-up request. The model may also answer with a bare
/// question object.
#[derive(Deserialize)]
#[serde(untagged)]
enum NextQuestionReply {
    Bare(GeneratedQuestion),
    Envelope {
        #[serde(default)]
        complete: bool,
        #[serde(default)]
        question: Option<GeneratedQuestion>,
    },
}

/// What the gateway decided for the next turn
enum NextTurn {
    Ask(Question),
    Done,
}

/// Decides which question comes next.
///
/// Question generation never fails towards the caller: every gateway or
/// parse failure is absorbed with a fixed question.
pub struct QuestionFlow {
    gateway: Arc<Gateway>,
    classifier: Arc<SeverityClassifier>,
    settings: QuestionnaireConfig,
    system_prompt: String,
}

impl QuestionFlow {
    pub fn new(
        gateway: Arc<Gateway>,
        classifier: Arc<SeverityClassifier>,
        settings: QuestionnaireConfig,
    ) -> anyhow::Result<Self> {
        let type_definitions = generate_typescript_definitions(&[
            "GeneratedQuestion",
            "GeneratedOption",
            "AnswerContext",
        ])
        .map_err(|e| anyhow::anyhow!("Failed to generate TypeScript definitions: {}", e))?;

        Ok(Self {
            gateway,
            classifier,
            system_prompt: Self::generate_system_prompt(&type_definitions),
            settings,
        })
    }

    pub fn max_questions(&self) -> usize {
        self.settings.max_questions
    }

    fn generate_system_prompt(type_defs: &str) -> String {
        format!(
            r#"You are a medical intake assistant that interviews a patient one question at a time.

You respond exclusively in JSON using these TypeScript types:

<TYPE_DEFINITIONS>
{type_defs}
</TYPE_DEFINITIONS>

Your response MUST be an object of the form:
{{"complete": boolean, "question": GeneratedQuestion | null}}

Rules:
1. Ask exactly one question per turn, short and in plain language
2. Never repeat something the patient already answered
3. Prefer choice, scale or boolean questions over free text
4. Use "ai-single-choice" or "ai-multiple-choice" with "generateAnswers": true when the answer options depend on earlier answers
5. Use ids in lowercase snake_case; ids containing "severity", "pain" or "scale" must be numeric scales
6. Set "complete" to true and "question" to null once enough is known for an initial assessment
7. Do not diagnose and do not give advice in the question text
8. Return ONLY the JSON object, not wrapped in markdown code blocks"#
        )
    }

    async fn request_question(
        &self,
        prompt: String,
    ) -> Result<NextQuestionReply, IntakeError> {
        let messages = vec![
            Message::system(self.system_prompt.clone()),
            Message::user(prompt),
        ];
        let raw = self
            .gateway
            .generate(messages, CapabilityTier::Fast, GenerateOptions::structured())
            .await?;
        Ok(parse_structured(&raw)?)
    }

    async fn generate_initial(
        &self,
        language: Language,
        topic: Option<&str>,
    ) -> Result<Question, IntakeError> {
        let mut prompt = format!(
            "Start a new intake interview. Ask the patient for their main concern as an open \
             text question. Write the question in {}.\n",
            language.prompt_name()
        );
        if let Some(topic) = topic.map(str::trim).filter(|t| !t.is_empty()) {
            prompt.push_str(&format!("The patient selected the topic: {}\n", topic));
        }

        let generated = match self.request_question(prompt).await? {
            NextQuestionReply::Bare(question) => Some(question),
            NextQuestionReply::Envelope { question, .. } => question,
        };
        let mut generated = generated.ok_or(MalformedResponse::Empty)?;
        generated.id = INITIAL_QUESTION_ID.to_string();
        Ok(Question::try_from(generated)?)
    }

    /// The opening question. Always carries the well-known initial id.
    pub async fn issue_initial_question(&self, language: Language, topic: Option<&str>) -> Question {
        match self.generate_initial(language, topic).await {
            Ok(question) => question,
            Err(e) => {
                tracing::warn!(error = %e, "Initial question generation failed, using fallback");
                fallback::initial_question(language)
            }
        }
    }

    fn follow_up_prompt(
        &self,
        responses: &[QuestionResponse],
        question_count: usize,
        language: Language,
    ) -> String {
        let asked: Vec<&str> = responses.iter().map(|r| r.question_id.as_str()).collect();
        format!(
            "Patient answers so far:\n{}\n\nQuestion ids already used: {}\n\
             Questions asked: {} of at most {}.\n\
             Decide whether another question is needed. If so, write it in {}.",
            context::build(responses),
            asked.join(", "),
            question_count,
            self.settings.max_questions,
            language.prompt_name()
        )
    }

    async fn generate_next(
        &self,
        responses: &[QuestionResponse],
        question_count: usize,
        language: Language,
    ) -> Result<NextTurn, IntakeError> {
        let prompt = self.follow_up_prompt(responses, question_count, language);
        let generated = match self.request_question(prompt).await? {
            NextQuestionReply::Bare(question) => question,
            NextQuestionReply::Envelope {
                question: Some(question),
                ..
            } => question,
            NextQuestionReply::Envelope {
                complete: true,
                question: None,
            } => return Ok(NextTurn::Done),
            NextQuestionReply::Envelope {
                complete: false,
                question: None,
            } => return Err(MalformedResponse::Empty.into()),
        };

        let mut question = Question::try_from(generated)?;
        question.id = unique_id(&question.id, responses);
        Ok(NextTurn::Ask(question))
    }

    /// Next follow-up question, or `None` once the cap is reached or no more
    /// information is needed.
    pub async fn issue_next_question(
        &self,
        responses: &[QuestionResponse],
        question_count: usize,
        language: Language,
    ) -> Option<Question> {
        if question_count >= self.settings.max_questions {
            tracing::info!(question_count, "Question cap reached");
            return None;
        }

        match self.generate_next(responses, question_count, language).await {
            Ok(NextTurn::Ask(question)) => Some(question),
            Ok(NextTurn::Done) => {
                tracing::info!(question_count, "Gateway requested no further questions");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "Follow-up question generation failed, using fallback");
                fallback::follow_up_questions(language)
                    .into_iter()
                    .find(|question| !responses.iter().any(|r| r.question_id == question.id))
            }
        }
    }

    /// Whether the fixed red-flag question should be asked now: not asked
    /// yet, room left under the cap, and either enough answers collected or
    /// the answers already look severe.
    pub fn should_issue_emergency_question(&self, responses: &[QuestionResponse]) -> bool {
        if responses
            .iter()
            .any(|r| r.question_id == EMERGENCY_QUESTION_ID)
        {
            return false;
        }
        if responses.len() >= self.settings.max_questions {
            return false;
        }

        responses.len() >= self.settings.emergency_check_after
            || self.classifier.classify(responses) >= Severity::Severe
    }

    pub fn issue_emergency_question(&self, language: Language) -> Question {
        emergency::emergency_question(language)
    }
}

/// `id`, suffixed until it collides with neither an answered nor a reserved id
fn unique_id(id: &str, responses: &[QuestionResponse]) -> String {
    let taken: HashSet<&str> = responses
        .iter()
        .map(|r| r.question_id.as_str())
        .chain([INITIAL_QUESTION_ID, EMERGENCY_QUESTION_ID])
        .collect();

    if !taken.contains(id) {
        return id.to_string();
    }
    (2..)
        .map(|n| format!("{}_{}", id, n))
        .find(|candidate| !taken.contains(candidate.as_str()))
        .unwrap_or_else(|| id.to_string())
}
