use std::sync::Arc;
use triage_llm_sdk::types::Message;
use triage_types::{
    generate_typescript_definitions, AssessmentPayload, AssessmentResult, ConditionPayload,
    Language, PossibleCondition, QuestionResponse, Severity,
};

use crate::context;
use crate::emergency::EmergencyDetector;
use crate::error::IntakeError;
use crate::gateway::{CapabilityTier, Gateway, GenerateOptions};
use crate::repair::{parse_structured, MalformedResponse};
use crate::severity::SeverityClassifier;

mod defaults;


/// Produces the terminal assessment of a questionnaire.
///
/// Emergencies short-circuit without a gateway call. Every other failure is
/// surfaced as an [`IntakeError`]; no assessment is ever synthesized.
pub struct AssessmentEngine {
    gateway: Arc<Gateway>,
    detector: Arc<EmergencyDetector>,
    classifier: Arc<SeverityClassifier>,
    system_prompt: String,
}

impl AssessmentEngine {
    pub fn new(
        gateway: Arc<Gateway>,
        detector: Arc<EmergencyDetector>,
        classifier: Arc<SeverityClassifier>,
    ) -> anyhow::Result<Self> {
        let type_definitions =
            generate_typescript_definitions(&["AssessmentPayload", "ConditionPayload"])
                .map_err(|e| anyhow::anyhow!("Failed to generate TypeScript definitions: {}", e))?;

        Ok(Self {
            gateway,
            detector,
            classifier,
            system_prompt: Self::generate_system_prompt(&type_definitions),
        })
    }

    fn generate_system_prompt(type_defs: &str) -> String {
        format!(
            r#"You are a careful medical triage assistant. You read a patient's questionnaire answers and give a preliminary, non-diagnostic assessment.

Your entire response MUST be a single JSON object of type AssessmentPayload:

<TYPE_DEFINITIONS>
{type_defs}
</TYPE_DEFINITIONS>

Rules:
1. "severity" is one of: mild, moderate, severe, emergency
2. "possibleConditions" is ranked from most to least likely, at most 5 entries, "probability" between 0 and 1
3. "recommendations" are concrete next steps; "selfCare" only lists safe home measures
4. "redFlags" lists symptoms that should make the patient seek urgent care
5. "followUpAdvice" says when and where to seek medical help
6. If anything suggests a life-threatening situation, set "severity" to "emergency", "emergencyWarning" to true and leave "possibleConditions" empty
7. Never claim certainty; this does not replace a medical examination
8. Return ONLY the JSON object, not wrapped in markdown code blocks"#
        )
    }

    fn build_prompt(
        responses: &[QuestionResponse],
        severity: Severity,
        language: Language,
    ) -> String {
        format!(
            "Patient answers:\n{}\n\nPreliminary severity from the answers: {}\n\
             Write every text field in {}.",
            context::build(responses),
            severity,
            language.prompt_name()
        )
    }

    /// Assess a questionnaire.
    pub async fn analyze(
        &self,
        responses: &[QuestionResponse],
        language: Language,
    ) -> Result<AssessmentResult, IntakeError> {
        if self.detector.is_emergency(responses) {
            tracing::info!("Emergency detected, skipping gateway assessment");
            return Ok(self.emergency_result(responses, language));
        }

        let classified = self.classifier.classify(responses);
        let tier = CapabilityTier::for_severity(classified);
        tracing::info!(
            severity = %classified,
            tier = tier.as_str(),
            responses = responses.len(),
            "Requesting assessment"
        );

        let messages = vec![
            Message::system(self.system_prompt.clone()),
            Message::user(Self::build_prompt(responses, classified, language)),
        ];
        let raw = self
            .gateway
            .generate(messages, tier, GenerateOptions::structured())
            .await?;

        let payload: AssessmentPayload = parse_structured(&raw)?;
        if payload.is_empty() {
            return Err(MalformedResponse::Empty.into());
        }

        let result = self.shape(payload, classified, responses, language);
        tracing::info!(
            severity = %result.severity,
            conditions = result.possible_conditions.len(),
            emergency = result.emergency_warning,
            "Assessment complete"
        );
        Ok(result)
    }

    /// Terminal result for an emergency. Never lists conditions.
    pub fn emergency_result(
        &self,
        responses: &[QuestionResponse],
        language: Language,
    ) -> AssessmentResult {
        let signals = self.detector.signals(responses, language);
        let texts = defaults::texts(language);

        AssessmentResult {
            severity: Severity::Emergency,
            possible_conditions: Vec::new(),
            recommendations: texts
                .emergency_recommendations
                .iter()
                .map(|s| s.to_string())
                .collect(),
            emergency_warning: true,
            emergency_message: Some(texts.emergency_message.to_string()),
            follow_up_advice: texts.emergency_follow_up.to_string(),
            red_flags: (!signals.is_empty()).then_some(signals),
            self_care: None,
        }
    }

    fn shape(
        &self,
        payload: AssessmentPayload,
        classified: Severity,
        responses: &[QuestionResponse],
        language: Language,
    ) -> AssessmentResult {
        let reported = payload.severity.as_deref().and_then(|s| match s.parse::<Severity>() {
            Ok(severity) => Some(severity),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring unrecognized severity in assessment");
                None
            }
        });

        if payload.emergency_warning == Some(true) || reported == Some(Severity::Emergency) {
            tracing::warn!("Gateway flagged an emergency");
            let mut result = self.emergency_result(responses, language);
            if let Some(message) = non_empty(payload.emergency_message) {
                result.emergency_message = Some(message);
            }
            if let Some(flags) = payload.red_flags.map(clean_list).filter(|f| !f.is_empty()) {
                let mut merged = result.red_flags.take().unwrap_or_default();
                for flag in flags {
                    if !merged.contains(&flag) {
                        merged.push(flag);
                    }
                }
                result.red_flags = Some(merged);
            }
            return result;
        }

        let severity = reported.map_or(classified, |s| s.max(classified));
        let texts = defaults::texts(language);

        let mut recommendations = clean_list(payload.recommendations);
        if recommendations.is_empty() {
            recommendations = texts.recommendations.iter().map(|s| s.to_string()).collect();
        }

        let red_flags = payload
            .red_flags
            .map(clean_list)
            .filter(|flags| !flags.is_empty())
            .unwrap_or_else(|| texts.red_flags.iter().map(|s| s.to_string()).collect());

        let self_care = payload
            .self_care
            .map(clean_list)
            .filter(|items| !items.is_empty())
            .unwrap_or_else(|| texts.self_care.iter().map(|s| s.to_string()).collect());

        AssessmentResult {
            severity,
            possible_conditions: rank_conditions(payload.possible_conditions),
            recommendations,
            emergency_warning: false,
            emergency_message: None,
            follow_up_advice: non_empty(payload.follow_up_advice)
                .unwrap_or_else(|| texts.follow_up.to_string()),
            red_flags: Some(red_flags),
            self_care: Some(self_care),
        }
    }
}

fn non_empty(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .filter_map(|item| non_empty(Some(item)))
        .collect()
}

/// Probabilities given as percentages are scaled down, then clamped to [0, 1]
fn normalize_probability(probability: Option<f64>) -> f64 {
    match probability {
        Some(p) if p.is_nan() => 0.0,
        Some(p) if p > 1.0 && p <= 100.0 => p / 100.0,
        Some(p) => p.clamp(0.0, 1.0),
        None => 0.0,
    }
}

/// Drop unnamed conditions and order by probability, most likely first
fn rank_conditions(conditions: Vec<ConditionPayload>) -> Vec<PossibleCondition> {
    let mut ranked: Vec<PossibleCondition> = conditions
        .into_iter()
        .filter_map(|condition| {
            let name = condition.name.trim().to_string();
            if name.is_empty() {
                return None;
            }
            Some(PossibleCondition {
                name,
                probability: normalize_probability(condition.probability),
                description: condition
                    .description
                    .map(|d| d.trim().to_string())
                    .unwrap_or_default(),
            })
        })
        .collect();

    ranked.sort_by(|a, b| b.probability.total_cmp(&a.probability));
    ranked
}
