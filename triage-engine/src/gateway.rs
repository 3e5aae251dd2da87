use std::sync::Arc;
use triage_llm_sdk::client::LlmClient;
use triage_llm_sdk::error::LlmError;
use triage_llm_sdk::types::{
    CompletionRequest, Message, ReasoningEffort, ResponseFormat, Verbosity,
};
use triage_types::Severity;

use crate::config::{TierConfig, TiersConfig};

/// Capability/cost level of a gateway call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapabilityTier {
    /// Low latency, smaller budget
    Fast,
    /// Higher token budget and deeper reasoning
    Deep,
}

impl CapabilityTier {
    /// Severe and emergency cases get the deep tier, everything else the fast one
    pub fn for_severity(severity: Severity) -> Self {
        match severity {
            Severity::Severe | Severity::Emergency => CapabilityTier::Deep,
            Severity::Mild | Severity::Moderate => CapabilityTier::Fast,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CapabilityTier::Fast => "fast",
            CapabilityTier::Deep => "deep",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Structured,
}

/// Per-call options. Anything left as `None` falls back to the tier defaults.
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
    pub output_format: OutputFormat,
    pub reasoning_effort: Option<ReasoningEffort>,
    pub verbosity: Option<Verbosity>,
}

impl GenerateOptions {
    pub fn structured() -> Self {
        Self {
            output_format: OutputFormat::Structured,
            ..Self::default()
        }
    }
}

/// Text-generation gateway on top of any [`LlmClient`]
pub struct Gateway {
    client: Arc<dyn LlmClient>,
    tiers: TiersConfig,
}

impl Gateway {
    pub fn new(client: Arc<dyn LlmClient>, tiers: TiersConfig) -> Self {
        Self { client, tiers }
    }

    fn tier_config(&self, tier: CapabilityTier) -> &TierConfig {
        match tier {
            CapabilityTier::Fast => &self.tiers.fast,
            CapabilityTier::Deep => &self.tiers.deep,
        }
    }

    fn build_request(
        &self,
        messages: Vec<Message>,
        tier: CapabilityTier,
        options: GenerateOptions,
    ) -> CompletionRequest {
        let tier_config = self.tier_config(tier);

        let model = if tier_config.model.is_empty() {
            self.client.model_name().to_string()
        } else {
            tier_config.model.clone()
        };

        CompletionRequest {
            messages,
            max_tokens: options.max_output_tokens.unwrap_or(tier_config.max_tokens),
            model,
            system: None,
            temperature: options.temperature.or(tier_config.temperature),
            response_format: Some(match options.output_format {
                OutputFormat::Text => ResponseFormat::Text,
                OutputFormat::Structured => ResponseFormat::JsonObject,
            }),
            reasoning_effort: options.reasoning_effort.or(tier_config.reasoning_effort),
            verbosity: options.verbosity.or(tier_config.verbosity),
        }
    }

    /// Send `messages` to the model configured for `tier` and return the raw text.
    ///
    /// The text is not guaranteed to be well-formed; truncated output is
    /// returned as-is.
    pub async fn generate(
        &self,
        messages: Vec<Message>,
        tier: CapabilityTier,
        options: GenerateOptions,
    ) -> Result<String, LlmError> {
        let request = self.build_request(messages, tier, options);

        tracing::info!(
            tier = tier.as_str(),
            model = %request.model,
            provider = self.client.provider_name(),
            "Calling text generation gateway"
        );
        for message in &request.messages {
            tracing::debug!(role = %message.role, "Prompt:\n{}", message.content);
        }

        let response = self.client.complete(request).await?;

        tracing::debug!(
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "Raw gateway response:\n{}",
            response.content
        );

        if response.is_truncated() {
            tracing::warn!(
                tier = tier.as_str(),
                "Gateway response was truncated at the token limit"
            );
        }

        if response.content.trim().is_empty() {
            return Err(LlmError::internal("Gateway returned an empty completion"));
        }

        Ok(response.content)
    }
}
