use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use triage_llm_sdk::models;
use triage_llm_sdk::types::{ReasoningEffort, Verbosity};
use triage_types::{Language, DEFAULT_MAX_QUESTIONS};

/// Engine configuration.
///
/// Built-in defaults are layered under an optional TOML file and
/// `TRIAGE__*` environment variables, e.g. `TRIAGE__GATEWAY__OPENAI_API_KEY`
/// or `TRIAGE__QUESTIONNAIRE__MAX_QUESTIONS`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct IntakeConfig {
    pub questionnaire: QuestionnaireConfig,
    pub sessions: SessionConfig,
    pub tiers: TiersConfig,
    pub keywords: KeywordConfig,
    pub gateway: GatewayConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct QuestionnaireConfig {
    /// Maximum number of responses collected before the assessment
    pub max_questions: usize,
    /// Number of responses after which the emergency question is issued
    pub emergency_check_after: usize,
    /// Upper bound for generated answer options
    pub max_generated_options: usize,
}

impl Default for QuestionnaireConfig {
    fn default() -> Self {
        Self {
            max_questions: DEFAULT_MAX_QUESTIONS,
            emergency_check_after: 2,
            max_generated_options: 6,
        }
    }
}

/// How long sessions are kept in memory without activity
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Unfinished sessions are dropped after this many idle seconds
    pub idle_timeout_secs: u64,
    /// Completed sessions keep their result for this many seconds
    pub completed_retention_secs: u64,
}

impl SessionConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn completed_retention(&self) -> Duration {
        Duration::from_secs(self.completed_retention_secs)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: 30 * 60,
            completed_retention_secs: 5 * 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TiersConfig {
    pub fast: TierConfig,
    pub deep: TierConfig,
}

impl Default for TiersConfig {
    fn default() -> Self {
        Self {
            fast: TierConfig {
                model: models::openai::GPT_5_MINI_ID.to_string(),
                max_tokens: 2000,
                reasoning_effort: Some(ReasoningEffort::Low),
                verbosity: Some(Verbosity::Low),
                temperature: None,
            },
            deep: TierConfig {
                model: models::openai::GPT_5_ID.to_string(),
                max_tokens: 6000,
                reasoning_effort: Some(ReasoningEffort::High),
                verbosity: Some(Verbosity::Medium),
                temperature: None,
            },
        }
    }
}

/// Model and budget used for one capability tier
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TierConfig {
    pub model: String,
    pub max_tokens: u32,
    #[serde(default)]
    pub reasoning_effort: Option<ReasoningEffort>,
    #[serde(default)]
    pub verbosity: Option<Verbosity>,
    #[serde(default)]
    pub temperature: Option<f32>,
}

/// Keyword lists keyed by language code ("en", "de")
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct KeywordConfig {
    pub emergency: BTreeMap<String, Vec<String>>,
    pub severe: BTreeMap<String, Vec<String>>,
    pub moderate: BTreeMap<String, Vec<String>>,
}

impl KeywordConfig {
    /// Lowercased keywords of every language in `lists`
    pub fn all_languages(lists: &BTreeMap<String, Vec<String>>) -> Vec<String> {
        let mut keywords: Vec<String> = lists
            .values()
            .flatten()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        keywords.sort();
        keywords.dedup();
        keywords
    }

    pub fn emergency_for(&self, language: Language) -> &[String] {
        self.emergency
            .get(language.code())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

fn keyword_map(en: &[&str], de: &[&str]) -> BTreeMap<String, Vec<String>> {
    BTreeMap::from([
        (
            Language::En.code().to_string(),
            en.iter().map(|s| s.to_string()).collect(),
        ),
        (
            Language::De.code().to_string(),
            de.iter().map(|s| s.to_string()).collect(),
        ),
    ])
}

impl Default for KeywordConfig {
    fn default() -> Self {
        Self {
            emergency: keyword_map(
                &[
                    "chest pain",
                    "difficulty breathing",
                    "shortness of breath",
                    "can't breathe",
                    "cannot breathe",
                    "severe pain",
                    "unconscious",
                    "loss of consciousness",
                    "passed out",
                    "fainted",
                    "stroke",
                    "heart attack",
                    "severe bleeding",
                    "bleeding heavily",
                    "suicidal",
                    "suicide",
                    "kill myself",
                    "overdose",
                    "anaphylaxis",
                    "severe allergic reaction",
                ],
                &[
                    "brustschmerz",
                    "atemnot",
                    "schwer atmen",
                    "keine luft",
                    "starke schmerzen",
                    "bewusstlos",
                    "bewusstseinsverlust",
                    "ohnmacht",
                    "schlaganfall",
                    "herzinfarkt",
                    "starke blutung",
                    "suizid",
                    "selbstmord",
                    "mich umbringen",
                    "überdosis",
                    "allergischer schock",
                    "anaphylaxie",
                ],
            ),
            severe: keyword_map(
                &["severe", "excruciating", "unbearable", "worst", "intense"],
                &["stark", "unerträglich", "schlimmste", "heftig", "extrem"],
            ),
            moderate: keyword_map(
                &[
                    "moderate",
                    "uncomfortable",
                    "persistent",
                    "bothersome",
                    "worsening",
                ],
                &["mäßig", "mittelstark", "anhaltend", "unangenehm", "zunehmend"],
            ),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub openai_api_key: Option<String>,
    pub base_url: Option<String>,
}

impl IntakeConfig {
    /// Load configuration from `path`, or from the default location when
    /// `path` is `None`. A missing file is not an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(get_config_path);
        tracing::debug!("Loading configuration from {}", path.display());

        let builder = Config::builder()
            .add_source(Config::try_from(&IntakeConfig::default())?)
            .add_source(File::from(path).required(false))
            .add_source(
                Environment::with_prefix("TRIAGE")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        let config: IntakeConfig = builder.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.questionnaire.max_questions == 0 {
            return Err(ConfigError::Message(
                "questionnaire.max_questions must be at least 1".to_string(),
            ));
        }
        if self.questionnaire.max_generated_options == 0 {
            return Err(ConfigError::Message(
                "questionnaire.max_generated_options must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Default configuration file location: `<config_dir>/triage/engine.toml`
pub fn get_config_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        config_dir.join("triage/engine.toml")
    } else {
        PathBuf::from("engine.toml")
    }
}
