use triage_types::{Language, Question, QuestionKind, QuestionOption, QuestionResponse};

use crate::config::KeywordConfig;

/// Id of the fixed red-flag question
pub const EMERGENCY_QUESTION_ID: &str = "emergency_check";

/// Option value meaning "none of the above"
pub const NONE_SENTINEL: &str = "none";

const RED_FLAGS: &[(&str, &str, &str)] = &[
    ("chest_pain", "Chest pain or pressure", "Brustschmerzen oder Druck auf der Brust"),
    (
        "breathing_difficulty",
        "Severe difficulty breathing",
        "Starke Atemnot",
    ),
    (
        "severe_bleeding",
        "Heavy bleeding that will not stop",
        "Starke, nicht stillbare Blutung",
    ),
    (
        "loss_of_consciousness",
        "Fainting or loss of consciousness",
        "Ohnmacht oder Bewusstlosigkeit",
    ),
    (
        "stroke_signs",
        "Sudden weakness, numbness, facial drooping or trouble speaking",
        "Plötzliche Lähmung, Taubheit, hängender Mundwinkel oder Sprachstörung",
    ),
    (
        "suicidal_thoughts",
        "Thoughts of harming yourself",
        "Gedanken, sich selbst etwas anzutun",
    ),
    (
        "severe_allergic_reaction",
        "Swelling of the face or throat after an allergen",
        "Schwellung von Gesicht oder Hals nach Allergenkontakt",
    ),
];

/// The fixed red-flag multi-select. Never generated, so it is available even
/// when the gateway is down.
pub fn emergency_question(language: Language) -> Question {
    let mut options: Vec<QuestionOption> = RED_FLAGS
        .iter()
        .map(|(value, en, de)| {
            let label = match language {
                Language::En => *en,
                Language::De => *de,
            };
            QuestionOption::new(*value, label, *value)
        })
        .collect();

    options.push(QuestionOption::new(
        NONE_SENTINEL,
        match language {
            Language::En => "None of the above",
            Language::De => "Nichts davon",
        },
        NONE_SENTINEL,
    ));

    let (text, description) = match language {
        Language::En => (
            "Are you currently experiencing any of the following?",
            "Select all that apply.",
        ),
        Language::De => (
            "Haben Sie derzeit eines der folgenden Symptome?",
            "Wählen Sie alles Zutreffende aus.",
        ),
    };

    Question::new(
        EMERGENCY_QUESTION_ID,
        text,
        QuestionKind::MultipleChoice { options },
    )
    .with_description(description)
}

fn red_flag_label(value: &str, language: Language) -> Option<&'static str> {
    RED_FLAGS
        .iter()
        .find(|(v, _, _)| *v == value)
        .map(|(_, en, de)| match language {
            Language::En => *en,
            Language::De => *de,
        })
}

fn is_none_sentinel(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case(NONE_SENTINEL)
}

/// Two-stage emergency check: the answer to the red-flag question, then a
/// keyword scan over every string answer.
///
/// There is no negation handling; "no chest pain" still matches.
pub struct EmergencyDetector {
    keywords: Vec<String>,
}

impl EmergencyDetector {
    pub fn new(config: &KeywordConfig) -> Self {
        Self {
            keywords: KeywordConfig::all_languages(&config.emergency),
        }
    }

    pub fn is_emergency(&self, responses: &[QuestionResponse]) -> bool {
        Self::structural_hit(responses) || self.lexical_hit(responses)
    }

    /// Red-flag options selected on the emergency question, "none" excluded
    fn selected_red_flags(responses: &[QuestionResponse]) -> Vec<&str> {
        responses
            .iter()
            .filter(|r| r.question_id == EMERGENCY_QUESTION_ID)
            .flat_map(|r| r.answer.strings())
            .filter(|value| !value.trim().is_empty() && !is_none_sentinel(value))
            .collect()
    }

    pub fn structural_hit(responses: &[QuestionResponse]) -> bool {
        !Self::selected_red_flags(responses).is_empty()
    }

    fn matched_keywords<'a>(&'a self, responses: &[QuestionResponse]) -> Vec<&'a str> {
        let texts: Vec<String> = responses
            .iter()
            .flat_map(|r| r.answer.strings())
            .map(str::to_lowercase)
            .collect();

        self.keywords
            .iter()
            .filter(|keyword| texts.iter().any(|text| text.contains(keyword.as_str())))
            .map(String::as_str)
            .collect()
    }

    pub fn lexical_hit(&self, responses: &[QuestionResponse]) -> bool {
        !self.matched_keywords(responses).is_empty()
    }

    /// Human-readable list of what triggered the emergency, for the result's red flags
    pub fn signals(&self, responses: &[QuestionResponse], language: Language) -> Vec<String> {
        let mut signals: Vec<String> = Self::selected_red_flags(responses)
            .into_iter()
            .map(|value| {
                red_flag_label(value, language)
                    .map(str::to_string)
                    .unwrap_or_else(|| value.to_string())
            })
            .collect();

        for keyword in self.matched_keywords(responses) {
            if !signals.iter().any(|s| s.eq_ignore_ascii_case(keyword)) {
                signals.push(keyword.to_string());
            }
        }

        signals
    }
}
