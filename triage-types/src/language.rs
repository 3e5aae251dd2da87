use serde::{Deserialize, Serialize};
use std::str::FromStr;
use ts_rs::TS;

/// Language a questionnaire is conducted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    De,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::En, Language::De];

    /// ISO 639-1 code
    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::De => "de",
        }
    }

    /// English name of the language, used inside prompts
    pub fn prompt_name(&self) -> &'static str {
        match self {
            Language::En => "English",
            Language::De => "German",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" | "eng" | "english" => Ok(Language::En),
            "de" | "deu" | "ger" | "german" | "deutsch" => Ok(Language::De),
            other => Err(format!("Unsupported language: {}", other)),
        }
    }
}
