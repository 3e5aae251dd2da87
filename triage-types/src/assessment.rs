use serde::{Deserialize, Serialize};
use std::str::FromStr;
use ts_rs::TS;

/// Coarse severity bucket, ordered from least to most urgent
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Mild,
    Moderate,
    Severe,
    Emergency,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Mild => "mild",
            Severity::Moderate => "moderate",
            Severity::Severe => "severe",
            Severity::Emergency => "emergency",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mild" | "low" | "leicht" => Ok(Severity::Mild),
            "moderate" | "medium" | "mittel" | "mäßig" => Ok(Severity::Moderate),
            "severe" | "high" | "schwer" => Ok(Severity::Severe),
            "emergency" | "critical" | "notfall" => Ok(Severity::Emergency),
            other => Err(format!("Unknown severity: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PossibleCondition {
    pub name: String,
    /// Likelihood in [0, 1]
    pub probability: f64,
    pub description: String,
}

/// Terminal output of a questionnaire.
///
/// When `emergency_warning` is set, `severity` is `Emergency` and
/// `possible_conditions` is empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentResult {
    pub severity: Severity,
    pub possible_conditions: Vec<PossibleCondition>,
    pub recommendations: Vec<String>,
    pub emergency_warning: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub emergency_message: Option<String>,
    pub follow_up_advice: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub red_flags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub self_care: Option<Vec<String>>,
}

impl AssessmentResult {
    pub fn is_emergency(&self) -> bool {
        self.emergency_warning
    }

    /// Check the emergency invariant
    pub fn is_consistent(&self) -> bool {
        !self.emergency_warning
            || (self.severity == Severity::Emergency && self.possible_conditions.is_empty())
    }
}

/// Assessment as requested from the gateway. Every field is optional because
/// truncated or partial output still has to be shaped into a result.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentPayload {
    /// One of: mild, moderate, severe, emergency
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub possible_conditions: Vec<ConditionPayload>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub emergency_warning: Option<bool>,
    #[serde(default)]
    pub emergency_message: Option<String>,
    #[serde(default)]
    pub follow_up_advice: Option<String>,
    #[serde(default)]
    pub red_flags: Option<Vec<String>>,
    #[serde(default)]
    pub self_care: Option<Vec<String>>,
}

impl AssessmentPayload {
    /// True when the payload carries no assessment content at all
    pub fn is_empty(&self) -> bool {
        self.severity.is_none()
            && self.possible_conditions.is_empty()
            && self.recommendations.is_empty()
            && self.follow_up_advice.is_none()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ConditionPayload {
    pub name: String,
    /// Likelihood between 0 and 1
    #[serde(default)]
    pub probability: Option<f64>,
    #[serde(default)]
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Mild < Severity::Moderate);
        assert!(Severity::Severe < Severity::Emergency);
    }

    #[test]
    fn test_severity_from_str_is_lenient() {
        assert_eq!("Moderate".parse::<Severity>().unwrap(), Severity::Moderate);
        assert_eq!(" SCHWER ".parse::<Severity>().unwrap(), Severity::Severe);
        assert!("unknown".parse::<Severity>().is_err());
    }

    #[test]
    fn test_payload_tolerates_missing_fields() {
        let payload: AssessmentPayload =
            serde_json::from_str(r#"{"possibleConditions": [{"name": "Tension headache"}]}"#)
                .unwrap();

        assert!(payload.severity.is_none());
        assert_eq!(payload.possible_conditions[0].name, "Tension headache");
        assert!(payload.possible_conditions[0].probability.is_none());
        assert!(!payload.is_empty());
        assert!(AssessmentPayload::default().is_empty());
    }

    #[test]
    fn test_emergency_invariant_check() {
        let result = AssessmentResult {
            severity: Severity::Severe,
            possible_conditions: vec![],
            recommendations: vec![],
            emergency_warning: true,
            emergency_message: None,
            follow_up_advice: String::new(),
            red_flags: None,
            self_care: None,
        };
        assert!(!result.is_consistent());
    }
}
