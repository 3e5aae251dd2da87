use triage_types::{QuestionResponse, Severity};

use crate::config::KeywordConfig;

const SCALE_ID_MARKERS: [&str; 3] = ["severity", "pain", "scale"];

/// Coarse severity from the numeric scale answer, falling back to keywords.
///
/// Never yields `Severity::Emergency`; that bucket belongs to the
/// emergency detector.
pub struct SeverityClassifier {
    severe: Vec<String>,
    moderate: Vec<String>,
}

impl SeverityClassifier {
    pub fn new(config: &KeywordConfig) -> Self {
        Self {
            severe: KeywordConfig::all_languages(&config.severe),
            moderate: KeywordConfig::all_languages(&config.moderate),
        }
    }

    /// Numeric answer to the first severity/pain/scale question, if any
    fn scale_score(responses: &[QuestionResponse]) -> Option<f64> {
        responses.iter().find_map(|response| {
            let id = response.question_id.to_lowercase();
            if SCALE_ID_MARKERS.iter().any(|marker| id.contains(marker)) {
                response.answer.as_number()
            } else {
                None
            }
        })
    }

    fn from_score(score: f64) -> Severity {
        if score >= 8.0 {
            Severity::Severe
        } else if score >= 6.0 {
            Severity::Moderate
        } else {
            Severity::Mild
        }
    }

    pub fn classify(&self, responses: &[QuestionResponse]) -> Severity {
        if let Some(score) = Self::scale_score(responses) {
            return Self::from_score(score);
        }

        let texts: Vec<String> = responses
            .iter()
            .flat_map(|r| r.answer.strings())
            .map(str::to_lowercase)
            .collect();
        let mentions = |keywords: &[String]| {
            keywords
                .iter()
                .any(|k| texts.iter().any(|text| text.contains(k.as_str())))
        };

        if mentions(&self.severe) {
            Severity::Severe
        } else if mentions(&self.moderate) {
            Severity::Moderate
        } else {
            Severity::Mild
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> SeverityClassifier {
        SeverityClassifier::new(&KeywordConfig::default())
    }

    #[test]
    fn test_scale_score_is_monotonic() {
        let classifier = classifier();
        let classify = |score: f64| {
            classifier.classify(&[QuestionResponse::new("severity_scale", score)])
        };

        assert_eq!(classify(9.0), Severity::Severe);
        assert_eq!(classify(8.0), Severity::Severe);
        assert_eq!(classify(7.0), Severity::Moderate);
        assert_eq!(classify(6.0), Severity::Moderate);
        assert_eq!(classify(3.0), Severity::Mild);
        assert_eq!(classify(2.0), Severity::Mild);
    }

    #[test]
    fn test_scale_score_ignores_other_responses() {
        let responses = vec![
            QuestionResponse::new("initial_symptom", "the worst, unbearable headache"),
            QuestionResponse::new("pain_level", 2.0),
        ];
        assert_eq!(classifier().classify(&responses), Severity::Mild);

        let responses = vec![
            QuestionResponse::new("initial_symptom", "slight itch"),
            QuestionResponse::new("Pain_Scale", "9"),
        ];
        assert_eq!(classifier().classify(&responses), Severity::Severe);
    }

    #[test]
    fn test_non_numeric_scale_answer_falls_through_to_keywords() {
        let responses = vec![
            QuestionResponse::new("pain_character", "dull"),
            QuestionResponse::new("initial_symptom", "persistent cough"),
        ];
        assert_eq!(classifier().classify(&responses), Severity::Moderate);
    }

    #[test]
    fn test_severe_keywords_win_over_moderate() {
        let responses = vec![
            QuestionResponse::new("initial_symptom", "persistent and excruciating back ache"),
        ];
        assert_eq!(classifier().classify(&responses), Severity::Severe);
    }

    #[test]
    fn test_german_keywords() {
        let responses = vec![QuestionResponse::new("initial_symptom", "Unerträgliche Kopfschmerzen")];
        assert_eq!(classifier().classify(&responses), Severity::Severe);
    }

    #[test]
    fn test_defaults_to_mild() {
        let responses = vec![QuestionResponse::new("initial_symptom", "mild headache for an hour")];
        assert_eq!(classifier().classify(&responses), Severity::Mild);
        assert_eq!(classifier().classify(&[]), Severity::Mild);
    }
}
