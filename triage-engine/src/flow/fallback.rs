use triage_types::{Language, Question, QuestionKind, QuestionOption};

use crate::context::{AGE_QUESTION_ID, GENDER_QUESTION_ID, INITIAL_QUESTION_ID};

pub(crate) const DURATION_QUESTION_ID: &str = "symptom_duration";
pub(crate) const SCALE_QUESTION_ID: &str = "severity_scale";
pub(crate) const ADDITIONAL_QUESTION_ID: &str = "additional_symptoms";

/// Canonical open-text opener, used whenever the gateway cannot produce one
pub(crate) fn initial_question(language: Language) -> Question {
    let (text, placeholder) = match language {
        Language::En => (
            "What is your main concern today?",
            "Describe your symptoms in your own words",
        ),
        Language::De => (
            "Was ist heute Ihr Hauptanliegen?",
            "Beschreiben Sie Ihre Beschwerden in eigenen Worten",
        ),
    };
    Question::new(INITIAL_QUESTION_ID, text, QuestionKind::Text).with_placeholder(placeholder)
}

fn options(entries: &[(&str, &str, &str)], language: Language) -> Vec<QuestionOption> {
    entries
        .iter()
        .map(|(value, en, de)| {
            let label = match language {
                Language::En => *en,
                Language::De => *de,
            };
            QuestionOption::new(*value, label, *value)
        })
        .collect()
}

fn duration_question(language: Language) -> Question {
    let text = match language {
        Language::En => "How long have you had these symptoms?",
        Language::De => "Seit wann haben Sie diese Beschwerden?",
    };
    let options = options(
        &[
            ("hours", "A few hours", "Einige Stunden"),
            ("days", "A few days", "Einige Tage"),
            ("weeks", "A few weeks", "Einige Wochen"),
            ("months", "Months or longer", "Monate oder länger"),
        ],
        language,
    );
    Question::new(DURATION_QUESTION_ID, text, QuestionKind::SingleChoice { options })
}

fn scale_question(language: Language) -> Question {
    let (text, description) = match language {
        Language::En => (
            "How severe are your symptoms right now?",
            "1 means barely noticeable, 10 means the worst you can imagine.",
        ),
        Language::De => (
            "Wie stark sind Ihre Beschwerden im Moment?",
            "1 bedeutet kaum spürbar, 10 bedeutet die schlimmsten vorstellbaren Beschwerden.",
        ),
    };
    Question::new(
        SCALE_QUESTION_ID,
        text,
        QuestionKind::Scale {
            min: 1.0,
            max: 10.0,
        },
    )
    .with_description(description)
}

fn age_question(language: Language) -> Question {
    let text = match language {
        Language::En => "How old are you?",
        Language::De => "Wie alt sind Sie?",
    };
    Question::new(
        AGE_QUESTION_ID,
        text,
        QuestionKind::Number {
            min: Some(0.0),
            max: Some(120.0),
        },
    )
}

fn gender_question(language: Language) -> Question {
    let text = match language {
        Language::En => "What is your gender?",
        Language::De => "Welches Geschlecht haben Sie?",
    };
    let options = options(
        &[
            ("female", "Female", "Weiblich"),
            ("male", "Male", "Männlich"),
            ("diverse", "Diverse", "Divers"),
            ("not_specified", "Prefer not to say", "Keine Angabe"),
        ],
        language,
    );
    Question::new(GENDER_QUESTION_ID, text, QuestionKind::SingleChoice { options })
}

fn additional_symptoms_question(language: Language) -> Question {
    let (text, placeholder) = match language {
        Language::En => (
            "Do you have any other symptoms?",
            "For example fever, nausea or dizziness",
        ),
        Language::De => (
            "Haben Sie weitere Beschwerden?",
            "Zum Beispiel Fieber, Übelkeit oder Schwindel",
        ),
    };
    let mut question = Question::new(ADDITIONAL_QUESTION_ID, text, QuestionKind::Text)
        .with_placeholder(placeholder);
    question.required = false;
    question
}

/// Fixed follow-up sequence, in the order it is asked when the gateway fails
pub(crate) fn follow_up_questions(language: Language) -> Vec<Question> {
    vec![
        duration_question(language),
        scale_question(language),
        age_question(language),
        gender_question(language),
        additional_symptoms_question(language),
    ]
}
