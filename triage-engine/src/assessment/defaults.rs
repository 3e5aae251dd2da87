use triage_types::Language;

/// Fixed wording used when the gateway leaves a field out, and for the
/// emergency short-circuit
pub(crate) struct AssessmentTexts {
    pub follow_up: &'static str,
    pub recommendations: &'static [&'static str],
    pub red_flags: &'static [&'static str],
    pub self_care: &'static [&'static str],
    pub emergency_message: &'static str,
    pub emergency_follow_up: &'static str,
    pub emergency_recommendations: &'static [&'static str],
}

const ENGLISH: AssessmentTexts = AssessmentTexts {
    follow_up: "Please consult a healthcare provider if your symptoms persist or get worse.",
    recommendations: &[
        "Monitor your symptoms and note any changes.",
        "Contact your doctor if you are unsure what to do.",
    ],
    red_flags: &[
        "Sudden worsening of your symptoms",
        "Chest pain, difficulty breathing or loss of consciousness",
    ],
    self_care: &["Rest and drink enough fluids."],
    emergency_message: "Your answers indicate a possible medical emergency. Call the emergency \
                        number 112 now or go to the nearest emergency department.",
    emergency_follow_up: "Do not wait for your symptoms to improve. Seek emergency care immediately.",
    emergency_recommendations: &[
        "Call the emergency number 112 immediately.",
        "Do not drive yourself to the hospital.",
        "Stay with someone until help arrives.",
    ],
};

const GERMAN: AssessmentTexts = AssessmentTexts {
    follow_up: "Bitte wenden Sie sich an eine Ärztin oder einen Arzt, wenn die Beschwerden \
                anhalten oder sich verschlimmern.",
    recommendations: &[
        "Beobachten Sie Ihre Beschwerden und notieren Sie Veränderungen.",
        "Kontaktieren Sie Ihre Hausarztpraxis, wenn Sie unsicher sind.",
    ],
    red_flags: &[
        "Plötzliche Verschlechterung der Beschwerden",
        "Brustschmerzen, Atemnot oder Bewusstlosigkeit",
    ],
    self_care: &["Ruhen Sie sich aus und trinken Sie ausreichend."],
    emergency_message: "Ihre Angaben deuten auf einen möglichen medizinischen Notfall hin. Rufen \
                        Sie jetzt den Notruf 112 oder suchen Sie die nächste Notaufnahme auf.",
    emergency_follow_up: "Warten Sie nicht ab, ob sich die Beschwerden bessern. Suchen Sie sofort \
                          Notfallhilfe.",
    emergency_recommendations: &[
        "Rufen Sie sofort den Notruf 112.",
        "Fahren Sie nicht selbst ins Krankenhaus.",
        "Bleiben Sie nicht allein, bis Hilfe eintrifft.",
    ],
};

pub(crate) fn texts(language: Language) -> &'static AssessmentTexts {
    match language {
        Language::En => &ENGLISH,
        Language::De => &GERMAN,
    }
}
