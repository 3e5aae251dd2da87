use triage_types::{ImageAnalysisResult, QuestionResponse};

pub const INITIAL_QUESTION_ID: &str = "initial_symptom";
pub const AGE_QUESTION_ID: &str = "age";
pub const GENDER_QUESTION_ID: &str = "gender";

fn label_for(question_id: &str) -> &str {
    match question_id {
        INITIAL_QUESTION_ID => "Main concern",
        AGE_QUESTION_ID => "Age",
        GENDER_QUESTION_ID => "Gender",
        other => other,
    }
}

fn render_image_analysis(analysis: &ImageAnalysisResult) -> String {
    let mut parts = vec![format!("image: {}", analysis.analysis_text.trim())];
    if !analysis.findings.is_empty() {
        parts.push(format!("findings: {}", analysis.findings.join(", ")));
    }
    if !analysis.urgency_level.trim().is_empty() {
        parts.push(format!("urgency: {}", analysis.urgency_level.trim()));
    }
    format!("[{}]", parts.join("; "))
}

fn render_line(response: &QuestionResponse) -> String {
    let mut line = format!(
        "{}: {}",
        label_for(&response.question_id),
        response.answer.flatten()
    );

    if let Some(analysis) = response
        .image_data
        .as_ref()
        .and_then(|image| image.analysis_result.as_ref())
    {
        line.push(' ');
        line.push_str(&render_image_analysis(analysis));
    }

    line
}

/// Render the response history as prompt context, one line per response in
/// submission order.
pub fn build(responses: &[QuestionResponse]) -> String {
    responses
        .iter()
        .map(render_line)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use triage_types::{Answer, ImageData};

    #[test]
    fn test_known_ids_get_labels_and_order_is_kept() {
        let responses = vec![
            QuestionResponse::new("initial_symptom", "headache"),
            QuestionResponse::new("age", 34.0),
            QuestionResponse::new(
                "pain_character",
                Answer::List(vec!["throbbing".to_string(), "pressing".to_string()]),
            ),
            QuestionResponse::new("fever", false),
        ];

        assert_eq!(
            build(&responses),
            "Main concern: headache\nAge: 34\npain_character: throbbing, pressing\nfever: no"
        );
    }

    #[test]
    fn test_output_does_not_depend_on_timestamps() {
        let first = vec![QuestionResponse::new("gender", "female")];
        let mut second = first.clone();
        second[0].timestamp = second[0].timestamp + chrono::Duration::hours(5);

        assert_eq!(build(&first), build(&second));
        assert_eq!(build(&[]), "");
    }

    #[test]
    fn test_image_analysis_is_folded_into_line() {
        let response = QuestionResponse::new("rash_photo", "photo attached").with_image(ImageData {
            payload: "aGVsbG8=".to_string(),
            filename: "rash.jpg".to_string(),
            size: 5,
            media_type: "image/jpeg".to_string(),
            analysis_result: Some(ImageAnalysisResult {
                analysis_text: "Red, raised patches on the forearm".to_string(),
                findings: vec!["erythema".to_string(), "papules".to_string()],
                recommendations: vec![],
                urgency_level: "low".to_string(),
                suggested_specialties: vec!["dermatology".to_string()],
                confidence: 0.7,
            }),
        });

        assert_eq!(
            build(&[response]),
            "rash_photo: photo attached [image: Red, raised patches on the forearm; findings: erythema, papules; urgency: low]"
        );
    }
}
