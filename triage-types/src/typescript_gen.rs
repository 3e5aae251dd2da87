use ts_rs::TS;

/// Render the TypeScript definitions of the named types, joined by blank lines.
///
/// The output is embedded in gateway prompts so the model sees the exact
/// shape it has to produce.
pub fn generate_typescript_definitions(
    type_names: &[&str],
) -> Result<String, Box<dyn std::error::Error>> {
    if type_names.is_empty() {
        return Err("No type names provided".into());
    }

    let mut definitions = Vec::new();

    for name in type_names {
        let type_def = export_type(name)?;
        let cleaned = clean_type(type_def);

        if !cleaned.trim().is_empty() {
            definitions.push(cleaned);
        }
    }

    Ok(definitions.join("\n\n"))
}

fn export_type(name: &str) -> Result<String, Box<dyn std::error::Error>> {
    use crate::*;

    let result = match name {
        "Language" => Language::export_to_string()?,

        "Question" => Question::export_to_string()?,
        "QuestionKind" => QuestionKind::export_to_string()?,
        "QuestionOption" => QuestionOption::export_to_string()?,
        "AnswerContext" => AnswerContext::export_to_string()?,
        "ImageUploadConfig" => ImageUploadConfig::export_to_string()?,
        "GeneratedQuestion" => GeneratedQuestion::export_to_string()?,
        "GeneratedOption" => GeneratedOption::export_to_string()?,

        "Answer" => Answer::export_to_string()?,
        "QuestionResponse" => QuestionResponse::export_to_string()?,
        "ImageData" => ImageData::export_to_string()?,
        "ImageAnalysisResult" => ImageAnalysisResult::export_to_string()?,

        "QuestionnaireSession" => QuestionnaireSession::export_to_string()?,

        "Severity" => Severity::export_to_string()?,
        "PossibleCondition" => PossibleCondition::export_to_string()?,
        "AssessmentResult" => AssessmentResult::export_to_string()?,
        "AssessmentPayload" => AssessmentPayload::export_to_string()?,
        "ConditionPayload" => ConditionPayload::export_to_string()?,

        _ => {
            return Err(format!(
                "Unknown type: '{}'. Available types can be found in triage-types/src/",
                name
            )
            .into());
        }
    };

    Ok(result)
}

fn clean_type(mut type_def: String) -> String {
    type_def.retain(|c| c != '\r');

    type_def
        .lines()
        .filter(|line| {
            let trimmed = line.trim();
            !trimmed.starts_with("import type")
                && !trimmed.starts_with("// This file was generated")
        })
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}
