use std::fs;
use std::path::Path;
use triage_types::generate_typescript_definitions;

const API_TYPES: &[&str] = &[
    "Language",
    "Question",
    "QuestionKind",
    "QuestionOption",
    "AnswerContext",
    "ImageUploadConfig",
    "Answer",
    "QuestionResponse",
    "ImageData",
    "ImageAnalysisResult",
    "QuestionnaireSession",
    "Severity",
    "PossibleCondition",
    "AssessmentResult",
];

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let output_dir = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "gui/api-types".to_string());
    let output_dir = Path::new(&output_dir);
    fs::create_dir_all(output_dir)?;

    let mut output = generate_typescript_definitions(API_TYPES)?;
    output.push('\n');

    let output_path = output_dir.join("types.ts");
    fs::write(&output_path, output)?;
    println!("Generated TypeScript types in {}", output_path.display());

    Ok(())
}
