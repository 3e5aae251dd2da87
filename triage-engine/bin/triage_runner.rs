use clap::Parser;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use triage_engine::{get_config_path, IntakeConfig, IntakeError, IntakeService, SessionStep};
use triage_llm_sdk::client::LlmClient;
use triage_llm_sdk::openai::OpenAIClient;
use triage_types::{
    Answer, AssessmentResult, Language, Question, QuestionKind, QuestionOption, QuestionResponse,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the engine config file (defaults to <config dir>/triage/engine.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Questionnaire language (en or de)
    #[arg(short, long, default_value = "en")]
    language: String,

    /// Optional topic the patient picked before starting
    #[arg(short, long)]
    topic: Option<String>,
}

fn prompt_line(label: &str) -> anyhow::Result<String> {
    print!("{}> ", label);
    io::stdout().flush()?;

    let mut input = String::new();
    if io::stdin().read_line(&mut input)? == 0 {
        anyhow::bail!("Input closed");
    }
    Ok(input.trim().to_string())
}

fn print_options(options: &[QuestionOption]) {
    for (index, option) in options.iter().enumerate() {
        println!("  {}) {}", index + 1, option.label);
    }
}

fn pick_option<'a>(options: &'a [QuestionOption], token: &str) -> Option<&'a QuestionOption> {
    match token.trim().parse::<usize>() {
        Ok(index) if index >= 1 => options.get(index - 1),
        _ => options
            .iter()
            .find(|o| o.label.eq_ignore_ascii_case(token.trim()) || o.value == token.trim()),
    }
}

fn parse_number(input: &str, min: Option<f64>, max: Option<f64>) -> Option<f64> {
    let value = input.replace(',', ".").parse::<f64>().ok()?;
    let in_range = min.map_or(true, |min| value >= min) && max.map_or(true, |max| value <= max);
    (value.is_finite() && in_range).then_some(value)
}

fn parse_boolean(input: &str) -> Option<bool> {
    match input.to_lowercase().as_str() {
        "y" | "yes" | "j" | "ja" | "true" => Some(true),
        "n" | "no" | "nein" | "false" => Some(false),
        _ => None,
    }
}

/// Parse one line of input for `question`; `None` means ask again
fn parse_answer(question: &Question, input: &str) -> Option<Answer> {
    match &question.kind {
        QuestionKind::Text | QuestionKind::AiText { .. } | QuestionKind::ImageUpload { .. } => {
            (!input.is_empty() || !question.required).then(|| Answer::from(input))
        }
        QuestionKind::Number { min, max } => parse_number(input, *min, *max).map(Answer::from),
        QuestionKind::Scale { min, max } => {
            parse_number(input, Some(*min), Some(*max)).map(Answer::from)
        }
        QuestionKind::Boolean => parse_boolean(input).map(Answer::from),
        QuestionKind::SingleChoice { options }
        | QuestionKind::BodyPart { options }
        | QuestionKind::AiSingleChoice { options, .. } => {
            pick_option(options, input).map(|o| Answer::from(o.value.clone()))
        }
        QuestionKind::MultipleChoice { options } | QuestionKind::AiMultipleChoice { options, .. } => {
            let picked: Option<Vec<String>> = input
                .split(',')
                .filter(|token| !token.trim().is_empty())
                .map(|token| pick_option(options, token).map(|o| o.value.clone()))
                .collect();
            picked
                .filter(|values| !values.is_empty())
                .map(Answer::List)
        }
    }
}

fn input_hint(question: &Question) -> String {
    match &question.kind {
        QuestionKind::Number { min, max } => match (min, max) {
            (Some(min), Some(max)) => format!("number {}-{}", min, max),
            _ => "number".to_string(),
        },
        QuestionKind::Scale { min, max } => format!("{}-{}", min, max),
        QuestionKind::Boolean => "y/n".to_string(),
        QuestionKind::MultipleChoice { .. } | QuestionKind::AiMultipleChoice { .. } => {
            "numbers, comma separated".to_string()
        }
        QuestionKind::SingleChoice { .. }
        | QuestionKind::BodyPart { .. }
        | QuestionKind::AiSingleChoice { .. } => "number".to_string(),
        QuestionKind::ImageUpload { .. } => "describe what the photo would show".to_string(),
        QuestionKind::Text | QuestionKind::AiText { .. } => question
            .placeholder
            .clone()
            .unwrap_or_else(|| "answer".to_string()),
    }
}

fn ask(question: &Question) -> anyhow::Result<QuestionResponse> {
    println!("\n{}", question.text);
    if let Some(description) = &question.description {
        println!("({})", description);
    }
    print_options(question.options());

    loop {
        let input = prompt_line(&input_hint(question))?;
        match parse_answer(question, &input) {
            Some(answer) => return Ok(QuestionResponse::new(question.id.clone(), answer)),
            None => println!("Could not read that answer, please try again."),
        }
    }
}

fn print_list(title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    println!("\n{}:", title);
    for item in items {
        println!("  - {}", item);
    }
}

fn print_assessment(result: &AssessmentResult) {
    println!("\n--- Assessment ---");
    if let Some(message) = &result.emergency_message {
        println!("\n!!! {}", message);
    }
    println!("\nSeverity: {}", result.severity);

    if !result.possible_conditions.is_empty() {
        println!("\nPossible conditions:");
        for condition in &result.possible_conditions {
            println!(
                "  - {} ({:.0}%) {}",
                condition.name,
                condition.probability * 100.0,
                condition.description
            );
        }
    }

    print_list("Recommendations", &result.recommendations);
    print_list("Warning signs", result.red_flags.as_deref().unwrap_or_default());
    print_list("Self-care", result.self_care.as_deref().unwrap_or_default());
    println!("\n{}", result.follow_up_advice);
}

fn build_client(config: &IntakeConfig) -> anyhow::Result<Arc<dyn LlmClient>> {
    let api_key = config
        .gateway
        .openai_api_key
        .clone()
        .or_else(|| std::env::var("OPENAI_API_KEY").ok())
        .ok_or_else(|| {
            anyhow::anyhow!("No API key: set gateway.openai_api_key or OPENAI_API_KEY")
        })?;

    let mut client = OpenAIClient::new(api_key)?;
    if let Some(base_url) = &config.gateway.base_url {
        client = client.with_base_url(base_url);
    }
    Ok(Arc::new(client))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(true)
                .with_target(false),
        )
        .init();

    let args = Args::parse();
    let language: Language = args.language.parse().map_err(anyhow::Error::msg)?;

    let config_path = args.config.unwrap_or_else(get_config_path);
    let config = IntakeConfig::load(Some(config_path.as_path()))?;
    let client = build_client(&config)?;

    let service = IntakeService::new(client, config)?;
    let (session_id, mut question) = service.start(language, args.topic.as_deref()).await;

    loop {
        let response = ask(&question)?;
        let step = match service.submit(session_id, response).await {
            Ok(step) => step,
            Err(e) => match retry_assessment(&service, session_id, language, e).await? {
                Some(result) => SessionStep::Assessment(result),
                None => return Ok(()),
            },
        };

        match step {
            SessionStep::Question(next) => question = next,
            SessionStep::Assessment(result) | SessionStep::Emergency(result) => {
                print_assessment(&result);
                return Ok(());
            }
        }
    }
}

/// Offer to retry a failed assessment until it succeeds or the user gives up
async fn retry_assessment(
    service: &IntakeService,
    session_id: uuid::Uuid,
    language: Language,
    mut error: IntakeError,
) -> anyhow::Result<Option<AssessmentResult>> {
    loop {
        tracing::debug!(error = %error, "Turn failed");
        eprintln!("\n{}", error.user_message(language));
        if !error.is_retryable() {
            return Err(error.into());
        }

        if parse_boolean(&prompt_line("Retry? y/n")?) != Some(true) {
            return Ok(None);
        }
        match service.assess(session_id).await {
            Ok(result) => return Ok(Some(result)),
            Err(e) => error = e,
        }
    }
}
