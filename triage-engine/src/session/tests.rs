use super::*;
use crate::context::INITIAL_QUESTION_ID;
use crate::emergency::EMERGENCY_QUESTION_ID;
use crate::test_support::{MockLlmClient, MockReply};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use triage_types::{Answer, ImageAnalysisResult, ImageData, Severity};

const MILD_PAYLOAD: &str = r#"{
    "severity": "mild",
    "possibleConditions": [{"name": "Tension headache", "probability": 0.7, "description": "Muscle tension"}],
    "recommendations": ["Drink water"],
    "emergencyWarning": false,
    "followUpAdvice": "See a doctor if it lasts more than three days."
}"#;

fn service(client: Arc<MockLlmClient>) -> IntakeService {
    IntakeService::new(client, IntakeConfig::default()).unwrap()
}

fn service_with_cap(client: Arc<MockLlmClient>, max_questions: usize) -> IntakeService {
    let mut config = IntakeConfig::default();
    config.questionnaire.max_questions = max_questions;
    IntakeService::new(client, config).unwrap()
}

fn none_selected() -> Answer {
    Answer::List(vec!["none".to_string()])
}

fn expect_question(step: SessionStep) -> Question {
    match step {
        SessionStep::Question(question) => question,
        other => panic!("expected a question, got {other:?}"),
    }
}

fn expect_emergency(step: SessionStep) -> AssessmentResult {
    match step {
        SessionStep::Emergency(result) => result,
        other => panic!("expected an emergency, got {other:?}"),
    }
}

#[tokio::test]
async fn test_start_issues_initial_question() {
    let service = service(Arc::new(MockLlmClient::unavailable()));

    let (session_id, question) = service.start(Language::En, None).await;

    assert_eq!(question.id, INITIAL_QUESTION_ID);
    let snapshot = service.snapshot(session_id).await.unwrap();
    assert_eq!(snapshot.current_question_id.as_deref(), Some(INITIAL_QUESTION_ID));
    assert_eq!(snapshot.question_count(), 0);
    assert_eq!(
        service.outstanding_question(session_id).await.unwrap(),
        Some(question)
    );
}

#[tokio::test]
async fn test_answer_for_other_question_is_rejected() {
    let service = service(Arc::new(MockLlmClient::unavailable()));
    let (session_id, _) = service.start(Language::En, None).await;

    let err = service
        .submit(session_id, QuestionResponse::new("age", 40.0))
        .await
        .unwrap_err();

    match err {
        IntakeError::UnexpectedAnswer { expected, received } => {
            assert_eq!(expected.as_deref(), Some(INITIAL_QUESTION_ID));
            assert_eq!(received, "age");
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(service.snapshot(session_id).await.unwrap().question_count(), 0);
}

#[tokio::test]
async fn test_concurrent_turn_is_rejected_as_busy() {
    let service = service(Arc::new(MockLlmClient::unavailable()));
    let (session_id, _) = service.start(Language::En, None).await;

    let entry = service.entry(session_id).unwrap();
    let in_flight = entry.lock().await;

    let err = service
        .submit(session_id, QuestionResponse::new(INITIAL_QUESTION_ID, "headache"))
        .await
        .unwrap_err();
    assert!(matches!(err, IntakeError::SessionBusy(id) if id == session_id));
    assert!(matches!(
        service.assess(session_id).await,
        Err(IntakeError::SessionBusy(_))
    ));

    drop(in_flight);
    assert!(service
        .submit(session_id, QuestionResponse::new(INITIAL_QUESTION_ID, "headache"))
        .await
        .is_ok());
}

#[tokio::test]
async fn test_sessions_are_independent() {
    let service = service(Arc::new(MockLlmClient::unavailable()));
    let (first, _) = service.start(Language::En, None).await;
    let (second, _) = service.start(Language::De, None).await;

    let entry = service.entry(first).unwrap();
    let _in_flight = entry.lock().await;

    let step = service
        .submit(second, QuestionResponse::new(INITIAL_QUESTION_ID, "Husten"))
        .await
        .unwrap();
    assert!(matches!(step, SessionStep::Question(_)));
}

#[tokio::test]
async fn test_emergency_keyword_ends_session_immediately() {
    let client = Arc::new(MockLlmClient::unavailable());
    let service = service(client.clone());
    let (session_id, _) = service.start(Language::En, None).await;

    let step = service
        .submit(
            session_id,
            QuestionResponse::new(
                INITIAL_QUESTION_ID,
                "I have crushing chest pain radiating to my arm",
            ),
        )
        .await
        .unwrap();

    let result = expect_emergency(step);
    assert_eq!(result.severity, Severity::Emergency);
    assert!(result.possible_conditions.is_empty());
    // Only the initial question went to the gateway
    assert_eq!(client.call_count(), 1);

    let snapshot = service.snapshot(session_id).await.unwrap();
    assert!(snapshot.is_completed());

    let err = service
        .submit(session_id, QuestionResponse::new(INITIAL_QUESTION_ID, "again"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        IntakeError::SessionBoundsExceeded(SessionBoundsError::Completed)
    ));
    assert_eq!(service.assess(session_id).await.unwrap(), result);
}

#[tokio::test]
async fn test_red_flag_selection_ends_session() {
    let service = service(Arc::new(MockLlmClient::unavailable()));
    let (session_id, _) = service.start(Language::En, None).await;

    let step = service
        .submit(session_id, QuestionResponse::new(INITIAL_QUESTION_ID, "headache"))
        .await
        .unwrap();
    let question = expect_question(step);
    let step = service
        .submit(session_id, QuestionResponse::new(question.id, "days"))
        .await
        .unwrap();
    let question = expect_question(step);
    assert_eq!(question.id, EMERGENCY_QUESTION_ID);

    let step = service
        .submit(
            session_id,
            QuestionResponse::new(
                EMERGENCY_QUESTION_ID,
                Answer::List(vec!["loss_of_consciousness".to_string()]),
            ),
        )
        .await
        .unwrap();

    let result = expect_emergency(step);
    assert_eq!(
        result.red_flags,
        Some(vec!["Fainting or loss of consciousness".to_string()])
    );
}

#[tokio::test]
async fn test_gateway_outage_keeps_questions_flowing_but_assessment_fails() {
    let client = Arc::new(MockLlmClient::unavailable());
    let service = service(client);
    let (session_id, question) = service.start(Language::En, None).await;

    let answers: Vec<Answer> = vec![
        "mild headache".into(),
        "days".into(),
        none_selected(),
        3.0.into(),
        41.0.into(),
        "female".into(),
        "no".into(),
    ];

    let mut question = question;
    let mut asked = Vec::new();
    let mut outcome = None;
    for answer in answers {
        asked.push(question.id.clone());
        match service
            .submit(session_id, QuestionResponse::new(question.id.clone(), answer))
            .await
        {
            Ok(SessionStep::Question(next)) => question = next,
            other => {
                outcome = Some(other);
                break;
            }
        }
    }

    assert_eq!(
        asked,
        vec![
            INITIAL_QUESTION_ID,
            "symptom_duration",
            EMERGENCY_QUESTION_ID,
            "severity_scale",
            "age",
            "gender",
            "additional_symptoms",
        ]
    );
    match outcome {
        Some(Err(err)) => assert!(matches!(err, IntakeError::GatewayUnavailable(_))),
        other => panic!("expected a failed assessment, got {other:?}"),
    }
    assert!(!service.snapshot(session_id).await.unwrap().is_completed());
}

#[tokio::test]
async fn test_assess_retries_failed_assessment() {
    let client = Arc::new(MockLlmClient::new(vec![
        MockReply::Unavailable,
        MockReply::Text(r#"{"complete": true, "question": null}"#.to_string()),
        MockReply::Unavailable,
        MockReply::Text(MILD_PAYLOAD.to_string()),
    ]));
    let service = service(client.clone());
    let (session_id, _) = service.start(Language::En, None).await;

    let err = service
        .submit(
            session_id,
            QuestionResponse::new(INITIAL_QUESTION_ID, "mild headache for an hour"),
        )
        .await
        .unwrap_err();
    assert!(err.is_retryable());

    let result = service.assess(session_id).await.unwrap();
    assert_eq!(result.severity, Severity::Mild);
    assert_eq!(result.possible_conditions.len(), 1);
    assert!(service.snapshot(session_id).await.unwrap().is_completed());

    let again = service.assess(session_id).await.unwrap();
    assert_eq!(again, result);
    assert_eq!(client.call_count(), 4);
}

#[tokio::test]
async fn test_cap_boundary_moves_to_assessment() {
    let client = Arc::new(MockLlmClient::new(vec![
        MockReply::Unavailable,
        MockReply::Unavailable,
        MockReply::Text(MILD_PAYLOAD.to_string()),
    ]));
    let service = service_with_cap(client.clone(), 3);
    let (session_id, _) = service.start(Language::En, None).await;

    let question = expect_question(
        service
            .submit(session_id, QuestionResponse::new(INITIAL_QUESTION_ID, "mild headache"))
            .await
            .unwrap(),
    );
    let question = expect_question(
        service
            .submit(session_id, QuestionResponse::new(question.id, "days"))
            .await
            .unwrap(),
    );
    assert_eq!(question.id, EMERGENCY_QUESTION_ID);

    let step = service
        .submit(session_id, QuestionResponse::new(question.id, none_selected()))
        .await
        .unwrap();

    let result = match step {
        SessionStep::Assessment(result) => result,
        other => panic!("expected an assessment, got {other:?}"),
    };
    assert_eq!(result.severity, Severity::Mild);
    assert_eq!(client.call_count(), 3);

    let snapshot = service.snapshot(session_id).await.unwrap();
    assert_eq!(snapshot.question_count(), 3);
    assert!(snapshot.is_completed());
}

#[tokio::test]
async fn test_generated_options_are_filled_before_issue() {
    let client = Arc::new(MockLlmClient::with_texts(&[
        r#"{"question": {"id": "concern", "type": "text", "text": "What is bothering you?"}}"#,
        r#"{"complete": false, "question": {"id": "pain_character", "type": "ai-single-choice", "text": "How does it feel?", "generateAnswers": true}}"#,
        r#"{"options": [{"label": "Burning"}, {"label": "Itching"}]}"#,
    ]));
    let service = service(client);
    let (session_id, _) = service.start(Language::En, None).await;

    let question = expect_question(
        service
            .submit(session_id, QuestionResponse::new(INITIAL_QUESTION_ID, "rash on my arm"))
            .await
            .unwrap(),
    );

    assert_eq!(question.id, "pain_character");
    assert!(!question.generate_answers());
    let labels: Vec<&str> = question.options().iter().map(|o| o.label.as_str()).collect();
    assert_eq!(labels, vec!["Burning", "Itching"]);
}

struct RecordingAnalyzer {
    calls: AtomicUsize,
    fail: bool,
}

#[async_trait]
impl ImageAnalyzer for RecordingAnalyzer {
    async fn analyze(&self, request: ImageAnalysisRequest) -> anyhow::Result<ImageAnalysisResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            anyhow::bail!("analysis service offline");
        }
        assert_eq!(request.image_category, "skin");
        assert_eq!(request.media_type, "image/png");
        Ok(ImageAnalysisResult {
            analysis_text: "Ring-shaped red patch".to_string(),
            findings: vec!["annular erythema".to_string()],
            recommendations: vec![],
            urgency_level: "low".to_string(),
            suggested_specialties: vec!["dermatology".to_string()],
            confidence: 0.8,
        })
    }
}

fn photo() -> ImageData {
    ImageData {
        payload: "iVBORw0KGgo=".to_string(),
        filename: "arm.png".to_string(),
        size: 8,
        media_type: "image/png".to_string(),
        analysis_result: None,
    }
}

const PHOTO_QUESTION: &str = r#"{"question": {"id": "photo", "type": "image-upload", "text": "Please upload a photo of the affected skin"}}"#;

fn skin_upload_question(question: Question) -> Question {
    let mut question = question;
    if let QuestionKind::ImageUpload { config } = &mut question.kind {
        config.image_category = "skin".to_string();
    }
    question
}

#[tokio::test]
async fn test_image_analysis_is_stored_and_folded_into_context() {
    let client = Arc::new(MockLlmClient::with_texts(&[PHOTO_QUESTION]));
    let analyzer = Arc::new(RecordingAnalyzer {
        calls: AtomicUsize::new(0),
        fail: false,
    });
    let service = service(client.clone()).with_image_analyzer(analyzer.clone());
    let (session_id, question) = service.start(Language::En, Some("skin")).await;
    assert!(matches!(question.kind, QuestionKind::ImageUpload { .. }));

    // Narrow the upload category the way a skin-specific flow would
    {
        let entry = service.entry(session_id).unwrap();
        let mut entry = entry.lock().await;
        entry.outstanding = entry.outstanding.take().map(skin_upload_question);
    }

    service
        .submit(
            session_id,
            QuestionResponse::new(INITIAL_QUESTION_ID, "photo attached").with_image(photo()),
        )
        .await
        .unwrap();

    assert_eq!(analyzer.calls.load(Ordering::SeqCst), 1);
    let snapshot = service.snapshot(session_id).await.unwrap();
    let analysis = snapshot.responses()[0]
        .image_data
        .as_ref()
        .and_then(|image| image.analysis_result.as_ref())
        .unwrap();
    assert_eq!(analysis.findings, vec!["annular erythema".to_string()]);

    let follow_up_prompt = &client.requests()[1].messages[1].content;
    assert!(follow_up_prompt.contains("[image: Ring-shaped red patch"));
}

#[tokio::test]
async fn test_image_analysis_failure_keeps_answer() {
    let client = Arc::new(MockLlmClient::with_texts(&[PHOTO_QUESTION]));
    let analyzer = Arc::new(RecordingAnalyzer {
        calls: AtomicUsize::new(0),
        fail: true,
    });
    let service = service(client).with_image_analyzer(analyzer.clone());
    let (session_id, _) = service.start(Language::En, None).await;

    let step = service
        .submit(
            session_id,
            QuestionResponse::new(INITIAL_QUESTION_ID, "photo attached").with_image(photo()),
        )
        .await;

    assert!(step.is_ok());
    assert_eq!(analyzer.calls.load(Ordering::SeqCst), 1);
    let snapshot = service.snapshot(session_id).await.unwrap();
    assert_eq!(snapshot.question_count(), 1);
    assert!(snapshot.responses()[0]
        .image_data
        .as_ref()
        .is_some_and(|image| image.analysis_result.is_none()));
}

#[tokio::test]
async fn test_abandon_removes_session() {
    let service = service(Arc::new(MockLlmClient::unavailable()));
    let (session_id, _) = service.start(Language::En, None).await;

    assert!(service.abandon(session_id));
    assert!(!service.abandon(session_id));

    let err = service
        .submit(session_id, QuestionResponse::new(INITIAL_QUESTION_ID, "headache"))
        .await
        .unwrap_err();
    assert!(matches!(err, IntakeError::SessionNotFound(id) if id == session_id));
}

async fn finish_with_emergency(service: &IntakeService) -> Uuid {
    let (session_id, _) = service.start(Language::En, None).await;
    let step = service
        .submit(session_id, QuestionResponse::new(INITIAL_QUESTION_ID, "chest pain"))
        .await
        .unwrap();
    expect_emergency(step);
    session_id
}

#[tokio::test(start_paused = true)]
async fn test_completed_sessions_are_evicted_after_retention() {
    let service = service(Arc::new(MockLlmClient::unavailable()));
    let mut finished = Vec::new();
    for _ in 0..50 {
        finished.push(finish_with_emergency(&service).await);
    }
    assert_eq!(service.session_count(), 50);

    // Still retrievable within the retention period
    tokio::time::advance(Duration::from_secs(120)).await;
    assert_eq!(service.evict_expired(), 0);
    assert!(service.assess(finished[0]).await.unwrap().is_emergency());

    tokio::time::advance(Duration::from_secs(301)).await;
    let (fresh, _) = service.start(Language::En, None).await;

    assert_eq!(service.session_count(), 1);
    assert!(service.snapshot(fresh).await.is_ok());
    assert!(matches!(
        service.snapshot(finished[1]).await,
        Err(IntakeError::SessionNotFound(id)) if id == finished[1]
    ));
}

#[tokio::test(start_paused = true)]
async fn test_idle_session_expires_after_idle_timeout() {
    let service = service(Arc::new(MockLlmClient::unavailable()));
    let (session_id, _) = service.start(Language::En, None).await;

    tokio::time::advance(Duration::from_secs(600)).await;
    assert_eq!(service.evict_expired(), 0);

    tokio::time::advance(Duration::from_secs(1201)).await;
    assert_eq!(service.evict_expired(), 1);
    assert!(matches!(
        service.outstanding_question(session_id).await,
        Err(IntakeError::SessionNotFound(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_activity_keeps_session_alive() {
    let service = service(Arc::new(MockLlmClient::unavailable()));
    let (session_id, _) = service.start(Language::En, None).await;

    tokio::time::advance(Duration::from_secs(1500)).await;
    service
        .submit(session_id, QuestionResponse::new(INITIAL_QUESTION_ID, "cough"))
        .await
        .unwrap();

    tokio::time::advance(Duration::from_secs(1500)).await;
    assert_eq!(service.evict_expired(), 0);
    assert_eq!(service.snapshot(session_id).await.unwrap().question_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_session_with_turn_in_flight_is_not_evicted() {
    let service = service(Arc::new(MockLlmClient::unavailable()));
    let session_id = finish_with_emergency(&service).await;

    let entry = service.entry(session_id).unwrap();
    let in_flight = entry.lock().await;
    tokio::time::advance(Duration::from_secs(3600)).await;
    assert_eq!(service.evict_expired(), 0);

    drop(in_flight);
    assert_eq!(service.evict_expired(), 1);
    assert_eq!(service.session_count(), 0);
}
