use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::time::Instant;
use triage_llm_sdk::client::LlmClient;
use triage_types::{
    AssessmentResult, ImageUploadConfig, Language, Question, QuestionKind, QuestionResponse,
    QuestionnaireSession, SessionBoundsError,
};
use uuid::Uuid;

use crate::answers::AnswerGenerator;
use crate::assessment::AssessmentEngine;
use crate::config::{IntakeConfig, SessionConfig};
use crate::emergency::EmergencyDetector;
use crate::error::IntakeError;
use crate::flow::QuestionFlow;
use crate::gateway::Gateway;
use crate::image::{ImageAnalysisRequest, ImageAnalyzer};
use crate::severity::SeverityClassifier;

#[cfg(test)]
mod tests;

/// Outcome of a submitted answer
#[derive(Debug, Clone, PartialEq)]
pub enum SessionStep {
    /// Ask this next
    Question(Question),
    /// Regular terminal assessment
    Assessment(AssessmentResult),
    /// Terminal emergency result; no further questions
    Emergency(AssessmentResult),
}

impl SessionStep {
    fn terminal(result: AssessmentResult) -> Self {
        if result.is_emergency() {
            SessionStep::Emergency(result)
        } else {
            SessionStep::Assessment(result)
        }
    }
}

struct SessionEntry {
    session: QuestionnaireSession,
    outstanding: Option<Question>,
    result: Option<AssessmentResult>,
}

impl SessionEntry {
    fn issue(&mut self, question: Question) -> SessionStep {
        self.session.current_question_id = Some(question.id.clone());
        self.outstanding = Some(question.clone());
        SessionStep::Question(question)
    }

    fn finish(&mut self, result: AssessmentResult) -> SessionStep {
        self.store(result.clone());
        SessionStep::terminal(result)
    }

    fn store(&mut self, result: AssessmentResult) {
        self.session.complete();
        self.outstanding = None;
        tracing::info!(
            session_id = %self.session.id,
            severity = %result.severity,
            emergency = result.emergency_warning,
            responses = self.session.question_count(),
            "Session completed"
        );
        self.result = Some(result);
    }
}

type SharedEntry = Arc<tokio::sync::Mutex<SessionEntry>>;

struct SessionSlot {
    entry: SharedEntry,
    last_activity: Instant,
}

/// Drives questionnaire sessions from the first question to the assessment.
///
/// Each session is guarded by its own async mutex. A request that arrives
/// while another one is still in flight for the same session is rejected
/// with [`IntakeError::SessionBusy`].
///
/// Sessions live in memory only. Unfinished sessions expire after
/// `sessions.idle_timeout_secs` without activity and completed ones after
/// `sessions.completed_retention_secs`. Expired sessions are dropped on the
/// next [`IntakeService::start`] or [`IntakeService::evict_expired`] call.
pub struct IntakeService {
    flow: QuestionFlow,
    answers: AnswerGenerator,
    assessment: AssessmentEngine,
    detector: Arc<EmergencyDetector>,
    image_analyzer: Option<Arc<dyn ImageAnalyzer>>,
    max_questions: usize,
    expiry: SessionConfig,
    sessions: Mutex<HashMap<Uuid, SessionSlot>>,
}

impl IntakeService {
    pub fn new(client: Arc<dyn LlmClient>, config: IntakeConfig) -> anyhow::Result<Self> {
        let gateway = Arc::new(Gateway::new(client, config.tiers.clone()));
        let detector = Arc::new(EmergencyDetector::new(&config.keywords));
        let classifier = Arc::new(SeverityClassifier::new(&config.keywords));
        let settings = config.questionnaire;

        Ok(Self {
            flow: QuestionFlow::new(gateway.clone(), classifier.clone(), settings.clone())?,
            answers: AnswerGenerator::new(gateway.clone(), settings.max_generated_options)?,
            assessment: AssessmentEngine::new(gateway, detector.clone(), classifier)?,
            detector,
            image_analyzer: None,
            max_questions: settings.max_questions,
            expiry: config.sessions,
            sessions: Mutex::new(HashMap::new()),
        })
    }

    pub fn with_image_analyzer(mut self, analyzer: Arc<dyn ImageAnalyzer>) -> Self {
        self.image_analyzer = Some(analyzer);
        self
    }

    fn entry(&self, session_id: Uuid) -> Result<SharedEntry, IntakeError> {
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        let slot = sessions
            .get_mut(&session_id)
            .ok_or(IntakeError::SessionNotFound(session_id))?;
        slot.last_activity = Instant::now();
        Ok(slot.entry.clone())
    }

    /// Drop sessions that outlived their idle timeout or retention period.
    /// Sessions with a turn in flight are kept. Returns the number dropped.
    pub fn evict_expired(&self) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        let before = sessions.len();

        sessions.retain(|session_id, slot| {
            let Ok(entry) = slot.entry.try_lock() else {
                return true;
            };
            let completed = entry.session.is_completed();
            let ttl = if completed {
                self.expiry.completed_retention()
            } else {
                self.expiry.idle_timeout()
            };

            let keep = now.duration_since(slot.last_activity) < ttl;
            if !keep {
                tracing::debug!(%session_id, completed, "Session expired");
            }
            keep
        });

        let evicted = before - sessions.len();
        if evicted > 0 {
            tracing::info!(evicted, remaining = sessions.len(), "Expired sessions evicted");
        }
        evicted
    }

    /// Number of sessions currently held in memory
    pub fn session_count(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Open a session and return its id with the first question
    pub async fn start(&self, language: Language, topic: Option<&str>) -> (Uuid, Question) {
        self.evict_expired();

        let session = QuestionnaireSession::new(language, self.max_questions);
        let session_id = session.id;

        let question = self.flow.issue_initial_question(language, topic).await;
        let question = self.answers.fill_options(question, &[], language).await;

        let mut entry = SessionEntry {
            session,
            outstanding: None,
            result: None,
        };
        entry.issue(question.clone());

        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                session_id,
                SessionSlot {
                    entry: Arc::new(tokio::sync::Mutex::new(entry)),
                    last_activity: Instant::now(),
                },
            );

        tracing::info!(%session_id, %language, "Session started");
        (session_id, question)
    }

    /// Record the answer to the outstanding question and decide what comes next
    pub async fn submit(
        &self,
        session_id: Uuid,
        mut response: QuestionResponse,
    ) -> Result<SessionStep, IntakeError> {
        let entry = self.entry(session_id)?;
        let mut entry = entry
            .try_lock()
            .map_err(|_| IntakeError::SessionBusy(session_id))?;

        if entry.session.is_completed() {
            return Err(SessionBoundsError::Completed.into());
        }

        let expected = entry.outstanding.as_ref().map(|q| q.id.clone());
        if expected.as_deref() != Some(response.question_id.as_str()) {
            return Err(IntakeError::UnexpectedAnswer {
                expected,
                received: response.question_id,
            });
        }

        let language = entry.session.language;
        self.analyze_image(entry.outstanding.as_ref(), &mut response, language)
            .await;

        tracing::debug!(
            %session_id,
            question_id = %response.question_id,
            answer = %response.answer.flatten(),
            "Answer received"
        );
        entry.session.push_response(response)?;
        entry.outstanding = None;

        self.advance(&mut entry).await
    }

    async fn advance(&self, entry: &mut SessionEntry) -> Result<SessionStep, IntakeError> {
        let language = entry.session.language;
        let responses = entry.session.responses().to_vec();

        if self.detector.is_emergency(&responses) {
            tracing::warn!(session_id = %entry.session.id, "Emergency detected");
            let result = self.assessment.emergency_result(&responses, language);
            return Ok(entry.finish(result));
        }

        if self.flow.should_issue_emergency_question(&responses) {
            return Ok(entry.issue(self.flow.issue_emergency_question(language)));
        }

        let next = self
            .flow
            .issue_next_question(&responses, entry.session.question_count(), language)
            .await;
        if let Some(question) = next {
            let question = self.answers.fill_options(question, &responses, language).await;
            return Ok(entry.issue(question));
        }

        let result = self.assessment.analyze(&responses, language).await?;
        Ok(entry.finish(result))
    }

    /// The terminal assessment. Returns the stored result when there is one,
    /// otherwise runs the assessment on the answers collected so far. Use this
    /// to retry after `submit` surfaced a gateway failure.
    pub async fn assess(&self, session_id: Uuid) -> Result<AssessmentResult, IntakeError> {
        let entry = self.entry(session_id)?;
        let mut entry = entry
            .try_lock()
            .map_err(|_| IntakeError::SessionBusy(session_id))?;

        if let Some(result) = &entry.result {
            return Ok(result.clone());
        }

        let responses = entry.session.responses().to_vec();
        let result = self
            .assessment
            .analyze(&responses, entry.session.language)
            .await?;

        entry.store(result.clone());
        Ok(result)
    }

    /// Copy of the session state. Waits for an in-flight turn to finish.
    pub async fn snapshot(&self, session_id: Uuid) -> Result<QuestionnaireSession, IntakeError> {
        let entry = self.entry(session_id)?;
        let entry = entry.lock().await;
        Ok(entry.session.clone())
    }

    /// The question currently waiting for an answer, if any
    pub async fn outstanding_question(
        &self,
        session_id: Uuid,
    ) -> Result<Option<Question>, IntakeError> {
        let entry = self.entry(session_id)?;
        let entry = entry.lock().await;
        Ok(entry.outstanding.clone())
    }

    /// Drop a session. Returns whether it existed.
    pub fn abandon(&self, session_id: Uuid) -> bool {
        let removed = self
            .sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&session_id)
            .is_some();
        if removed {
            tracing::info!(%session_id, "Session abandoned");
        }
        removed
    }

    async fn analyze_image(
        &self,
        question: Option<&Question>,
        response: &mut QuestionResponse,
        language: Language,
    ) {
        let Some(analyzer) = &self.image_analyzer else {
            return;
        };
        let Some(image) = response.image_data.as_mut() else {
            return;
        };
        if image.analysis_result.is_some() {
            return;
        }

        let upload = match question.map(|q| &q.kind) {
            Some(QuestionKind::ImageUpload { config }) => config.clone(),
            _ => ImageUploadConfig::default(),
        };

        match analyzer
            .analyze(ImageAnalysisRequest::new(image, &upload, language))
            .await
        {
            Ok(result) => {
                tracing::info!(
                    category = %upload.image_category,
                    findings = result.findings.len(),
                    "Image analyzed"
                );
                image.analysis_result = Some(result);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Image analysis failed, keeping answer without it");
            }
        }
    }
}
