use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use triage_llm_sdk::client::LlmClient;
use triage_llm_sdk::error::LlmError;
use triage_llm_sdk::types::{CompletionRequest, CompletionResponse, Role, Usage};

pub(crate) enum MockReply {
    Text(String),
    Truncated(String),
    Unavailable,
}

/// Scripted gateway client. Replies are consumed in order; once the script
/// is exhausted every call fails as if the service were down.
pub(crate) struct MockLlmClient {
    replies: Mutex<VecDeque<MockReply>>,
    requests: Mutex<Vec<CompletionRequest>>,
    call_count: Arc<AtomicUsize>,
}

impl MockLlmClient {
    pub(crate) fn new(replies: Vec<MockReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
            call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn with_texts(texts: &[&str]) -> Self {
        Self::new(
            texts
                .iter()
                .map(|t| MockReply::Text(t.to_string()))
                .collect(),
        )
    }

    pub(crate) fn unavailable() -> Self {
        Self::new(Vec::new())
    }

    pub(crate) fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    pub(crate) fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

fn response(content: String, stop_reason: &str) -> CompletionResponse {
    CompletionResponse {
        content,
        role: Role::Assistant,
        usage: Usage {
            input_tokens: 10,
            output_tokens: 20,
        },
        stop_reason: Some(stop_reason.to_string()),
    }
}

#[async_trait::async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request);

        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(MockReply::Unavailable);

        match reply {
            MockReply::Text(text) => Ok(response(text, "stop")),
            MockReply::Truncated(text) => Ok(response(text, "length")),
            MockReply::Unavailable => Err(LlmError::api_error(503, "mock gateway unavailable")),
        }
    }

    fn provider_name(&self) -> &str {
        "mock"
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}
