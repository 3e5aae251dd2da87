//! # Triage LLM SDK
//!
//! Provider-agnostic completion interface used by the triage engine, with an
//! OpenAI Chat Completions implementation.
//!
//! ## Example
//!
//! ```rust,no_run
//! use triage_llm_sdk::client::LlmClient;
//! use triage_llm_sdk::openai::OpenAIClient;
//! use triage_llm_sdk::types::{CompletionRequest, Message};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = OpenAIClient::new("your-api-key")?;
//!     let response = client
//!         .complete(CompletionRequest::new(
//!             "gpt-5-mini",
//!             vec![Message::user("What is your main concern today?")],
//!         ))
//!         .await?;
//!
//!     println!("Response: {}", response.text());
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod error;
pub mod models;
pub mod openai;
pub mod providers;
pub mod types;

pub use client::LlmClient;
pub use error::LlmError;
pub use types::{
    CompletionRequest, CompletionResponse, Message, ReasoningEffort, ResponseFormat, Role, Usage,
    Verbosity,
};
