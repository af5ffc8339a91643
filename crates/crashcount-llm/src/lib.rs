//! Vehicle counting through an OpenAI-compatible chat-completions endpoint.

pub mod batch;
pub mod client;
pub mod types;

pub use batch::{AgreementReport, count_records, sample_records};
pub use client::{ClientConfig, CountClient, LlmError, SYSTEM_PROMPT};
pub use types::{ChatRequest, ChatResponse, Choice, Message, Role, Usage};
