pub mod config;
pub mod dialogue;
pub mod error;
pub mod extraction;
pub mod llm;
pub mod patterns;
pub mod schema;
pub mod storage;
pub mod submission;
pub mod webhook;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use config::IntakeConfig;
pub use dialogue::{DialogueEngine, InboundRequest, Phase};
pub use error::{IntakeError, Result};
pub use extraction::{ExtractionOrchestrator, ExtractionResult};
pub use llm::{CompletionBackend, CompletionRequest};
#[cfg(feature = "rig")]
pub use llm::OpenRouterBackend;
pub use schema::{Field, FieldValue, ProgramRecord, ProgramStatus};
pub use storage::{InMemorySessionStore, Session, SessionStore};
pub use submission::SubmissionPayload;
pub use webhook::{ReportSink, WebhookClient};
