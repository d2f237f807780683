//! Model-assisted extraction for one collecting turn.

pub mod decode;
pub mod prompt;

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::{
    error::{IntakeError, Result},
    llm::{CompletionBackend, CompletionRequest},
    schema::{Field, FieldValue, ProgramRecord},
    storage::Session,
};

pub use decode::ModelReply;

/// Question asked when every required field is already present.
const CLOSING_QUESTION: &str = "Is there anything else you'd like to add to this update?";

/// Where the next question of an [`ExtractionResult`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionSource {
    Model,
    Fallback,
}

/// Outcome of one extraction turn.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionResult {
    /// Raw field mapping reported by the model (empty on fallback).
    pub extracted: Map<String, Value>,
    /// Fields that were actually written into the record.
    pub merged: Vec<Field>,
    pub next_question: String,
    pub source: QuestionSource,
}

/// Asks the model for new fields and a follow-up question.
#[derive(Clone)]
pub struct ExtractionOrchestrator {
    backend: Arc<dyn CompletionBackend>,
    timeout: Duration,
}

impl ExtractionOrchestrator {
    pub fn new(backend: Arc<dyn CompletionBackend>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    /// Runs one extraction against `session`, merging new values and updating
    /// `last_question`. Never fails: call and decode errors fall back to the
    /// deterministic checklist.
    pub async fn run(
        &self,
        session: &mut Session,
        message: &str,
        access_key: Option<&str>,
    ) -> ExtractionResult {
        let (extracted, question) = match self.request(&session.record, message, access_key).await {
            Ok(reply) => reply.into_parts(),
            Err(e) => {
                warn!(user_id = %session.user_id, error = %e, "Model extraction failed, using fallback");
                (Map::new(), None)
            }
        };

        let merged = merge(&mut session.record, &extracted);
        let (next_question, source) = match question {
            Some(question) => (question, QuestionSource::Model),
            None => (fallback_question(&session.record), QuestionSource::Fallback),
        };

        info!(
            user_id = %session.user_id,
            merged = ?merged,
            source = ?source,
            "Extraction turn finished"
        );

        session.last_question = Some(next_question.clone());
        ExtractionResult {
            extracted,
            merged,
            next_question,
            source,
        }
    }

    async fn request(
        &self,
        record: &ProgramRecord,
        message: &str,
        access_key: Option<&str>,
    ) -> Result<ModelReply> {
        let request = CompletionRequest {
            system_prompt: prompt::extraction_prompt(record),
            user_message: message.to_string(),
            access_key: access_key.map(str::to_string),
        };

        let raw = tokio::time::timeout(self.timeout, self.backend.complete(&request))
            .await
            .map_err(|_| {
                IntakeError::ModelCallFailed(format!("timed out after {:?}", self.timeout))
            })??;

        debug!(reply_length = raw.len(), "Model reply received");
        decode::decode(&raw)
    }
}

/// Writes every present, known value into `record` unless that field is
/// already set. Returns the fields written.
pub fn merge(record: &mut ProgramRecord, extracted: &Map<String, Value>) -> Vec<Field> {
    let mut merged = Vec::new();
    for (key, raw) in extracted {
        let Some(field) = Field::from_name(key) else {
            debug!(key = %key, "Ignoring unknown extracted key");
            continue;
        };
        let Some(value) = FieldValue::from_json(field, raw) else {
            continue;
        };
        if record.set_if_absent(field, value) {
            merged.push(field);
        } else {
            debug!(field = %field, "Keeping previously confirmed value");
        }
    }
    merged
}

/// Canned question for the first missing required field, in priority order.
pub fn fallback_question(record: &ProgramRecord) -> String {
    record
        .missing_required()
        .first()
        .map(|field| field.fallback_question())
        .unwrap_or(CLOSING_QUESTION)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ProgramStatus;
    use crate::testing::{ScriptedBackend, complete_record};
    use serde_json::json;

    fn orchestrator(backend: ScriptedBackend) -> (ExtractionOrchestrator, Arc<ScriptedBackend>) {
        let backend = Arc::new(backend);
        (
            ExtractionOrchestrator::new(backend.clone(), Duration::from_secs(5)),
            backend,
        )
    }

    #[test]
    fn test_merge_never_overwrites_confirmed_value() {
        let mut record = ProgramRecord::new();
        record.set(Field::ProgramName, FieldValue::text("Apollo"));
        record.set(Field::OpenRisks, FieldValue::Integer(5));

        let extracted = json!({
            "program_name": "Gemini",
            "open_risks": 10,
            "sponsor_name": "Mike"
        });
        let merged = merge(&mut record, extracted.as_object().unwrap());

        assert_eq!(merged, vec![Field::SponsorName]);
        assert_eq!(record.get(Field::ProgramName), Some(&FieldValue::text("Apollo")));
        assert_eq!(record.get(Field::OpenRisks), Some(&FieldValue::Integer(5)));
    }

    #[test]
    fn test_merge_skips_sentinels_and_unknown_keys() {
        let mut record = ProgramRecord::new();
        let extracted = json!({
            "program_name": "unknown",
            "program_manager": "N/A",
            "sponsor_name": null,
            "status_commentary": "",
            "key_accomplishments": "none",
            "favourite_colour": "blue",
            "overall_status": "at risk"
        });
        let merged = merge(&mut record, extracted.as_object().unwrap());

        assert_eq!(merged, vec![Field::OverallStatus]);
        assert_eq!(
            record.get(Field::OverallStatus),
            Some(&FieldValue::Status(ProgramStatus::AtRisk))
        );
        assert_eq!(record.len(), 1);
    }

    #[test]
    fn test_fallback_question_walks_priority_order() {
        let mut record = ProgramRecord::new();
        assert_eq!(fallback_question(&record), "What is the name of your program?");

        record.set(Field::ProgramName, FieldValue::text("Apollo"));
        record.set(Field::ProgramManager, FieldValue::text("Jane"));
        assert_eq!(
            fallback_question(&record),
            Field::ProgramManagerEmail.fallback_question()
        );

        let full = complete_record();
        assert!(!fallback_question(&full).is_empty());
    }

    #[tokio::test]
    async fn test_run_merges_model_reply() {
        let (orchestrator, backend) = orchestrator(ScriptedBackend::with_replies([
            "```json\n{\"extracted_data\": {\"program_name\": \"Apollo\", \"sponsor_name\": \"Mike\"}, \"next_question\": \"Who manages Apollo?\"}\n```",
        ]));
        let mut session = Session::new("user-1");

        let result = orchestrator.run(&mut session, "Apollo, sponsored by Mike", None).await;

        assert_eq!(result.source, QuestionSource::Model);
        assert_eq!(result.next_question, "Who manages Apollo?");
        assert_eq!(result.merged, vec![Field::ProgramName, Field::SponsorName]);
        assert_eq!(session.last_question.as_deref(), Some("Who manages Apollo?"));

        let request = backend.last_request().unwrap();
        assert_eq!(request.user_message, "Apollo, sponsored by Mike");
        assert!(request.system_prompt.contains("program_manager_email"));
    }

    #[tokio::test]
    async fn test_run_recovers_object_from_prose() {
        let (orchestrator, _) = orchestrator(ScriptedBackend::with_replies([
            "Here you go: {\"extracted_data\": {\"program_manager\": \"Jane Doe\"}, \"next_question\": \"And the sponsor?\"} Thanks!",
        ]));
        let mut session = Session::new("user-1");

        let result = orchestrator.run(&mut session, "I'm Jane Doe", None).await;
        assert_eq!(result.source, QuestionSource::Model);
        assert!(session.record.is_set(Field::ProgramManager));
    }

    #[tokio::test]
    async fn test_run_falls_back_on_garbage() {
        let (orchestrator, _) = orchestrator(ScriptedBackend::with_replies(["I'm not sure."]));
        let mut session = Session::new("user-1");

        let result = orchestrator.run(&mut session, "hi", None).await;
        assert_eq!(result.source, QuestionSource::Fallback);
        assert_eq!(result.next_question, Field::ProgramName.fallback_question());
        assert_eq!(
            session.last_question.as_deref(),
            Some(Field::ProgramName.fallback_question())
        );
    }

    #[tokio::test]
    async fn test_run_falls_back_on_call_failure() {
        let (orchestrator, _) = orchestrator(ScriptedBackend::failing());
        let mut session = Session::new("user-1");
        session.record.set(Field::ProgramName, FieldValue::text("Apollo"));

        let result = orchestrator.run(&mut session, "hi", None).await;
        assert_eq!(result.next_question, Field::ProgramManager.fallback_question());
        assert!(result.extracted.is_empty());
    }

    #[tokio::test]
    async fn test_blank_question_uses_fallback_after_merge() {
        let (orchestrator, _) = orchestrator(ScriptedBackend::with_replies([
            r#"{"extracted_data": {"program_name": "Apollo"}, "next_question": ""}"#,
        ]));
        let mut session = Session::new("user-1");

        let result = orchestrator.run(&mut session, "Apollo", None).await;
        assert_eq!(result.source, QuestionSource::Fallback);
        assert_eq!(result.next_question, Field::ProgramManager.fallback_question());
    }

    #[tokio::test]
    async fn test_slow_backend_times_out_to_fallback() {
        let backend = Arc::new(ScriptedBackend::with_replies([r#"{"next_question": "late"}"#]).delayed(Duration::from_secs(5)));
        let orchestrator = ExtractionOrchestrator::new(backend, Duration::from_millis(20));
        let mut session = Session::new("user-1");

        let result = orchestrator.run(&mut session, "hi", None).await;
        assert_eq!(result.source, QuestionSource::Fallback);
    }

    #[tokio::test]
    async fn test_access_key_is_forwarded() {
        let (orchestrator, backend) = orchestrator(ScriptedBackend::with_replies([
            r#"{"extracted_data": {}, "next_question": "q"}"#,
        ]));
        let mut session = Session::new("user-1");

        orchestrator.run(&mut session, "hi", Some("sk-user")).await;
        assert_eq!(
            backend.last_request().unwrap().access_key.as_deref(),
            Some("sk-user")
        );
    }
}
