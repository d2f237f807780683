//! Dialogue engine: loads a user's session, runs exactly **one** turn through
//! the phase transition table, and saves the session back.
//!
//! Every turn produces a reply. Model failures fall back to canned questions,
//! webhook failures are reported to the user, and an unrecognized phase is
//! recovered by starting over.

pub mod messages;
pub mod phase;

use std::sync::Arc;

use chrono::Local;
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

use crate::{
    error::{IntakeError, Result},
    extraction::{ExtractionOrchestrator, fallback_question},
    patterns,
    storage::{ChatMessage, MessageRole, Session, SessionStore},
    submission::SubmissionPayload,
    webhook::ReportSink,
};

pub use messages::{INTRODUCTION_MESSAGE, RECOVERY_MESSAGE, WELCOME_MESSAGE};
pub use phase::{Action, Event, Phase, Transition, transition};

/// A message delivered by the hosting chat platform.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    pub user_id: String,
    /// Conversation so far; only the latest user turn is read.
    pub turns: Vec<ChatMessage>,
    /// Opaque credential forwarded to the model backend.
    pub access_key: Option<String>,
}

impl InboundRequest {
    pub fn new(user_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            turns: vec![ChatMessage::user(message)],
            access_key: None,
        }
    }

    pub fn with_access_key(mut self, access_key: impl Into<String>) -> Self {
        self.access_key = Some(access_key.into());
        self
    }

    pub fn latest_user_message(&self) -> Option<&str> {
        self.turns
            .iter()
            .rev()
            .find(|turn| turn.role == MessageRole::User)
            .map(|turn| turn.content.as_str())
    }
}

/// Drives the intake conversation for every user.
#[derive(Clone)]
pub struct DialogueEngine {
    store: Arc<dyn SessionStore>,
    orchestrator: ExtractionOrchestrator,
    sink: Arc<dyn ReportSink>,
}

impl DialogueEngine {
    pub fn new(
        store: Arc<dyn SessionStore>,
        orchestrator: ExtractionOrchestrator,
        sink: Arc<dyn ReportSink>,
    ) -> Self {
        Self {
            store,
            orchestrator,
            sink,
        }
    }

    /// Handles one inbound message: load (or create) the session, execute one
    /// turn, persist the session.
    pub async fn respond(&self, request: InboundRequest) -> Result<String> {
        let message = request
            .latest_user_message()
            .ok_or_else(|| IntakeError::InvalidRequest("no user message in request".to_string()))?
            .to_string();

        let turn_id = Uuid::new_v4();
        let span = info_span!("turn", turn_id = %turn_id, user_id = %request.user_id);

        async {
            let mut session = self.store.get_or_create(&request.user_id).await?;
            let reply = self
                .execute_turn(&mut session, &message, request.access_key.as_deref())
                .await;
            self.store.save(session).await?;
            Ok::<_, IntakeError>(reply)
        }
        .instrument(span)
        .await
    }

    /// Runs one message through the transition table. Mutates `session` in
    /// place and always yields a reply.
    pub async fn execute_turn(
        &self,
        session: &mut Session,
        message: &str,
        access_key: Option<&str>,
    ) -> String {
        session.history.push(ChatMessage::user(message));

        let step = transition(session.phase, Event::Message);
        info!(
            from = ?step.from,
            to = ?step.to,
            action = ?step.action,
            "Handling message"
        );

        let reply = match step.action {
            Action::Welcome => {
                session.phase = step.to;
                session.last_question = None;
                WELCOME_MESSAGE.to_string()
            }
            Action::Restart => {
                session.reset();
                session.history.push(ChatMessage::user(message));
                session.phase = step.to;
                WELCOME_MESSAGE.to_string()
            }
            Action::Recover => {
                warn!(
                    fields_kept = session.record.len(),
                    "Unrecognized phase, starting over"
                );
                session.phase = step.to;
                session.last_question = None;
                RECOVERY_MESSAGE.to_string()
            }
            Action::Collect => {
                session.phase = step.to;
                self.collect(session, message, access_key).await
            }
            Action::Submit => unreachable_submit(session),
        };

        session.history.push(ChatMessage::assistant(reply.clone()));
        reply
    }

    async fn collect(&self, session: &mut Session, message: &str, access_key: Option<&str>) -> String {
        patterns::extract(&mut session.record, message, session.last_question.as_deref());
        let extraction = self.orchestrator.run(session, message, access_key).await;

        let missing = session.record.missing_required();
        if !missing.is_empty() {
            info!(missing = ?missing, "Record incomplete, asking next question");
            return extraction.next_question;
        }

        let step = transition(session.phase, Event::RecordComplete);
        match step.action {
            Action::Submit => {
                session.phase = step.to;
                self.submit(session).await
            }
            other => {
                warn!(from = ?step.from, action = ?other, "Completed record did not lead to submission");
                extraction.next_question
            }
        }
    }

    async fn submit(&self, session: &mut Session) -> String {
        let payload = match SubmissionPayload::build(&session.record, Local::now().date_naive()) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "Record could not be finalized, continuing collection");
                session.phase = Phase::Collecting;
                let question = fallback_question(&session.record);
                session.last_question = Some(question.clone());
                return question;
            }
        };

        session.last_question = None;
        if self.sink.submit(&payload).await {
            info!(program_name = %payload.program_name, "Program update submitted");
            messages::submission_succeeded(&payload)
        } else {
            warn!(program_name = %payload.program_name, "Program update submission failed");
            messages::submission_failed(&payload)
        }
    }
}

/// `Submit` only fires on `RecordComplete`, never on an inbound message.
fn unreachable_submit(session: &mut Session) -> String {
    warn!(phase = ?session.phase, "Submit requested for an inbound message, starting over");
    session.phase = Phase::Intro;
    RECOVERY_MESSAGE.to_string()
}
