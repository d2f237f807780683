//! Test doubles for the model backend and the report sink.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::{
    error::{IntakeError, Result},
    llm::{CompletionBackend, CompletionRequest},
    schema::{Field, FieldValue, ProgramRecord, ProgramStatus},
    submission::SubmissionPayload,
    webhook::ReportSink,
};

/// Replays canned model replies in order, then fails.
#[derive(Default)]
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<String>>,
    requests: Mutex<Vec<CompletionRequest>>,
    delay: Option<Duration>,
}

impl ScriptedBackend {
    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    /// A backend whose every call fails.
    pub fn failing() -> Self {
        Self::default()
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl CompletionBackend for ScriptedBackend {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let reply = self.replies.lock().unwrap().pop_front();
        reply.ok_or_else(|| IntakeError::ModelCallFailed("connection refused".to_string()))
    }
}

/// Records every submitted payload and answers with a fixed outcome.
pub struct RecordingSink {
    accept: bool,
    payloads: Mutex<Vec<SubmissionPayload>>,
}

impl RecordingSink {
    pub fn accepting() -> Self {
        Self {
            accept: true,
            payloads: Mutex::new(Vec::new()),
        }
    }

    pub fn rejecting() -> Self {
        Self {
            accept: false,
            payloads: Mutex::new(Vec::new()),
        }
    }

    pub fn payloads(&self) -> Vec<SubmissionPayload> {
        self.payloads.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReportSink for RecordingSink {
    async fn submit(&self, payload: &SubmissionPayload) -> bool {
        self.payloads.lock().unwrap().push(payload.clone());
        self.accept
    }
}

/// A record with every required field present.
pub fn complete_record() -> ProgramRecord {
    let mut record = ProgramRecord::new();
    record.set(Field::ProgramName, FieldValue::text("Apollo"));
    record.set(Field::ProgramManager, FieldValue::text("Jane Doe"));
    record.set(Field::ProgramManagerEmail, FieldValue::text("jane@x.com"));
    record.set(Field::SponsorName, FieldValue::text("Mike"));
    record.set(Field::OverallStatus, FieldValue::Status(ProgramStatus::OnTrack));
    record.set(Field::StatusCommentary, FieldValue::text("Design finished early"));
    record.set(Field::KeyAccomplishments, FieldValue::text("Kickoff done"));
    record.set(
        Field::UpcomingMilestones,
        FieldValue::List(vec!["Design review".into(), "Pilot".into()]),
    );
    record.set(Field::TotalBudget, FieldValue::Integer(500_000));
    record.set(Field::BudgetSpent, FieldValue::Integer(200_000));
    record.set(Field::OpenRisks, FieldValue::Integer(0));
    record.set(Field::OpenIssues, FieldValue::Integer(2));
    record.set(Field::OpenAssumptions, FieldValue::Integer(1));
    record.set(Field::OpenDependencies, FieldValue::Integer(0));
    record
}
