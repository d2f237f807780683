use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{dialogue::Phase, error::Result, schema::ProgramRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// One turn of conversation history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Conversation state for a single user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    pub phase: Phase,
    pub record: ProgramRecord,
    /// The follow-up question most recently sent to the user
    pub last_question: Option<String>,
    pub history: Vec<ChatMessage>,
}

impl Session {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            phase: Phase::Intro,
            record: ProgramRecord::new(),
            last_question: None,
            history: Vec::new(),
        }
    }

    /// Returns the session to its initial state, keeping the user id.
    pub fn reset(&mut self) {
        *self = Session::new(std::mem::take(&mut self.user_id));
    }
}

/// Trait for storing and retrieving conversation sessions
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn save(&self, session: Session) -> Result<()>;
    async fn get(&self, user_id: &str) -> Result<Option<Session>>;
    async fn delete(&self, user_id: &str) -> Result<()>;

    /// Loads the session for `user_id`, creating and storing a fresh one on first contact.
    async fn get_or_create(&self, user_id: &str) -> Result<Session> {
        if let Some(session) = self.get(user_id).await? {
            return Ok(session);
        }
        let session = Session::new(user_id);
        self.save(session.clone()).await?;
        Ok(session)
    }

    /// Replaces the stored session with a fresh one.
    async fn reset(&self, user_id: &str) -> Result<Session> {
        let session = Session::new(user_id);
        self.save(session.clone()).await?;
        Ok(session)
    }
}

/// In-memory implementation of SessionStore. State is lost on restart.
#[derive(Clone, Default)]
pub struct InMemorySessionStore {
    sessions: Arc<DashMap<String, Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn save(&self, session: Session) -> Result<()> {
        self.sessions.insert(session.user_id.clone(), session);
        Ok(())
    }

    async fn get(&self, user_id: &str) -> Result<Option<Session>> {
        Ok(self.sessions.get(user_id).map(|entry| entry.clone()))
    }

    async fn delete(&self, user_id: &str) -> Result<()> {
        self.sessions.remove(user_id);
        Ok(())
    }
}
