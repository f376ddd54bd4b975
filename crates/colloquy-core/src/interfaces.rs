//! Capability contracts between the exchange pipeline and its collaborators.
//!
//! Implemented in `colloquy-ai` by the HTTP and local adapters, and by the
//! scripted fakes in [`crate::mock`] for tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{MirrorError, Unavailable};
use crate::exchange::{Exchange, ExchangeStatus, FilterVerdict, PolicySet};

/// Moderation check run on both user input and generated output.
#[async_trait]
pub trait ContentFilter: Send + Sync {
    async fn check(&self, text: &str, policies: &PolicySet) -> Result<FilterVerdict, Unavailable>;
}

/// Text generation. Session-wide parameters are fixed at construction.
#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    /// One attempt; no retry.
    async fn generate(&self, prompt: &str) -> Result<String, Unavailable>;
}

/// Fire-and-forget copy of resolved exchanges to an external store.
#[async_trait]
pub trait MirrorSink: Send + Sync {
    async fn mirror(&self, record: &MirrorRecord) -> Result<(), MirrorError>;
}

/// Parameters shared by every generation call in a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub system_instructions: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Owned snapshot of an exchange handed to a mirror sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MirrorRecord {
    pub id: Uuid,
    pub user_message: String,
    pub bot_response: String,
    pub status: ExchangeStatus,
    pub ts: DateTime<Utc>,
}

impl From<&Exchange> for MirrorRecord {
    fn from(exchange: &Exchange) -> Self {
        Self {
            id: exchange.id,
            user_message: exchange.user_message.clone(),
            bot_response: exchange.bot_response.clone(),
            status: exchange.status,
            ts: exchange.created_at,
        }
    }
}
