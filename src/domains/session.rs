use serde::Serialize;

use crate::domains::answer::AnswerSource;

/// One chat session as surfaced to callers. `total_messages` is the
/// denormalized counter maintained by the session store.
#[derive(Debug, Clone, Serialize)]
pub struct ChatSession {
    pub id: i32,
    pub session_id: String,
    pub user_id: String,
    pub title: String,
    pub category: String,
    pub total_messages: i64,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub id: i32,
    pub message_id: String,
    pub session_id: String,
    pub user_id: String,
    pub question: String,
    pub answer: Option<String>,
    pub source: AnswerSource,
    pub timestamp: i64,
}
