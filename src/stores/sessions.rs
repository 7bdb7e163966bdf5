use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};

use crate::domains::answer::AnswerSource;
use crate::domains::session::{ChatMessage, ChatSession};
use crate::error::{ArborBotError, Result};
use crate::stores::schema::{chat_messages, chat_sessions};
use crate::stores::{connect, now_ts, SqlitePool, SqlitePooledConn};

#[derive(Queryable)]
struct SessionRow {
    id: i32,
    session_id: String,
    user_id: String,
    title: String,
    category: String,
    total_messages: i64,
    is_active: bool,
    created_at: i64,
    updated_at: i64,
}

#[derive(Queryable)]
struct MessageRow {
    id: i32,
    message_id: String,
    session_id: String,
    user_id: String,
    question: String,
    answer: Option<String>,
    source: String,
    timestamp: i64,
}

#[derive(Insertable)]
#[diesel(table_name = chat_sessions)]
struct NewSession<'a> {
    session_id: &'a str,
    user_id: &'a str,
    title: &'a str,
    category: &'a str,
    total_messages: i64,
    is_active: bool,
    created_at: i64,
    updated_at: i64,
}

#[derive(Insertable)]
#[diesel(table_name = chat_messages)]
struct NewMessage<'a> {
    message_id: &'a str,
    session_id: &'a str,
    user_id: &'a str,
    question: &'a str,
    answer: Option<&'a str>,
    source: &'a str,
    timestamp: i64,
}

/// Chat session and message persistence. The session row carries a
/// denormalized `total_messages` counter; every write that touches message
/// rows updates it in the same transaction.
pub struct SessionStore {
    pool: SqlitePool,
}

impl SessionStore {
    pub async fn new(sqlite_path: impl AsRef<str>) -> Result<Self> {
        let pool = connect(sqlite_path.as_ref()).await?;
        Ok(Self { pool })
    }

    async fn conn(&self) -> Result<SqlitePooledConn<'_>> {
        self.pool
            .get()
            .await
            .map_err(|e| ArborBotError::Runtime(e.to_string()))
    }

    pub async fn create_session(
        &self,
        user_id: &str,
        title: &str,
        category: &str,
    ) -> Result<ChatSession> {
        let now = now_ts();
        let session_id = new_token("sess");
        let new = NewSession {
            session_id: &session_id,
            user_id,
            title,
            category,
            total_messages: 0,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        let mut conn = self.conn().await?;
        diesel::insert_into(chat_sessions::table)
            .values(&new)
            .execute(&mut conn)
            .await?;
        let row: SessionRow = chat_sessions::table
            .filter(chat_sessions::session_id.eq(&session_id))
            .first(&mut conn)
            .await?;
        Ok(map_session(row))
    }

    pub async fn get_session(&self, session_id: &str) -> Result<ChatSession> {
        let mut conn = self.conn().await?;
        let row: Option<SessionRow> = chat_sessions::table
            .filter(chat_sessions::session_id.eq(session_id))
            .first(&mut conn)
            .await
            .optional()?;
        row.map(map_session)
            .ok_or_else(|| ArborBotError::NotFound(format!("session {session_id}")))
    }

    /// Active sessions only, most recently touched first.
    pub async fn list_sessions(&self, user_id: &str) -> Result<Vec<ChatSession>> {
        let mut conn = self.conn().await?;
        let rows: Vec<SessionRow> = chat_sessions::table
            .filter(chat_sessions::user_id.eq(user_id))
            .filter(chat_sessions::is_active.eq(true))
            .order((chat_sessions::updated_at.desc(), chat_sessions::id.desc()))
            .load(&mut conn)
            .await?;
        Ok(rows.into_iter().map(map_session).collect())
    }

    /// Inserts the message and bumps the session counter as one transaction.
    /// `answer`/`source` may be absent when the question is logged before the
    /// pipeline resolves it; see [`SessionStore::complete_message`].
    pub async fn append_message(
        &self,
        session_id: &str,
        user_id: &str,
        question: &str,
        answer: Option<&str>,
        source: Option<AnswerSource>,
    ) -> Result<ChatMessage> {
        let now = now_ts();
        let message_id = new_token("msg");
        let source = source.unwrap_or(AnswerSource::Unknown);

        let mut conn = self.conn().await?;
        let row = conn
            .transaction::<_, ArborBotError, _>(|conn| {
                let message_id = message_id.clone();
                async move {
                    let exists: Option<i32> = chat_sessions::table
                        .filter(chat_sessions::session_id.eq(session_id))
                        .select(chat_sessions::id)
                        .first(conn)
                        .await
                        .optional()?;
                    if exists.is_none() {
                        return Err(ArborBotError::NotFound(format!("session {session_id}")));
                    }

                    let new = NewMessage {
                        message_id: &message_id,
                        session_id,
                        user_id,
                        question,
                        answer,
                        source: source.as_str(),
                        timestamp: now,
                    };
                    diesel::insert_into(chat_messages::table)
                        .values(&new)
                        .execute(conn)
                        .await?;

                    diesel::update(
                        chat_sessions::table.filter(chat_sessions::session_id.eq(session_id)),
                    )
                    .set((
                        chat_sessions::total_messages.eq(chat_sessions::total_messages + 1i64),
                        chat_sessions::updated_at.eq(now),
                    ))
                    .execute(conn)
                    .await?;

                    let row: MessageRow = chat_messages::table
                        .filter(chat_messages::message_id.eq(&message_id))
                        .first(conn)
                        .await?;
                    Ok(row)
                }
                .scope_boxed()
            })
            .await?;
        Ok(map_message(row))
    }

    /// Fills in the answer and source of an already-logged question. Does not
    /// touch the counter: the row was counted when it was appended.
    pub async fn complete_message(
        &self,
        message_id: &str,
        answer: &str,
        source: AnswerSource,
    ) -> Result<()> {
        let mut conn = self.conn().await?;
        let updated = diesel::update(
            chat_messages::table.filter(chat_messages::message_id.eq(message_id)),
        )
        .set((
            chat_messages::answer.eq(Some(answer)),
            chat_messages::source.eq(source.as_str()),
        ))
        .execute(&mut conn)
        .await?;
        if updated == 0 {
            return Err(ArborBotError::NotFound(format!("message {message_id}")));
        }
        Ok(())
    }

    /// Chronological replay order.
    pub async fn get_messages(&self, session_id: &str) -> Result<Vec<ChatMessage>> {
        self.get_session(session_id).await?;
        let mut conn = self.conn().await?;
        let rows: Vec<MessageRow> = chat_messages::table
            .filter(chat_messages::session_id.eq(session_id))
            .order((chat_messages::timestamp.asc(), chat_messages::id.asc()))
            .load(&mut conn)
            .await?;
        Ok(rows.into_iter().map(map_message).collect())
    }

    /// Metadata-only mutation; never touches message rows.
    pub async fn update_session(
        &self,
        session_id: &str,
        title: &str,
        category: Option<&str>,
    ) -> Result<ChatSession> {
        let mut conn = self.conn().await?;
        let updated = diesel::update(
            chat_sessions::table.filter(chat_sessions::session_id.eq(session_id)),
        )
        .set((
            chat_sessions::title.eq(title),
            chat_sessions::category.eq(category.unwrap_or("General")),
            chat_sessions::updated_at.eq(now_ts()),
        ))
        .execute(&mut conn)
        .await?;
        if updated == 0 {
            return Err(ArborBotError::NotFound(format!("session {session_id}")));
        }
        drop(conn);
        self.get_session(session_id).await
    }

    /// Soft delete: the session drops out of listings but stays on disk, and
    /// its messages are retained.
    pub async fn delete_session(&self, session_id: &str) -> Result<()> {
        let mut conn = self.conn().await?;
        let updated = diesel::update(
            chat_sessions::table.filter(chat_sessions::session_id.eq(session_id)),
        )
        .set((
            chat_sessions::is_active.eq(false),
            chat_sessions::updated_at.eq(now_ts()),
        ))
        .execute(&mut conn)
        .await?;
        if updated == 0 {
            return Err(ArborBotError::NotFound(format!("session {session_id}")));
        }
        Ok(())
    }

    /// Hard-deletes every message in the session and resets the counter, in
    /// one transaction. Returns the number of rows removed.
    pub async fn clear_messages(&self, session_id: &str) -> Result<usize> {
        let now = now_ts();
        let mut conn = self.conn().await?;
        conn.transaction::<_, ArborBotError, _>(|conn| {
            async move {
                let exists: Option<i32> = chat_sessions::table
                    .filter(chat_sessions::session_id.eq(session_id))
                    .select(chat_sessions::id)
                    .first(conn)
                    .await
                    .optional()?;
                if exists.is_none() {
                    return Err(ArborBotError::NotFound(format!("session {session_id}")));
                }

                let deleted = diesel::delete(
                    chat_messages::table.filter(chat_messages::session_id.eq(session_id)),
                )
                .execute(conn)
                .await?;

                diesel::update(
                    chat_sessions::table.filter(chat_sessions::session_id.eq(session_id)),
                )
                .set((
                    chat_sessions::total_messages.eq(0i64),
                    chat_sessions::updated_at.eq(now),
                ))
                .execute(conn)
                .await?;

                Ok(deleted)
            }
            .scope_boxed()
        })
        .await
    }

    /// Audits the denormalized counter against the true row count. Drift is a
    /// defect: it is logged at error level and returned, never swallowed.
    pub async fn verify_total_messages(&self, session_id: &str) -> Result<()> {
        let session = self.get_session(session_id).await?;
        let mut conn = self.conn().await?;
        let rows: i64 = chat_messages::table
            .filter(chat_messages::session_id.eq(session_id))
            .count()
            .get_result(&mut conn)
            .await?;
        if session.total_messages != rows {
            tracing::error!(
                session_id,
                counter = session.total_messages,
                rows,
                "message counter drift detected"
            );
            return Err(ArborBotError::CounterConsistency {
                session_id: session_id.to_string(),
                counter: session.total_messages,
                rows,
            });
        }
        Ok(())
    }
}

fn new_token(prefix: &str) -> String {
    let hex = uuid::Uuid::new_v4().simple().to_string();
    format!("{prefix}_{}", &hex[..16])
}

fn map_session(row: SessionRow) -> ChatSession {
    ChatSession {
        id: row.id,
        session_id: row.session_id,
        user_id: row.user_id,
        title: row.title,
        category: row.category,
        total_messages: row.total_messages,
        is_active: row.is_active,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

fn map_message(row: MessageRow) -> ChatMessage {
    ChatMessage {
        id: row.id,
        message_id: row.message_id,
        session_id: row.session_id,
        user_id: row.user_id,
        question: row.question,
        answer: row.answer,
        source: AnswerSource::parse(&row.source),
        timestamp: row.timestamp,
    }
}

#[cfg(test)]
mod tests {
    use super::new_token;

    #[test]
    fn tokens_are_prefixed_and_unique() {
        let a = new_token("sess");
        let b = new_token("sess");
        assert!(a.starts_with("sess_"));
        assert_eq!(a.len(), "sess_".len() + 16);
        assert_ne!(a, b);
    }
}
