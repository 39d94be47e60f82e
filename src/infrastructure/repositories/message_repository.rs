//! Message Sink Implementations
//!
//! PostgreSQL sink for relayed chat messages, and a logging sink used when no
//! database is configured.

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::domain::{ChatMessage, MessageSink};
use crate::shared::error::AppError;

/// PostgreSQL message sink.
pub struct PgMessageSink {
    pool: PgPool,
}

impl PgMessageSink {
    /// Creates a new PgMessageSink with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageSink for PgMessageSink {
    async fn persist(&self, message: ChatMessage) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO chat_messages (id, room_id, sender_id, body, sent_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(message.id)
        .bind(&message.room_id)
        .bind(&message.sender_id)
        .bind(Json(&message.body))
        .bind(message.sent_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Sink that only logs; relayed messages are not stored anywhere.
#[derive(Debug, Default, Clone)]
pub struct LoggingMessageSink;

#[async_trait]
impl MessageSink for LoggingMessageSink {
    async fn persist(&self, message: ChatMessage) -> Result<(), AppError> {
        tracing::debug!(
            message_id = %message.id,
            room_id = %message.room_id,
            sender_id = %message.sender_id,
            "Message relayed (persistence disabled)"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::Map;

    #[tokio::test]
    async fn test_logging_sink_always_succeeds() {
        let sink = LoggingMessageSink;
        let message = ChatMessage::new("r1".into(), "u1".into(), Map::new(), Utc::now());
        assert!(sink.persist(message).await.is_ok());
    }
}
