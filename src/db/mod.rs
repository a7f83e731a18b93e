use std::str::FromStr;

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    FromRow, Pool, Sqlite,
};

use crate::models::{Message, MessageKind, Participant, BROADCAST_TARGET};
use crate::store::{MessageLog, ParticipantDirectory, StoreError};

pub type DbPool = Pool<Sqlite>;

/// SQLite-backed participant directory and message log
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
}

#[derive(FromRow)]
struct ParticipantRow {
    name: String,
    last_status: i64,
}

#[derive(FromRow)]
struct MessageRow {
    from_name: String,
    to_name: String,
    text: String,
    kind: String,
    time: String,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        let pool_options = if database_url.contains(":memory:") {
            // Every connection to an in-memory database is its own database,
            // so keep exactly one alive for the lifetime of the pool
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_options.connect_with(options).await?;

        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Helper to convert row to Message
    fn row_to_message(row: MessageRow) -> Result<Message, StoreError> {
        let kind = MessageKind::from_str(&row.kind)
            .map_err(|e| StoreError::Internal(format!("Invalid message kind '{}': {}", row.kind, e)))?;

        Ok(Message {
            from: row.from_name,
            to: row.to_name,
            text: row.text,
            kind,
            time: row.time,
        })
    }
}

impl ParticipantRow {
    fn into_participant(self) -> Participant {
        Participant {
            name: self.name,
            last_status: self.last_status,
        }
    }
}

#[async_trait]
impl ParticipantDirectory for Database {
    async fn upsert_if_absent(&self, name: &str, now_ms: i64) -> Result<Participant, StoreError> {
        let result = sqlx::query("INSERT INTO participants (name, last_status) VALUES (?, ?)")
            .bind(name)
            .bind(now_ms)
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(Participant::new(name, now_ms)),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(StoreError::Conflict(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn heartbeat(&self, name: &str, now_ms: i64) -> Result<i64, StoreError> {
        let last_status: Option<i64> = sqlx::query_scalar(
            "UPDATE participants SET last_status = MAX(?, last_status + 1) WHERE name = ? RETURNING last_status",
        )
        .bind(now_ms)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        last_status.ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    async fn find(&self, name: &str) -> Result<Option<Participant>, StoreError> {
        let row: Option<ParticipantRow> =
            sqlx::query_as("SELECT name, last_status FROM participants WHERE name = ?")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(ParticipantRow::into_participant))
    }

    async fn list_all(&self) -> Result<Vec<Participant>, StoreError> {
        let rows: Vec<ParticipantRow> = sqlx::query_as("SELECT name, last_status FROM participants")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(ParticipantRow::into_participant).collect())
    }

    async fn find_expired(&self, threshold: i64) -> Result<Vec<Participant>, StoreError> {
        let rows: Vec<ParticipantRow> =
            sqlx::query_as("SELECT name, last_status FROM participants WHERE last_status < ?")
                .bind(threshold)
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().map(ParticipantRow::into_participant).collect())
    }

    async fn delete_expired(&self, threshold: i64) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM participants WHERE last_status < ?")
            .bind(threshold)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl MessageLog for Database {
    async fn append(&self, message: &Message) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO messages (from_name, to_name, text, kind, time) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&message.from)
        .bind(&message.to)
        .bind(&message.text)
        .bind(message.kind.to_string())
        .bind(&message.time)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn query(&self, participant: &str) -> Result<Vec<Message>, StoreError> {
        let rows: Vec<MessageRow> = sqlx::query_as(
            "SELECT from_name, to_name, text, kind, time FROM messages
             WHERE from_name = ? OR to_name = ? OR to_name = ?
             ORDER BY id",
        )
        .bind(participant)
        .bind(participant)
        .bind(BROADCAST_TARGET)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_message).collect()
    }
}
