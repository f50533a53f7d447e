//! Durable checkpoint store on SQLite, via `sqlx`.
//!
//! One append-only `checkpoints` table keyed by `(thread_id, seq)`; loads
//! return the newest row for a thread. Writes complete before the executor
//! reports the step done, so a crash loses at most the in-flight node.

mod schema;

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::Row;
use thiserror::Error;

use scriptorium_graph::{
    Checkpoint, CheckpointMetadata, Checkpointer, GraphError, GraphState, HistoryCheckpointer,
    InterruptPayload, StateSchema,
};

#[derive(Debug, Error)]
pub enum SqliteCheckpointError {
    #[error("invalid database url: {0}")]
    InvalidUrl(sqlx::Error),
    #[error("connection failed: {0}")]
    Connection(sqlx::Error),
    #[error("migration failed: {0}")]
    Migration(sqlx::Error),
}

#[derive(Debug, Clone)]
pub struct SqliteCheckpointer {
    pool: sqlx::SqlitePool,
}

#[derive(Debug, Clone)]
pub struct SqliteCheckpointerBuilder {
    database_url: String,
    max_connections: u32,
}

impl SqliteCheckpointer {
    pub fn builder(database_url: impl Into<String>) -> SqliteCheckpointerBuilder {
        SqliteCheckpointerBuilder {
            database_url: database_url.into(),
            max_connections: 1,
        }
    }
}

impl SqliteCheckpointerBuilder {
    /// Defaults to 1, which also keeps `sqlite::memory:` databases alive for
    /// the pool's lifetime.
    pub fn max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    pub async fn build(self) -> Result<SqliteCheckpointer, SqliteCheckpointError> {
        let options = SqliteConnectOptions::from_str(&self.database_url)
            .map_err(SqliteCheckpointError::InvalidUrl)?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(self.max_connections)
            .connect_with(options)
            .await
            .map_err(SqliteCheckpointError::Connection)?;

        for statement in schema::MIGRATION_STATEMENTS_SQL {
            sqlx::query(statement)
                .execute(&pool)
                .await
                .map_err(SqliteCheckpointError::Migration)?;
        }

        Ok(SqliteCheckpointer { pool })
    }
}

fn checkpoint_error(message: impl Into<String>) -> GraphError {
    GraphError::Checkpoint(message.into())
}

#[async_trait::async_trait]
impl<S: StateSchema> Checkpointer<S> for SqliteCheckpointer {
    async fn save(&self, checkpoint: &Checkpoint<S>) -> Result<(), GraphError> {
        let step = i64::try_from(checkpoint.step)
            .map_err(|_| checkpoint_error("checkpoint step does not fit into i64"))?;
        let state_json = serde_json::to_string(&checkpoint.state)
            .map_err(|err| checkpoint_error(err.to_string()))?;
        let interrupt_json = checkpoint
            .interrupt
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|err| checkpoint_error(err.to_string()))?;

        sqlx::query(schema::INSERT_CHECKPOINT_SQL)
            .bind(&checkpoint.thread_id)
            .bind(&checkpoint.thread_id)
            .bind(&checkpoint.created_at)
            .bind(&checkpoint.node)
            .bind(step)
            .bind(state_json)
            .bind(interrupt_json)
            .execute(&self.pool)
            .await
            .map_err(|err| checkpoint_error(err.to_string()))?;
        Ok(())
    }

    async fn load(&self, thread_id: &str) -> Result<Option<Checkpoint<S>>, GraphError> {
        let row = sqlx::query(schema::SELECT_LATEST_CHECKPOINT_SQL)
            .bind(thread_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| checkpoint_error(err.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let created_at: String = row
            .try_get("created_at")
            .map_err(|err| checkpoint_error(err.to_string()))?;
        let node: String = row
            .try_get("node")
            .map_err(|err| checkpoint_error(err.to_string()))?;
        let step: i64 = row
            .try_get("step")
            .map_err(|err| checkpoint_error(err.to_string()))?;
        let step = u64::try_from(step)
            .map_err(|_| checkpoint_error("checkpoint step is negative"))?;
        let state_json: String = row
            .try_get("state_json")
            .map_err(|err| checkpoint_error(err.to_string()))?;
        let state: GraphState<S> = serde_json::from_str(&state_json).map_err(|err| {
            checkpoint_error(format!("failed to deserialize checkpoint state: {err}"))
        })?;
        let interrupt_json: Option<String> = row
            .try_get("interrupt_json")
            .map_err(|err| checkpoint_error(err.to_string()))?;
        let interrupt: Option<InterruptPayload> = interrupt_json
            .map(|json| serde_json::from_str(&json))
            .transpose()
            .map_err(|err| {
                checkpoint_error(format!("failed to deserialize interrupt payload: {err}"))
            })?;

        Ok(Some(Checkpoint {
            thread_id: thread_id.to_string(),
            step,
            node,
            created_at,
            state,
            interrupt,
        }))
    }
}

#[async_trait::async_trait]
impl<S: StateSchema> HistoryCheckpointer<S> for SqliteCheckpointer {
    async fn list_checkpoints(
        &self,
        thread_id: &str,
    ) -> Result<Vec<CheckpointMetadata>, GraphError> {
        let rows = sqlx::query(schema::SELECT_CHECKPOINT_HISTORY_SQL)
            .bind(thread_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|err| checkpoint_error(err.to_string()))?;

        rows.into_iter()
            .map(|row| {
                let seq: i64 = row
                    .try_get("seq")
                    .map_err(|err| checkpoint_error(err.to_string()))?;
                let seq = u64::try_from(seq)
                    .map_err(|_| checkpoint_error("checkpoint seq is negative"))?;
                let created_at: String = row
                    .try_get("created_at")
                    .map_err(|err| checkpoint_error(err.to_string()))?;
                Ok(CheckpointMetadata { seq, created_at })
            })
            .collect()
    }
}
