pub mod prediction_store;

pub use prediction_store::{JournalEntry, JournalStatus, PredictionStore};

use crate::error::{BlockcastError, Result};
use rusqlite::Connection;
use std::path::Path;
use tokio::sync::Mutex;

pub struct Storage {
    conn: Mutex<Connection>,
}

impl Storage {
    pub async fn new(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                BlockcastError::internal(format!("Failed to create directory: {}", e))
            })?;
        }

        let conn = Connection::open(db_path)?;
        let storage = Self {
            conn: Mutex::new(conn),
        };

        storage.init_schema().await?;
        Ok(storage)
    }

    async fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock().await;

        // One row per commitment this client has sent
        conn.execute(
            "CREATE TABLE IF NOT EXISTS predictions (
                chain_id INTEGER NOT NULL,
                predictor TEXT NOT NULL,
                target_block INTEGER NOT NULL,
                predicted_hash TEXT NOT NULL,
                submit_tx TEXT NOT NULL,
                submitted_at INTEGER NOT NULL,
                reveal_tx TEXT,
                actual_hash TEXT,
                is_correct INTEGER,
                revealed_at INTEGER,
                PRIMARY KEY (chain_id, predictor, target_block)
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_predictions_pending
             ON predictions (chain_id, predictor, revealed_at)",
            [],
        )?;

        Ok(())
    }

    pub async fn get_connection(&self) -> tokio::sync::MutexGuard<'_, Connection> {
        self.conn.lock().await
    }
}
