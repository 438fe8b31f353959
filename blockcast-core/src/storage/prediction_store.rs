use crate::error::Result;
use crate::storage::Storage;
use crate::types::{
    format_address, format_hash, parse_address, parse_hash, PredictionCommitment, PredictionKey,
    PredictionRecord,
};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use web3::types::{Address, H256};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JournalStatus {
    Pending,
    Revealed { is_correct: bool },
}

/// Local record of a prediction sent from this client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub predictor: Address,
    pub target_block: u64,
    pub predicted_hash: H256,
    pub submit_tx: H256,
    pub submitted_at: DateTime<Utc>,
    pub reveal_tx: Option<H256>,
    pub actual_hash: Option<H256>,
    pub status: JournalStatus,
    pub revealed_at: Option<DateTime<Utc>>,
}

impl JournalEntry {
    pub fn key(&self) -> PredictionKey {
        PredictionKey::new(self.predictor, self.target_block)
    }

    pub fn is_pending(&self) -> bool {
        self.status == JournalStatus::Pending
    }
}

const ENTRY_COLUMNS: &str = "predictor, target_block, predicted_hash, submit_tx, submitted_at, \
                             reveal_tx, actual_hash, is_correct, revealed_at";

pub struct PredictionStore<'a> {
    storage: &'a Storage,
    chain_id: u64,
}

impl<'a> PredictionStore<'a> {
    pub fn new(storage: &'a Storage, chain_id: u64) -> Self {
        Self { storage, chain_id }
    }

    /// Record a commitment once its submit transaction has been sent.
    pub async fn record_submission(
        &self,
        commitment: &PredictionCommitment,
        submit_tx: H256,
    ) -> Result<()> {
        let conn = self.storage.get_connection().await;

        conn.execute(
            "INSERT OR REPLACE INTO predictions
             (chain_id, predictor, target_block, predicted_hash, submit_tx, submitted_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                self.chain_id as i64,
                format_address(&commitment.predictor),
                commitment.target_block as i64,
                format_hash(&commitment.predicted_hash),
                format_hash(&submit_tx),
                Utc::now().timestamp(),
            ],
        )?;

        tracing::debug!("Journaled prediction {}", commitment.key());
        Ok(())
    }

    /// Move a journaled submission to the target its receipt reported.
    pub async fn confirm_submission(
        &self,
        sent: &PredictionKey,
        commitment: &PredictionCommitment,
        submit_tx: H256,
    ) -> Result<()> {
        if *sent != commitment.key() {
            let conn = self.storage.get_connection().await;
            conn.execute(
                "DELETE FROM predictions
                 WHERE chain_id = ?1 AND predictor = ?2 AND target_block = ?3 AND submit_tx = ?4",
                params![
                    self.chain_id as i64,
                    format_address(&sent.predictor),
                    sent.target_block as i64,
                    format_hash(&submit_tx),
                ],
            )?;
            tracing::debug!(
                "Journaled prediction moved from block {} to {}",
                sent.target_block,
                commitment.target_block
            );
        }

        self.record_submission(commitment, submit_tx).await
    }

    /// Store the revealed outcome. Returns false if the key was never journaled.
    pub async fn mark_revealed(
        &self,
        key: &PredictionKey,
        record: &PredictionRecord,
        reveal_tx: Option<H256>,
    ) -> Result<bool> {
        let conn = self.storage.get_connection().await;

        let updated = conn.execute(
            "UPDATE predictions
             SET reveal_tx = COALESCE(?1, reveal_tx), actual_hash = ?2, is_correct = ?3, revealed_at = ?4
             WHERE chain_id = ?5 AND predictor = ?6 AND target_block = ?7",
            params![
                reveal_tx.map(|tx| format_hash(&tx)),
                format_hash(&record.actual_hash),
                record.is_correct,
                Utc::now().timestamp(),
                self.chain_id as i64,
                format_address(&key.predictor),
                key.target_block as i64,
            ],
        )?;

        Ok(updated > 0)
    }

    pub async fn get(&self, key: &PredictionKey) -> Result<Option<JournalEntry>> {
        let conn = self.storage.get_connection().await;

        let entry = conn
            .query_row(
                &format!(
                    "SELECT {} FROM predictions
                     WHERE chain_id = ?1 AND predictor = ?2 AND target_block = ?3",
                    ENTRY_COLUMNS
                ),
                params![
                    self.chain_id as i64,
                    format_address(&key.predictor),
                    key.target_block as i64
                ],
                entry_from_row,
            )
            .optional()?;

        Ok(entry)
    }

    /// Predictions from `predictor` still waiting for a reveal, oldest first.
    pub async fn list_pending(&self, predictor: &Address) -> Result<Vec<JournalEntry>> {
        self.query_entries(predictor, "AND revealed_at IS NULL ORDER BY target_block ASC")
            .await
    }

    /// Every journaled prediction from `predictor`, newest first.
    pub async fn list_all(&self, predictor: &Address) -> Result<Vec<JournalEntry>> {
        self.query_entries(predictor, "ORDER BY target_block DESC")
            .await
    }

    async fn query_entries(&self, predictor: &Address, tail: &str) -> Result<Vec<JournalEntry>> {
        let conn = self.storage.get_connection().await;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM predictions WHERE chain_id = ?1 AND predictor = ?2 {}",
            ENTRY_COLUMNS, tail
        ))?;

        let rows = stmt.query_map(
            params![self.chain_id as i64, format_address(predictor)],
            entry_from_row,
        )?;

        let mut entries = Vec::new();
        for entry in rows {
            entries.push(entry?);
        }

        Ok(entries)
    }
}

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<JournalEntry> {
    let predictor: String = row.get(0)?;
    let target_block: i64 = row.get(1)?;
    let predicted_hash: String = row.get(2)?;
    let submit_tx: String = row.get(3)?;
    let submitted_at: i64 = row.get(4)?;
    let reveal_tx: Option<String> = row.get(5)?;
    let actual_hash: Option<String> = row.get(6)?;
    let is_correct: Option<bool> = row.get(7)?;
    let revealed_at: Option<i64> = row.get(8)?;

    let status = match (revealed_at, is_correct) {
        (Some(_), Some(is_correct)) => JournalStatus::Revealed { is_correct },
        _ => JournalStatus::Pending,
    };

    Ok(JournalEntry {
        predictor: parse_address(&predictor).map_err(|_| bad_column(0, "predictor"))?,
        target_block: target_block as u64,
        predicted_hash: parse_hash(&predicted_hash).map_err(|_| bad_column(2, "predicted_hash"))?,
        submit_tx: parse_hash(&submit_tx).map_err(|_| bad_column(3, "submit_tx"))?,
        submitted_at: DateTime::from_timestamp(submitted_at, 0).unwrap_or_else(Utc::now),
        reveal_tx: reveal_tx
            .map(|tx| parse_hash(&tx))
            .transpose()
            .map_err(|_| bad_column(5, "reveal_tx"))?,
        actual_hash: actual_hash
            .map(|hash| parse_hash(&hash))
            .transpose()
            .map_err(|_| bad_column(6, "actual_hash"))?,
        status,
        revealed_at: revealed_at.and_then(|ts| DateTime::from_timestamp(ts, 0)),
    })
}

fn bad_column(index: usize, name: &str) -> rusqlite::Error {
    rusqlite::Error::InvalidColumnType(index, name.to_string(), rusqlite::types::Type::Text)
}
