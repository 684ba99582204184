use std::sync::Mutex;

use faebot_core::SamplingParams;
use rusqlite::Connection;
use tracing::debug;

use crate::db::init_db;
use crate::error::AuditError;
use crate::types::{GenerationRecord, MAX_RATING};

/// Write side of the audit trail, as seen by the generation pipeline.
pub trait AuditSink: Send + Sync {
    /// Persist one record. Records are never rewritten afterwards.
    fn append(&self, record: &GenerationRecord) -> Result<(), AuditError>;
}

/// SQLite-backed audit log.
///
/// Thread-safe: wraps the connection in a `Mutex`. Writes are a single small
/// INSERT, so contention between concurrent generations is negligible.
pub struct AuditLog {
    db: Mutex<Connection>,
}

impl AuditLog {
    /// Wrap a connection, creating the schema if needed.
    pub fn new(conn: Connection) -> Result<Self, AuditError> {
        init_db(&conn)?;
        Ok(Self {
            db: Mutex::new(conn),
        })
    }

    /// Set the quality rating of a stored generation (clamped to 0–10).
    pub fn rate(&self, id: &str, rating: u8) -> Result<(), AuditError> {
        let db = self.db.lock().map_err(|_| AuditError::Poisoned)?;
        let n = db.execute(
            "UPDATE generations SET rating = ?1 WHERE id = ?2",
            rusqlite::params![rating.min(MAX_RATING), id],
        )?;
        if n == 0 {
            return Err(AuditError::NotFound { id: id.to_string() });
        }
        Ok(())
    }

    /// Most recent generations for a channel, newest first.
    pub fn recent(&self, channel: &str, limit: usize) -> Result<Vec<GenerationRecord>, AuditError> {
        let db = self.db.lock().map_err(|_| AuditError::Poisoned)?;
        let mut stmt = db.prepare(
            "SELECT id, channel, model, persona, temperature, top_p, top_k, seed,
                    max_new_tokens, response, rating, created_at
             FROM generations
             WHERE channel = ?1
             ORDER BY created_at DESC, id DESC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(rusqlite::params![channel, limit], row_to_record)?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }
}

impl AuditSink for AuditLog {
    fn append(&self, record: &GenerationRecord) -> Result<(), AuditError> {
        let db = self.db.lock().map_err(|_| AuditError::Poisoned)?;
        db.execute(
            "INSERT INTO generations
             (id, channel, model, persona, temperature, top_p, top_k, seed,
              max_new_tokens, response, rating, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            rusqlite::params![
                record.id,
                record.channel,
                record.model,
                record.persona,
                record.params.temperature,
                record.params.top_p,
                record.params.top_k,
                record.params.seed,
                record.params.max_new_tokens,
                record.response,
                record.rating,
                record.created_at,
            ],
        )?;
        debug!(id = %record.id, channel = %record.channel, "generation recorded");
        Ok(())
    }
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<GenerationRecord> {
    Ok(GenerationRecord {
        id: row.get(0)?,
        channel: row.get(1)?,
        model: row.get(2)?,
        persona: row.get(3)?,
        params: SamplingParams {
            temperature: row.get(4)?,
            top_p: row.get(5)?,
            top_k: row.get(6)?,
            seed: row.get(7)?,
            max_new_tokens: row.get(8)?,
        },
        response: row.get(9)?,
        rating: row.get(10)?,
        created_at: row.get(11)?,
    })
}
