use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("generation record not found: {id}")]
    NotFound { id: String },

    #[error("audit log lock poisoned")]
    Poisoned,
}
