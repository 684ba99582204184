//! `faebot-audit`: append-only record of every generated reply.
//!
//! Each successful or truncated generation becomes one row in the SQLite
//! `generations` table. Rows are never edited by the bot; the `rating` column
//! is the only field external review tooling may change (see
//! [`AuditLog::rate`]).

pub mod db;
pub mod error;
pub mod log;
pub mod types;

pub use error::AuditError;
pub use log::{AuditLog, AuditSink};
pub use types::{GenerationRecord, MAX_RATING, NEUTRAL_RATING};
