use faebot_core::SamplingParams;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Midpoint of the 0–10 rating scale; every record starts here.
pub const NEUTRAL_RATING: u8 = 5;
pub const MAX_RATING: u8 = 10;

/// One generated reply, as stored in the `generations` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRecord {
    /// UUIDv7, time-sortable.
    pub id: String,
    pub channel: String,
    pub model: String,
    pub persona: String,
    pub params: SamplingParams,
    /// Full provider output, before any length trimming for chat.
    pub response: String,
    pub rating: u8,
    pub created_at: String,
}

impl GenerationRecord {
    pub fn new(
        channel: &str,
        model: &str,
        persona: &str,
        params: SamplingParams,
        response: &str,
    ) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            channel: channel.to_string(),
            model: model.to_string(),
            persona: persona.to_string(),
            params,
            response: response.to_string(),
            rating: NEUTRAL_RATING,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}
