use thiserror::Error;

use crate::generate::GenerationError;
use crate::sanitize::TimestampError;

/// Failures that abort the remainder of a batch and are reported back to the caller.
#[derive(Debug, Error)]
pub enum BotError {
    #[error("invalid notification event: {0}")]
    Event(String),

    #[error(transparent)]
    Timestamp(#[from] TimestampError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("failed to serialize alert: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to archive alert: {0:#}")]
    Archive(anyhow::Error),

    #[error("failed to post status: {0:#}")]
    Post(anyhow::Error),
}

impl BotError {
    pub fn kind(&self) -> &'static str {
        match self {
            BotError::Event(_) => "EventError",
            BotError::Timestamp(_) => "TimestampError",
            BotError::Generation(e) => e.kind(),
            BotError::Serialize(_) => "SerializeError",
            BotError::Archive(_) => "ArchiveError",
            BotError::Post(_) => "PostError",
        }
    }
}
