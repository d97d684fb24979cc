use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::BotError;

/// A service alert record. Fields vary between alerts and may be null, so the record is kept as
/// a plain JSON object rather than a fixed struct.
pub type Alert = Map<String, Value>;

#[derive(Debug, Deserialize)]
pub struct SnsEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<SnsEventRecord>,
}

#[derive(Debug, Deserialize)]
pub struct SnsEventRecord {
    #[serde(rename = "Sns")]
    pub sns: SnsMessage,
}

#[derive(Debug, Deserialize)]
pub struct SnsMessage {
    #[serde(rename = "Message")]
    pub message: String,
}

impl SnsEvent {
    pub fn from_value(event: &Value) -> Result<Self, BotError> {
        Self::deserialize(event).map_err(|e| BotError::Event(e.to_string()))
    }

    /// SNS delivers exactly one record per Lambda invocation, so only the first is read.
    pub fn into_message(self) -> Result<String, BotError> {
        let record_count = self.records.len();
        let mut records = self.records.into_iter();

        let first = records
            .next()
            .ok_or_else(|| BotError::Event("event contains no records".to_owned()))?;

        if record_count > 1 {
            warn!("Event contains {record_count} records, ignoring all but the first");
        }

        Ok(first.sns.message)
    }
}

pub fn parse_alerts(message: &str) -> Result<Vec<Alert>, BotError> {
    serde_json::from_str(message)
        .map_err(|e| BotError::Event(format!("message is not a list of alerts: {e}")))
}

#[derive(Debug, PartialEq, Serialize)]
pub struct ErrorData {
    pub error: String,
    pub message: String,
}

#[derive(Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HandlerResponse {
    pub status_code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ErrorData>,
}

impl HandlerResponse {
    pub fn ok() -> Self {
        Self {
            status_code: 200,
            data: None,
        }
    }

    pub fn failed(error: &BotError) -> Self {
        Self {
            status_code: 500,
            data: Some(ErrorData {
                error: error.kind().to_owned(),
                message: error.to_string(),
            }),
        }
    }
}

impl From<Result<(), BotError>> for HandlerResponse {
    fn from(result: Result<(), BotError>) -> Self {
        match result {
            Ok(()) => Self::ok(),
            Err(e) => Self::failed(&e),
        }
    }
}
