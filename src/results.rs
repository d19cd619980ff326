use crate::context::Record;
use serde::{Deserialize, Serialize};

/// One line of tap output: a record tagged with the stream it came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum RecordMessage {
    Record { stream: String, record: Record },
}

impl RecordMessage {
    pub fn new(stream: &str, record: Record) -> Self {
        Self::Record {
            stream: stream.to_string(),
            record,
        }
    }

    /// Serializes the message as a single JSON line
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
