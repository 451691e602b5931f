//! Request and response bodies.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use weather_core::ProcessId;

#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    pub process_id: ProcessId,
    pub cities_ids: Vec<Value>,
}

#[derive(Debug, Deserialize)]
pub struct ProcessRequest {
    pub process_id: ProcessId,
}

#[derive(Debug, Deserialize)]
pub struct ProgressQuery {
    pub process_id: ProcessId,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
