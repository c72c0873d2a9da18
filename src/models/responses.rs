use serde::{Deserialize, Serialize};

/// Generic command reply: one short human-readable message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResponse {
    pub message: String,
}

impl CommandResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Reply for a find-match attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResponse {
    /// "matched" or "queued"
    pub outcome: String,
    pub message: String,
    #[serde(rename = "partnerId", skip_serializing_if = "Option::is_none")]
    pub partner_id: Option<String>,
    #[serde(rename = "channelRef", skip_serializing_if = "Option::is_none")]
    pub channel_ref: Option<String>,
}

/// Partner profile snapshot for get-match-info
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchInfoResponse {
    pub name: String,
    pub age: u8,
    pub gender: String,
    pub bio: String,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
