use async_trait::async_trait;
use thiserror::Error;

/// Errors from the host-platform collaborators
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("platform API returned error: {0}")]
    Api(String),

    #[error("user unreachable: {0}")]
    Unreachable(String),

    #[error("invalid response format: {0}")]
    InvalidResponse(String),
}

/// Creates and tears down private spaces on the host chat platform
///
/// Creation failure makes the matchmaker roll back match formation;
/// destroy failures are logged and never block a ledger mutation.
#[async_trait]
pub trait ChannelProvisioner: Send + Sync {
    /// Provision a private space for the given participants, returning an
    /// opaque channel reference
    async fn create_private_space(
        &self,
        participant_ids: &[String],
    ) -> Result<String, GatewayError>;

    /// Tear down a previously provisioned space
    async fn destroy(&self, channel_ref: &str) -> Result<(), GatewayError>;
}

/// Delivers direct messages to users
///
/// Failures are cosmetic: the matchmaker logs and swallows them.
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    async fn send(&self, user_id: &str, text: &str) -> Result<(), GatewayError>;
}
