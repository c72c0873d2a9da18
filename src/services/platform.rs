use crate::services::gateway::{ChannelProvisioner, GatewayError, NotificationGateway};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// HTTP client for the host chat platform
///
/// Implements both gateway contracts against the platform's REST API:
/// - Creating/deleting private spaces for matched pairs
/// - Delivering direct messages
pub struct PlatformClient {
    base_url: String,
    api_token: String,
    /// Parent space (category) under which private channels are created
    space_parent: Option<String>,
    client: reqwest::Client,
}

impl PlatformClient {
    pub fn new(
        base_url: String,
        api_token: String,
        space_parent: Option<String>,
    ) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            base_url,
            api_token,
            space_parent,
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl ChannelProvisioner for PlatformClient {
    async fn create_private_space(
        &self,
        participant_ids: &[String],
    ) -> Result<String, GatewayError> {
        let name = format!("blind-date-{}", participant_ids.join("-"));
        let payload = serde_json::json!({
            "name": name,
            "parent": self.space_parent,
            "participantIds": participant_ids,
        });

        tracing::debug!("Creating private space for {:?}", participant_ids);

        let response = self
            .client
            .post(self.url("spaces"))
            .bearer_auth(&self.api_token)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GatewayError::Api(format!(
                "Failed to create private space: {}",
                response.status()
            )));
        }

        let json: Value = response.json().await?;
        json.get("id")
            .and_then(|id| id.as_str())
            .map(|id| id.to_string())
            .ok_or_else(|| GatewayError::InvalidResponse("Missing space id".into()))
    }

    async fn destroy(&self, channel_ref: &str) -> Result<(), GatewayError> {
        let encoded = urlencoding::encode(channel_ref);
        let response = self
            .client
            .delete(self.url(&format!("spaces/{}", encoded)))
            .bearer_auth(&self.api_token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GatewayError::Api(format!(
                "Failed to destroy space {}: {}",
                channel_ref,
                response.status()
            )));
        }

        tracing::debug!("Destroyed private space {}", channel_ref);
        Ok(())
    }
}

#[async_trait]
impl NotificationGateway for PlatformClient {
    async fn send(&self, user_id: &str, text: &str) -> Result<(), GatewayError> {
        let encoded = urlencoding::encode(user_id);
        let payload = serde_json::json!({ "content": text });

        let response = self
            .client
            .post(self.url(&format!("users/{}/messages", encoded)))
            .bearer_auth(&self.api_token)
            .json(&payload)
            .send()
            .await?;

        // Users can disable direct messages; the platform reports 403
        if response.status() == reqwest::StatusCode::FORBIDDEN {
            return Err(GatewayError::Unreachable(user_id.to_string()));
        }

        if !response.status().is_success() {
            return Err(GatewayError::Api(format!(
                "Failed to send message to {}: {}",
                user_id,
                response.status()
            )));
        }

        Ok(())
    }
}
