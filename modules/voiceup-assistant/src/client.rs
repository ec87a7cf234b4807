//! Client for the AI assistant collaborator.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use voiceup_common::{Config, VoiceUpError};

/// One free-text exchange with the assistant. Fallible independently of
/// the rest of the system.
#[async_trait]
pub trait Assistant: Send + Sync {
    async fn send(&self, message: &str) -> Result<String, VoiceUpError>;
}

#[derive(Serialize)]
struct AssistantRequest<'a> {
    message: &'a str,
}

#[derive(Deserialize)]
struct AssistantResponse {
    reply: Option<String>,
}

/// HTTP implementation against the assistant endpoint.
pub struct AssistantClient {
    http: reqwest::Client,
    endpoint: String,
}

impl AssistantClient {
    pub fn new(endpoint: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.assistant_url)
    }
}

#[async_trait]
impl Assistant for AssistantClient {
    async fn send(&self, message: &str) -> Result<String, VoiceUpError> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(&AssistantRequest { message })
            .send()
            .await
            .map_err(|e| VoiceUpError::Assistant(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response
                .text()
                .await
                .map_err(|e| VoiceUpError::Assistant(e.to_string()))?;
            return Err(VoiceUpError::Assistant(format!(
                "assistant request failed ({status}): {text}"
            )));
        }

        let body: AssistantResponse = response
            .json()
            .await
            .map_err(|e| VoiceUpError::Assistant(format!("malformed assistant response: {e}")))?;
        Ok(body.reply.unwrap_or_default())
    }
}
