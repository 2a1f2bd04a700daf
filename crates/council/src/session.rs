//! External development-session boundary.
//!
//! The council only needs three operations from the session it watches:
//! list sessions, read a session's message history, post a message back.
//! Everything else about the external process (spawning, serving, UI) is
//! out of scope. Message content is carried in typed `parts`; only parts
//! of type `text` contribute to the textual content.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::advisor::Role;
use crate::error::CouncilError;

/// One entry from `list_sessions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    pub id: String,
    #[serde(default)]
    pub title: String,
}

/// One segment of a session message. Non-text parts (tool calls,
/// attachments) are preserved structurally but ignored by the council.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MessagePart {
    Text { text: String },
    #[serde(other)]
    Other,
}

/// One message in a session's ordered history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMessage {
    pub id: String,
    pub role: Role,
    #[serde(default)]
    pub parts: Vec<MessagePart>,
}

impl SessionMessage {
    /// Concatenated text content from all text parts.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                MessagePart::Text { text } => Some(text.as_str()),
                MessagePart::Other => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Pull-based view of the external session collaborator.
#[async_trait]
pub trait SessionClient: Send + Sync {
    async fn list_sessions(&self) -> Result<Vec<SessionInfo>, CouncilError>;

    async fn get_messages(&self, session_id: &str) -> Result<Vec<SessionMessage>, CouncilError>;

    async fn post_message(&self, session_id: &str, text: &str) -> Result<(), CouncilError>;
}

/// HTTP implementation against the session server's REST surface.
pub struct HttpSessionClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpSessionClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(15))
                .build()
                .expect("Failed to create HTTP client"),
        }
    }
}

fn unreachable_err(e: reqwest::Error) -> CouncilError {
    CouncilError::SessionUnreachable(e.to_string())
}

#[async_trait]
impl SessionClient for HttpSessionClient {
    async fn list_sessions(&self) -> Result<Vec<SessionInfo>, CouncilError> {
        let url = format!("{}/session", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(unreachable_err)?
            .error_for_status()
            .map_err(unreachable_err)?;
        response.json().await.map_err(unreachable_err)
    }

    async fn get_messages(&self, session_id: &str) -> Result<Vec<SessionMessage>, CouncilError> {
        let url = format!("{}/session/{}/message", self.base_url, session_id);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(unreachable_err)?
            .error_for_status()
            .map_err(unreachable_err)?;
        response.json().await.map_err(unreachable_err)
    }

    async fn post_message(&self, session_id: &str, text: &str) -> Result<(), CouncilError> {
        let url = format!("{}/session/{}/message", self.base_url, session_id);
        let body = serde_json::json!({
            "parts": [{"type": "text", "text": text}],
        });
        self.client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(unreachable_err)?
            .error_for_status()
            .map_err(unreachable_err)?;
        Ok(())
    }
}
