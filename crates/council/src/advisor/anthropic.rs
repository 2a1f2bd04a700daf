//! Anthropic messages adapter.
//!
//! The messages API takes system instructions as a top-level field and
//! requires user/assistant turns to alternate. `normalize` extracts system
//! content and merges consecutive same-role messages so the debate engine
//! never has to know about either constraint.

use std::time::Duration;

use async_trait::async_trait;

use super::{Advisor, AdvisorConfig, Message, Role};
use crate::error::AdvisorError;

pub struct AnthropicAdvisor {
    config: AdvisorConfig,
    api_key: Option<String>,
    client: reqwest::Client,
}

/// Conversation reshaped for the messages API.
struct Normalized {
    system: Option<String>,
    turns: Vec<Message>,
}

/// Extract system content and enforce user/assistant alternation.
fn normalize(messages: &[Message]) -> Normalized {
    let mut system_parts: Vec<&str> = Vec::new();
    let mut turns: Vec<Message> = Vec::new();

    for msg in messages {
        match msg.role {
            Role::System => system_parts.push(&msg.content),
            role => match turns.last_mut() {
                Some(prev) if prev.role == role => {
                    prev.content.push_str("\n\n");
                    prev.content.push_str(&msg.content);
                }
                _ => turns.push(msg.clone()),
            },
        }
    }

    // The API rejects a conversation that opens with an assistant turn.
    if turns.first().map(|m| m.role) == Some(Role::Assistant) {
        turns.insert(0, Message::user("(continue)"));
    }
    if turns.is_empty() {
        turns.push(Message::user("(no content)"));
    }

    let system = if system_parts.is_empty() {
        None
    } else {
        Some(system_parts.join("\n\n"))
    };
    Normalized { system, turns }
}

impl AnthropicAdvisor {
    pub fn new(config: AdvisorConfig) -> Self {
        let api_key = config.resolve_api_key();
        Self {
            config,
            api_key,
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(120))
                .build()
                .expect("Failed to create HTTP client"),
        }
    }
}

#[async_trait]
impl Advisor for AnthropicAdvisor {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    async fn chat(&self, messages: &[Message]) -> Result<String, AdvisorError> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| AdvisorError::MissingApiKey(self.config.name.clone()))?;

        let normalized = normalize(&self.config.with_system_prompt(messages));
        let wire: Vec<serde_json::Value> = normalized
            .turns
            .iter()
            .map(|m| serde_json::json!({"role": m.role, "content": m.content}))
            .collect();

        let mut request_body = serde_json::json!({
            "model": self.config.model,
            "max_tokens": 4096,
            "messages": wire,
        });
        if let Some(system) = &normalized.system {
            request_body["system"] = serde_json::json!(system);
        }
        if let Some(temp) = self.config.temperature {
            request_body["temperature"] = serde_json::json!(temp);
        }

        let url = format!("{}/messages", self.config.resolve_base_url());
        let response = self
            .client
            .post(&url)
            .header("x-api-key", api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request_body)
            .send()
            .await
            .map_err(|e| AdvisorError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AdvisorError::RequestFailed(format!(
                "Anthropic API error ({}): {}",
                status, body
            )));
        }

        let resp_json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AdvisorError::ParseError(e.to_string()))?;

        resp_json["content"][0]["text"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| AdvisorError::ParseError("missing content[0].text".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_extracts_system_messages() {
        let msgs = vec![
            Message::system("Be terse."),
            Message::user("hello"),
            Message::system("Be correct."),
        ];
        let norm = normalize(&msgs);
        assert_eq!(norm.system.as_deref(), Some("Be terse.\n\nBe correct."));
        assert_eq!(norm.turns.len(), 1);
        assert_eq!(norm.turns[0].role, Role::User);
    }

    #[test]
    fn normalize_merges_consecutive_same_role() {
        let msgs = vec![
            Message::user("part one"),
            Message::user("part two"),
            Message::assistant("reply"),
        ];
        let norm = normalize(&msgs);
        assert_eq!(norm.turns.len(), 2);
        assert_eq!(norm.turns[0].content, "part one\n\npart two");
    }

    #[test]
    fn normalize_never_opens_with_assistant() {
        let msgs = vec![Message::assistant("previous turn")];
        let norm = normalize(&msgs);
        assert_eq!(norm.turns[0].role, Role::User);
        assert_eq!(norm.turns.len(), 2);
    }

    #[test]
    fn normalize_empty_input_yields_one_user_turn() {
        let norm = normalize(&[]);
        assert!(norm.system.is_none());
        assert_eq!(norm.turns.len(), 1);
        assert_eq!(norm.turns[0].role, Role::User);
    }
}
