//! Gemini generateContent adapter.
//!
//! Gemini speaks `user`/`model` roles and takes system content as a
//! separate `systemInstruction` block; the credential travels as a query
//! parameter rather than a header.

use std::time::Duration;

use async_trait::async_trait;

use super::{Advisor, AdvisorConfig, Message, Role};
use crate::error::AdvisorError;

pub struct GeminiAdvisor {
    config: AdvisorConfig,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl GeminiAdvisor {
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

fn wire_role(role: Role) -> &'static str {
    match role {
        Role::Assistant => "model",
        _ => "user",
    }
}

#[async_trait]
impl Advisor for GeminiAdvisor {
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

        let messages = self.config.with_system_prompt(messages);
        let (system, turns): (Vec<&Message>, Vec<&Message>) =
            messages.iter().partition(|m| m.role == Role::System);

        let contents: Vec<serde_json::Value> = turns
            .iter()
            .map(|m| {
                serde_json::json!({
                    "role": wire_role(m.role),
                    "parts": [{"text": m.content}],
                })
            })
            .collect();

        let mut request_body = serde_json::json!({ "contents": contents });
        if !system.is_empty() {
            let joined = system
                .iter()
                .map(|m| m.content.as_str())
                .collect::<Vec<_>>()
                .join("\n\n");
            request_body["systemInstruction"] = serde_json::json!({"parts": [{"text": joined}]});
        }
        if let Some(temp) = self.config.temperature {
            request_body["generationConfig"] = serde_json::json!({"temperature": temp});
        }

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.config.resolve_base_url(),
            self.config.model,
            api_key
        );
        let response = self
            .client
            .post(&url)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| AdvisorError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AdvisorError::RequestFailed(format!(
                "Gemini API error ({}): {}",
                status, body
            )));
        }

        let resp_json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AdvisorError::ParseError(e.to_string()))?;

        resp_json["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| {
                AdvisorError::ParseError("missing candidates[0].content.parts[0].text".to_string())
            })
    }
}
