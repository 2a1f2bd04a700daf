//! OpenAI chat-completions adapter.
//!
//! Also covers any OpenAI-compatible endpoint (llama.cpp, vLLM, proxies)
//! via the `base_url` override — roles pass through unchanged.

use std::time::Duration;

use async_trait::async_trait;

use super::{Advisor, AdvisorConfig, Message};
use crate::error::AdvisorError;

pub struct OpenAiAdvisor {
    config: AdvisorConfig,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl OpenAiAdvisor {
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
impl Advisor for OpenAiAdvisor {
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
        let wire: Vec<serde_json::Value> = messages
            .iter()
            .map(|m| serde_json::json!({"role": m.role, "content": m.content}))
            .collect();

        let mut request_body = serde_json::json!({
            "model": self.config.model,
            "messages": wire,
        });
        if let Some(temp) = self.config.temperature {
            request_body["temperature"] = serde_json::json!(temp);
        }

        let url = format!("{}/chat/completions", self.config.resolve_base_url());
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await
            .map_err(|e| AdvisorError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AdvisorError::RequestFailed(format!(
                "OpenAI API error ({}): {}",
                status, body
            )));
        }

        let resp_json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AdvisorError::ParseError(e.to_string()))?;

        resp_json["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| {
                AdvisorError::ParseError("missing choices[0].message.content".to_string())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisor::ProviderKind;

    fn config(api_key: Option<&str>) -> AdvisorConfig {
        AdvisorConfig {
            name: "manager".to_string(),
            provider: ProviderKind::OpenAi,
            model: "gpt-4o".to_string(),
            api_key: api_key.map(str::to_string),
            base_url: Some("http://localhost:1".to_string()),
            system_prompt: None,
            temperature: Some(0.2),
        }
    }

    #[test]
    fn availability_tracks_credential() {
        assert!(OpenAiAdvisor::new(config(Some("sk-x"))).is_available());
    }

    #[tokio::test]
    async fn chat_without_key_fails_locally() {
        let advisor = OpenAiAdvisor::new(config(None));
        if advisor.is_available() {
            // Ambient OPENAI_API_KEY in the environment; nothing to assert.
            return;
        }
        let err = advisor.chat(&[Message::user("hi")]).await.unwrap_err();
        assert!(matches!(err, AdvisorError::MissingApiKey(_)));
    }
}
