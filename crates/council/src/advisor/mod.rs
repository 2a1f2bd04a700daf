//! Advisor capability — one trait, per-provider adapters.
//!
//! An advisor turns an ordered message history into advisory text. Each
//! adapter owns its backend's quirks (system-message extraction, role
//! alternation, endpoint shape) so the debate engine never sees them.
//! Adapters are selected by [`build_advisor`], keyed on [`ProviderKind`].

pub mod anthropic;
pub mod gemini;
pub mod openai;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AdvisorError;

pub use anthropic::AnthropicAdvisor;
pub use gemini::GeminiAdvisor;
pub use openai::OpenAiAdvisor;

/// Role of a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// One message in an ordered conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Which backend serves an advisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAi,
    Anthropic,
    Gemini,
}

impl ProviderKind {
    /// Environment variable consulted when the config carries no key.
    pub fn credential_env(&self) -> &'static str {
        match self {
            Self::OpenAi => "OPENAI_API_KEY",
            Self::Anthropic => "ANTHROPIC_API_KEY",
            Self::Gemini => "GEMINI_API_KEY",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::OpenAi => "https://api.openai.com/v1",
            Self::Anthropic => "https://api.anthropic.com/v1",
            Self::Gemini => "https://generativelanguage.googleapis.com/v1beta",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OpenAi => write!(f, "openai"),
            Self::Anthropic => write!(f, "anthropic"),
            Self::Gemini => write!(f, "gemini"),
        }
    }
}

/// Static configuration for one advisor. Immutable once a registry is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvisorConfig {
    /// Unique within a registry.
    pub name: String,
    pub provider: ProviderKind,
    /// Model identifier sent to the backend.
    pub model: String,
    /// Credential; falls back to the provider's env var when absent.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Endpoint override for proxies and self-hosted backends.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Custom system prompt prepended to every conversation.
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub temperature: Option<f64>,
}

impl AdvisorConfig {
    /// Resolve the credential: explicit key first, then the environment.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var(self.provider.credential_env()).ok())
            .filter(|k| !k.is_empty())
    }

    /// Base URL with the provider default applied.
    pub fn resolve_base_url(&self) -> String {
        self.base_url
            .clone()
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| self.provider.default_base_url().to_string())
            .trim_end_matches('/')
            .to_string()
    }

    /// Conversation with the configured system prompt prepended (if any).
    pub(crate) fn with_system_prompt(&self, messages: &[Message]) -> Vec<Message> {
        match &self.system_prompt {
            Some(prompt) if !prompt.is_empty() => {
                let mut out = Vec::with_capacity(messages.len() + 1);
                out.push(Message::system(prompt.clone()));
                out.extend(messages.iter().cloned());
                out
            }
            _ => messages.to_vec(),
        }
    }
}

/// A participant capability: message history in, advisory text out.
///
/// Failures must be captured and returned, never panicked, so the debate
/// can continue with a degraded vote. `is_available` is a cheap local
/// check (credential presence), not a liveness probe.
#[async_trait]
pub trait Advisor: Send + Sync {
    fn name(&self) -> &str;

    fn is_available(&self) -> bool;

    async fn chat(&self, messages: &[Message]) -> Result<String, AdvisorError>;
}

/// Build the adapter for an advisor config, keyed on provider kind.
pub fn build_advisor(config: &AdvisorConfig) -> Arc<dyn Advisor> {
    match config.provider {
        ProviderKind::OpenAi => Arc::new(OpenAiAdvisor::new(config.clone())),
        ProviderKind::Anthropic => Arc::new(AnthropicAdvisor::new(config.clone())),
        ProviderKind::Gemini => Arc::new(GeminiAdvisor::new(config.clone())),
    }
}
