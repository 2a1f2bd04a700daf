//! Error taxonomy for the advisor council.
//!
//! Per-advisor failures are contained within the round that produced them
//! and never escalate past [`crate::debate::DebateEngine`]; only the complete
//! absence of advisors fails a debate. Session transport failures are
//! transient at the watcher level: the tick is skipped and retried.

use std::time::Duration;
use thiserror::Error;

/// Errors from a single advisor call.
#[derive(Debug, Error)]
pub enum AdvisorError {
    #[error("API request failed: {0}")]
    RequestFailed(String),

    #[error("API key not configured for {0}")]
    MissingApiKey(String),

    #[error("response parse error: {0}")]
    ParseError(String),

    #[error("advisor {advisor} timed out after {timeout:?}")]
    Timeout { advisor: String, timeout: Duration },
}

/// Errors surfaced by the debate engine and the orchestration loop.
#[derive(Debug, Error)]
pub enum CouncilError {
    /// No advisor had a credential at debate start. Fatal to that one
    /// debate invocation only; the watcher retries on the next tick.
    #[error("no advisors available for debate")]
    NoAdvisorsAvailable,

    /// The external session could not be reached this tick.
    #[error("external session unreachable: {0}")]
    SessionUnreachable(String),

    #[error("configuration error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advisor_error_display() {
        let err = AdvisorError::MissingApiKey("anthropic".to_string());
        assert!(err.to_string().contains("anthropic"));

        let err = AdvisorError::Timeout {
            advisor: "architect".to_string(),
            timeout: Duration::from_secs(120),
        };
        assert!(err.to_string().contains("architect"));
    }

    #[test]
    fn council_error_display() {
        assert_eq!(
            CouncilError::NoAdvisorsAvailable.to_string(),
            "no advisors available for debate"
        );
        assert!(CouncilError::SessionUnreachable("connection refused".into())
            .to_string()
            .contains("connection refused"));
    }
}
