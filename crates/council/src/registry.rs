//! Advisor registry — the configured roster and its availability filter.

use std::sync::Arc;

use tracing::warn;

use crate::advisor::{build_advisor, Advisor, AdvisorConfig};

/// Holds the configured advisors in configuration order.
///
/// The registry itself is immutable after construction; debates take an
/// availability-filtered snapshot via [`AdvisorRegistry::available`] so a
/// roster never changes mid-debate.
pub struct AdvisorRegistry {
    advisors: Vec<Arc<dyn Advisor>>,
}

impl AdvisorRegistry {
    pub fn new() -> Self {
        Self {
            advisors: Vec::new(),
        }
    }

    /// Build adapters for every config entry, skipping duplicate names.
    pub fn from_configs(configs: &[AdvisorConfig]) -> Self {
        let mut registry = Self::new();
        for config in configs {
            registry.register(build_advisor(config));
        }
        registry
    }

    /// Add an advisor; duplicate names are rejected with a warning.
    pub fn register(&mut self, advisor: Arc<dyn Advisor>) {
        if self.advisors.iter().any(|a| a.name() == advisor.name()) {
            warn!(name = advisor.name(), "duplicate advisor name ignored");
            return;
        }
        self.advisors.push(advisor);
    }

    /// Advisors with a credential present, in configuration order.
    pub fn available(&self) -> Vec<Arc<dyn Advisor>> {
        self.advisors
            .iter()
            .filter(|a| a.is_available())
            .cloned()
            .collect()
    }

    pub fn all(&self) -> &[Arc<dyn Advisor>] {
        &self.advisors
    }

    pub fn len(&self) -> usize {
        self.advisors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.advisors.is_empty()
    }
}

impl Default for AdvisorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisor::Message;
    use crate::error::AdvisorError;
    use async_trait::async_trait;

    struct FakeAdvisor {
        name: String,
        available: bool,
    }

    #[async_trait]
    impl Advisor for FakeAdvisor {
        fn name(&self) -> &str {
            &self.name
        }

        fn is_available(&self) -> bool {
            self.available
        }

        async fn chat(&self, _messages: &[Message]) -> Result<String, AdvisorError> {
            Ok("ok".to_string())
        }
    }

    fn fake(name: &str, available: bool) -> Arc<dyn Advisor> {
        Arc::new(FakeAdvisor {
            name: name.to_string(),
            available,
        })
    }

    #[test]
    fn available_filters_and_preserves_order() {
        let mut registry = AdvisorRegistry::new();
        registry.register(fake("a", true));
        registry.register(fake("b", false));
        registry.register(fake("c", true));

        let roster = registry.available();
        assert_eq!(roster.len(), 2);
        assert_eq!(roster[0].name(), "a");
        assert_eq!(roster[1].name(), "c");
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn duplicate_names_are_ignored() {
        let mut registry = AdvisorRegistry::new();
        registry.register(fake("a", true));
        registry.register(fake("a", false));
        assert_eq!(registry.len(), 1);
        assert!(registry.all()[0].is_available());
    }

    #[test]
    fn empty_registry_has_no_roster() {
        let registry = AdvisorRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.available().is_empty());
    }
}
