//! # Policy Registry

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::checker::{NullPolicy, PolicyChecker, PolicyKind, QuotaPolicy};
use crate::observability::Logger;

/// Configured quota limits. 0 disables a rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyLimits {
    #[serde(default)]
    pub max_volumes_allowed: u64,

    #[serde(default)]
    pub max_total_pages_allowed: u64,

    #[serde(default)]
    pub max_pages_per_volume_allowed: u64,
}

impl PolicyLimits {
    pub fn new(max_volumes: u64, max_total_pages: u64, max_pages_per_volume: u64) -> Self {
        Self {
            max_volumes_allowed: max_volumes,
            max_total_pages_allowed: max_total_pages,
            max_pages_per_volume_allowed: max_pages_per_volume,
        }
    }

    /// All rules disabled
    pub fn unlimited() -> Self {
        Self::default()
    }
}

/// Named policy checkers.
///
/// Populated once at startup, then shared read-only (`Arc<PolicyRegistry>`)
/// by every request.
#[derive(Debug, Default)]
pub struct PolicyRegistry {
    checkers: HashMap<String, Arc<dyn PolicyChecker>>,
}

impl PolicyRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the three quota rules with the given limits
    pub fn from_limits(limits: &PolicyLimits) -> Self {
        let mut registry = Self::new();
        registry.register_quota(QuotaPolicy::max_volumes(limits.max_volumes_allowed));
        registry.register_quota(QuotaPolicy::max_total_pages(limits.max_total_pages_allowed));
        registry.register_quota(QuotaPolicy::max_pages_per_volume(
            limits.max_pages_per_volume_allowed,
        ));
        registry
    }

    /// Register a checker under a name, replacing any previous one
    pub fn register(&mut self, name: impl Into<String>, checker: Arc<dyn PolicyChecker>) {
        self.checkers.insert(name.into(), checker);
    }

    fn register_quota(&mut self, policy: QuotaPolicy) {
        self.register(policy.kind().policy_name(), Arc::new(policy));
    }

    /// Get checker by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn PolicyChecker>> {
        self.checkers.get(name).cloned()
    }

    /// Get the checker for a quota dimension, or a `NullPolicy` if none is registered
    pub fn resolve(&self, kind: PolicyKind) -> Arc<dyn PolicyChecker> {
        match self.get(kind.policy_name()) {
            Some(checker) => checker,
            None => {
                Logger::warn("POLICY_UNREGISTERED", &[("policy", kind.policy_name())]);
                Arc::new(NullPolicy)
            }
        }
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.checkers.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.checkers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checkers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_limits_registers_three_rules() {
        let registry = PolicyRegistry::from_limits(&PolicyLimits::new(3, 10, 5));
        assert_eq!(registry.len(), 3);
        assert_eq!(
            registry.names(),
            vec![
                "MaxPagesPerVolumePolicy",
                "MaxTotalPagesPolicy",
                "MaxVolumesPolicy"
            ]
        );
        assert_eq!(registry.resolve(PolicyKind::MaxVolumes).limit(), 3);
        assert_eq!(registry.resolve(PolicyKind::MaxTotalPages).limit(), 10);
        assert_eq!(registry.resolve(PolicyKind::MaxPagesPerVolume).limit(), 5);
    }

    #[test]
    fn test_unregistered_rule_resolves_to_null() {
        let registry = PolicyRegistry::new();
        let checker = registry.resolve(PolicyKind::MaxVolumes);
        assert_eq!(checker.name(), "NullPolicy");
        assert!(checker.check(u64::MAX, "v").is_ok());
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = PolicyRegistry::from_limits(&PolicyLimits::new(3, 10, 5));
        registry.register("MaxVolumesPolicy", Arc::new(NullPolicy));
        assert_eq!(registry.len(), 3);
        assert!(registry
            .resolve(PolicyKind::MaxVolumes)
            .check(100, "v")
            .is_ok());
    }

    #[test]
    fn test_limits_deserialize_with_defaults() {
        let limits: PolicyLimits = serde_json::from_str(r#"{"max_volumes_allowed": 7}"#).unwrap();
        assert_eq!(limits, PolicyLimits::new(7, 0, 0));
    }
}
