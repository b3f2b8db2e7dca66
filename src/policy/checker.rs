//! # Policy Checkers

use std::fmt;

use crate::errors::{AccessError, AccessResult};

/// A named quota rule with a fixed limit.
///
/// Checkers are stateless: `check` only compares the observed value with the
/// configured limit.
pub trait PolicyChecker: Send + Sync + fmt::Debug {
    /// Registry name of this rule
    fn name(&self) -> &str;

    /// Configured limit; 0 means unlimited
    fn limit(&self) -> u64;

    /// Fail with `PolicyViolation` if `observed` exceeds the limit.
    ///
    /// `token` names the offending item and is carried in the error.
    fn check(&self, observed: u64, token: &str) -> AccessResult<()>;
}

/// The quota dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolicyKind {
    MaxVolumes,
    MaxTotalPages,
    MaxPagesPerVolume,
}

impl PolicyKind {
    /// Registry name
    pub fn policy_name(&self) -> &'static str {
        match self {
            PolicyKind::MaxVolumes => "MaxVolumesPolicy",
            PolicyKind::MaxTotalPages => "MaxTotalPagesPolicy",
            PolicyKind::MaxPagesPerVolume => "MaxPagesPerVolumePolicy",
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.policy_name())
    }
}

/// Limit-based quota rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaPolicy {
    kind: PolicyKind,
    limit: u64,
}

impl QuotaPolicy {
    pub fn new(kind: PolicyKind, limit: u64) -> Self {
        Self { kind, limit }
    }

    pub fn max_volumes(limit: u64) -> Self {
        Self::new(PolicyKind::MaxVolumes, limit)
    }

    pub fn max_total_pages(limit: u64) -> Self {
        Self::new(PolicyKind::MaxTotalPages, limit)
    }

    pub fn max_pages_per_volume(limit: u64) -> Self {
        Self::new(PolicyKind::MaxPagesPerVolume, limit)
    }

    pub fn kind(&self) -> PolicyKind {
        self.kind
    }
}

impl PolicyChecker for QuotaPolicy {
    fn name(&self) -> &str {
        self.kind.policy_name()
    }

    fn limit(&self) -> u64 {
        self.limit
    }

    fn check(&self, observed: u64, token: &str) -> AccessResult<()> {
        if self.limit != 0 && observed > self.limit {
            return Err(AccessError::PolicyViolation {
                policy: self.name().to_string(),
                limit: self.limit,
                observed,
                token: token.to_string(),
            });
        }
        Ok(())
    }
}

/// Rule that always passes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NullPolicy;

impl PolicyChecker for NullPolicy {
    fn name(&self) -> &str {
        "NullPolicy"
    }

    fn limit(&self) -> u64 {
        0
    }

    fn check(&self, _observed: u64, _token: &str) -> AccessResult<()> {
        Ok(())
    }
}
