//! # Quota Tracker
//!
//! Running quota state for one request. Both the upfront validator and the
//! streaming retriever admit volumes through this type.

use std::sync::Arc;

use super::pages::{clipped_index, page_token, RequestedPages};
use crate::errors::{AccessError, AccessResult};
use crate::policy::{PolicyChecker, PolicyKind, PolicyRegistry};
use crate::store::VolumeInfo;

/// Running counters, mutated strictly in request order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationState {
    pub volume_count: u64,
    pub total_page_count: u64,
    pub per_volume_page_count: u64,
    /// Total before the current volume's pages were added
    pub previous_total_page_count: u64,
}

/// Admission control over the three quota rules.
///
/// Checkers are resolved from the registry once, at construction.
#[derive(Debug)]
pub struct QuotaTracker {
    max_volumes: Arc<dyn PolicyChecker>,
    max_total_pages: Arc<dyn PolicyChecker>,
    max_pages_per_volume: Arc<dyn PolicyChecker>,
    state: ValidationState,
}

impl QuotaTracker {
    pub fn new(registry: &PolicyRegistry) -> Self {
        Self {
            max_volumes: registry.resolve(PolicyKind::MaxVolumes),
            max_total_pages: registry.resolve(PolicyKind::MaxTotalPages),
            max_pages_per_volume: registry.resolve(PolicyKind::MaxPagesPerVolume),
            state: ValidationState::default(),
        }
    }

    pub fn state(&self) -> ValidationState {
        self.state
    }

    /// Admit one volume's requested pages.
    ///
    /// Equivalent to [`check`](Self::check) followed by
    /// [`commit`](Self::commit).
    pub fn admit(&mut self, requested: &dyn RequestedPages, info: &VolumeInfo) -> AccessResult<()> {
        let next = self.check(requested, info)?;
        self.commit(next);
        Ok(())
    }

    /// Run the quota checks for one volume without advancing the counters.
    ///
    /// Checks run in a fixed order: volume count, page bounds, pages per
    /// volume, total pages. On success the returned state is what the
    /// counters become once the volume is delivered.
    pub fn check(
        &self,
        requested: &dyn RequestedPages,
        info: &VolumeInfo,
    ) -> AccessResult<ValidationState> {
        let volume_id = requested.volume_id();
        let mut next = self.state;

        next.volume_count += 1;
        self.max_volumes.check(next.volume_count, volume_id)?;

        if let Some(sequence) = requested.first_out_of_range(info.page_count) {
            return Err(AccessError::key_not_found(page_token(volume_id, sequence)));
        }

        let n = requested.requested_page_count();
        next.per_volume_page_count = n;
        let idx = clipped_index(n, self.max_pages_per_volume.limit() as i128);
        self.max_pages_per_volume.check(n, &requested.token_for(idx))?;

        next.total_page_count += n;
        let remaining =
            self.max_total_pages.limit() as i128 - next.previous_total_page_count as i128;
        let idx = clipped_index(n, remaining);
        self.max_total_pages
            .check(next.total_page_count, &requested.token_for(idx))?;

        next.previous_total_page_count = next.total_page_count;
        Ok(next)
    }

    /// Advance the counters to a state returned by [`check`](Self::check)
    pub fn commit(&mut self, next: ValidationState) {
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::PolicyLimits;
    use crate::validation::pages::{PartialPages, WholeVolume};

    fn tracker(volumes: u64, total: u64, per_volume: u64) -> QuotaTracker {
        QuotaTracker::new(&PolicyRegistry::from_limits(&PolicyLimits::new(
            volumes, total, per_volume,
        )))
    }

    fn violation_token(err: AccessError) -> (String, String) {
        match err {
            AccessError::PolicyViolation { policy, token, .. } => (policy, token),
            other => panic!("expected policy violation, got {other:?}"),
        }
    }

    #[test]
    fn test_per_volume_token_uses_clipped_index() {
        let mut tracker = tracker(0, 0, 5);
        let seqs = [10, 11, 12, 13, 14, 15, 16, 17];
        let err = tracker
            .admit(&PartialPages::new("vol", &seqs), &VolumeInfo::new("vol", 20))
            .unwrap_err();

        // n = 8, limit = 5: index 3
        let (policy, token) = violation_token(err);
        assert_eq!(policy, "MaxPagesPerVolumePolicy");
        assert_eq!(token, "vol[13]");
    }

    #[test]
    fn test_total_token_accounts_for_previous_volumes() {
        let mut tracker = tracker(0, 10, 0);
        tracker
            .admit(&WholeVolume::new("a", 7), &VolumeInfo::new("a", 7))
            .unwrap();

        // remaining = 3, n = 5: index 2
        let err = tracker
            .admit(&WholeVolume::new("b", 5), &VolumeInfo::new("b", 5))
            .unwrap_err();
        let (policy, token) = violation_token(err);
        assert_eq!(policy, "MaxTotalPagesPolicy");
        assert_eq!(token, "b[3]");
    }

    #[test]
    fn test_bounds_checked_before_quotas() {
        let mut tracker = tracker(0, 0, 1);
        let seqs = [1, 2, 9];
        let err = tracker
            .admit(&PartialPages::new("vol", &seqs), &VolumeInfo::new("vol", 4))
            .unwrap_err();
        assert_eq!(err, AccessError::key_not_found("vol[9]"));
    }

    #[test]
    fn test_rejected_volume_does_not_advance_counters() {
        let mut tracker = tracker(0, 0, 2);
        tracker
            .admit(&WholeVolume::new("a", 2), &VolumeInfo::new("a", 2))
            .unwrap();
        assert!(tracker
            .admit(&WholeVolume::new("b", 3), &VolumeInfo::new("b", 3))
            .is_err());

        let state = tracker.state();
        assert_eq!(state.volume_count, 1);
        assert_eq!(state.total_page_count, 2);
        assert_eq!(state.previous_total_page_count, 2);
    }

    #[test]
    fn test_empty_volume_is_admitted() {
        let mut tracker = tracker(1, 1, 1);
        tracker
            .admit(&WholeVolume::new("empty", 0), &VolumeInfo::new("empty", 0))
            .unwrap();
        assert_eq!(tracker.state().volume_count, 1);
    }

    #[test]
    fn test_check_leaves_counters_until_commit() {
        let mut tracker = tracker(2, 0, 0);
        let next = tracker
            .check(&WholeVolume::new("a", 3), &VolumeInfo::new("a", 3))
            .unwrap();
        assert_eq!(tracker.state(), ValidationState::default());
        assert_eq!(next.volume_count, 1);
        assert_eq!(next.total_page_count, 3);

        tracker.commit(next);
        assert_eq!(tracker.state().volume_count, 1);
    }
}
