//! # Request Validator
//!
//! Upfront admission: every requested id is resolved and quota-checked
//! before any output is produced. The first failure aborts the request.

use std::collections::HashMap;
use std::sync::Arc;

use super::pages::{Granularity, PageSelection};
use super::tracker::{QuotaTracker, ValidationState};
use crate::coordinates::ItemCoordinates;
use crate::errors::AccessResult;
use crate::policy::PolicyRegistry;
use crate::store::{VolumeInfo, VolumeStore};

/// Validator for one request. Not shared across requests.
pub struct RequestValidator {
    store: Arc<dyn VolumeStore>,
    granularity: Granularity,
    tracker: QuotaTracker,
}

impl RequestValidator {
    pub fn new(
        store: Arc<dyn VolumeStore>,
        registry: &PolicyRegistry,
        granularity: Granularity,
    ) -> Self {
        Self {
            store,
            granularity,
            tracker: QuotaTracker::new(registry),
        }
    }

    /// Validator treating every id as a whole volume
    pub fn whole_volume(store: Arc<dyn VolumeStore>, registry: &PolicyRegistry) -> Self {
        Self::new(store, registry, Granularity::WholeVolume)
    }

    /// Validator counting only the listed pages of each id
    pub fn partial_page(store: Arc<dyn VolumeStore>, registry: &PolicyRegistry) -> Self {
        Self::new(store, registry, Granularity::PartialPage)
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn state(&self) -> ValidationState {
        self.tracker.state()
    }

    /// Resolve and check every coordinate, strictly in order.
    ///
    /// Fails with `KeyNotFound` for a missing volume or page and with
    /// `PolicyViolation` for the first exceeded quota.
    pub fn validate(
        &mut self,
        coordinates: &[ItemCoordinates],
    ) -> AccessResult<HashMap<String, VolumeInfo>> {
        let mut volumes = HashMap::with_capacity(coordinates.len());

        for coords in coordinates {
            let info = self.store.volume_info(coords.volume_id())?;
            let selection = PageSelection::resolve(coords, &info, self.granularity);
            self.tracker.admit(&selection, &info)?;
            volumes.insert(coords.volume_id().to_string(), info);
        }

        Ok(volumes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AccessError;
    use crate::policy::PolicyLimits;
    use crate::store::MemoryStore;

    fn store() -> Arc<dyn VolumeStore> {
        Arc::new(
            MemoryStore::new()
                .with_volume("v1", ["a", "b"])
                .with_volume("v2", ["c", "d", "e"]),
        )
    }

    #[test]
    fn test_returns_volume_info_map() {
        let registry = PolicyRegistry::from_limits(&PolicyLimits::new(3, 10, 5));
        let mut validator = RequestValidator::whole_volume(store(), &registry);

        let result = validator
            .validate(&[ItemCoordinates::volume("v1"), ItemCoordinates::volume("v2")])
            .unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result["v2"].page_count, 3);
        assert_eq!(validator.state().total_page_count, 5);
    }

    #[test]
    fn test_missing_volume_aborts() {
        let registry = PolicyRegistry::from_limits(&PolicyLimits::unlimited());
        let mut validator = RequestValidator::whole_volume(store(), &registry);

        let err = validator
            .validate(&[ItemCoordinates::volume("v1"), ItemCoordinates::volume("nope")])
            .unwrap_err();
        assert_eq!(err, AccessError::key_not_found("nope"));
    }

    #[test]
    fn test_partial_counts_only_listed_pages() {
        let registry = PolicyRegistry::from_limits(&PolicyLimits::new(0, 2, 0));
        let mut validator = RequestValidator::partial_page(store(), &registry);

        validator
            .validate(&[ItemCoordinates::pages("v2", vec![2, 3])])
            .unwrap();
        assert_eq!(validator.state().total_page_count, 2);
    }
}
