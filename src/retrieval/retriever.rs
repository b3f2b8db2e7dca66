//! # Volume Retriever
//!
//! Lazy, single-pass sequence of volumes. Nothing is read from the store
//! until `next_volume` is called, and each call touches exactly one volume.

use std::collections::VecDeque;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::reader::{ContentReader, VolumeReader};
use crate::coordinates::{page_sequence_name, ItemCoordinates};
use crate::errors::{AccessError, AccessResult};
use crate::policy::PolicyRegistry;
use crate::store::VolumeStore;
use crate::validation::{page_token, Granularity, PageSelection, QuotaTracker, RequestedPages};

/// Quota behaviour on the streaming path
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamingQuota {
    /// No quota checks
    Off,
    /// A violating volume fails on its own; later volumes still stream
    #[default]
    Isolate,
    /// The first violation ends the sequence
    Halt,
}

/// Source of volumes for the archive assembler
pub trait VolumeRetriever {
    fn has_more_volumes(&self) -> bool;

    /// Fetch the next volume. A failure covers only that volume.
    fn next_volume(&mut self) -> AccessResult<VolumeReader>;
}

/// Retriever reading volumes from a [`VolumeStore`]
pub struct StoreVolumeRetriever {
    store: Arc<dyn VolumeStore>,
    pending: VecDeque<ItemCoordinates>,
    granularity: Granularity,
    quota: StreamingQuota,
    tracker: Option<QuotaTracker>,
    halted: bool,
}

impl StoreVolumeRetriever {
    /// Retriever without quota checks
    pub fn new(
        store: Arc<dyn VolumeStore>,
        coordinates: Vec<ItemCoordinates>,
        granularity: Granularity,
    ) -> Self {
        Self {
            store,
            pending: coordinates.into(),
            granularity,
            quota: StreamingQuota::Off,
            tracker: None,
            halted: false,
        }
    }

    /// Apply the registry's quotas while streaming
    pub fn with_quota(mut self, quota: StreamingQuota, registry: &PolicyRegistry) -> Self {
        self.quota = quota;
        self.tracker = match quota {
            StreamingQuota::Off => None,
            StreamingQuota::Isolate | StreamingQuota::Halt => Some(QuotaTracker::new(registry)),
        };
        self
    }

    pub fn quota(&self) -> StreamingQuota {
        self.quota
    }

    /// Coordinates not yet retrieved
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }

    fn retrieve(&mut self, coords: &ItemCoordinates) -> AccessResult<VolumeReader> {
        let volume_id = coords.volume_id();
        let info = self.store.volume_info(volume_id)?;
        let selection = PageSelection::resolve(coords, &info, self.granularity);

        // counters advance only once the content is in hand
        let admitted = match self.tracker.as_ref() {
            Some(tracker) => Some(tracker.check(&selection, &info)?),
            None => {
                if let Some(sequence) = selection.first_out_of_range(info.page_count) {
                    return Err(AccessError::key_not_found(page_token(volume_id, sequence)));
                }
                None
            }
        };

        let mut pages = Vec::with_capacity(selection.requested_page_count() as usize);
        for sequence in selection.sequences() {
            let content = self.store.page(volume_id, sequence)?;
            pages.push(ContentReader::new(page_sequence_name(sequence), content));
        }
        let metadata = self.store.metadata(volume_id)?;

        if let (Some(tracker), Some(next)) = (self.tracker.as_mut(), admitted) {
            tracker.commit(next);
        }

        Ok(VolumeReader::new(volume_id, pages, metadata))
    }
}

impl VolumeRetriever for StoreVolumeRetriever {
    fn has_more_volumes(&self) -> bool {
        !self.halted && !self.pending.is_empty()
    }

    fn next_volume(&mut self) -> AccessResult<VolumeReader> {
        let coords = match self.pending.pop_front() {
            Some(coords) if !self.halted => coords,
            _ => return Err(AccessError::repository("no more volumes to retrieve")),
        };

        let result = self.retrieve(&coords);
        if self.quota == StreamingQuota::Halt
            && matches!(result, Err(AccessError::PolicyViolation { .. }))
        {
            self.halted = true;
        }
        result
    }
}
