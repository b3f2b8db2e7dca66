//! # In-Memory Store

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{VolumeInfo, VolumeStore};
use crate::errors::{AccessError, AccessResult};
use crate::retrieval::ContentReader;

#[derive(Debug, Default, Clone)]
struct MemoryVolume {
    pages: Vec<Vec<u8>>,
    metadata: Vec<ContentReader>,
}

/// Volume store held in memory.
///
/// Volumes can also be registered as failing, either on every lookup or
/// only once their content is read.
#[derive(Debug, Default)]
pub struct MemoryStore {
    volumes: HashMap<String, MemoryVolume>,
    failures: HashMap<String, AccessError>,
    content_failures: HashMap<String, AccessError>,
    info_lookups: AtomicUsize,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a volume with the given page texts (sequence 1 first)
    pub fn with_volume<P: Into<Vec<u8>>>(
        mut self,
        volume_id: impl Into<String>,
        pages: impl IntoIterator<Item = P>,
    ) -> Self {
        let volume = self.volumes.entry(volume_id.into()).or_default();
        volume.pages = pages.into_iter().map(Into::into).collect();
        self
    }

    /// Attach a metadata document to a volume
    pub fn with_metadata(
        mut self,
        volume_id: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<Vec<u8>>,
    ) -> Self {
        self.volumes
            .entry(volume_id.into())
            .or_default()
            .metadata
            .push(ContentReader::new(name, content));
        self
    }

    /// Make every lookup of `volume_id` fail with `error`
    pub fn with_failure(mut self, volume_id: impl Into<String>, error: AccessError) -> Self {
        self.failures.insert(volume_id.into(), error);
        self
    }

    /// Make page and metadata reads of `volume_id` fail with `error`; its
    /// info lookup still succeeds
    pub fn with_content_failure(
        mut self,
        volume_id: impl Into<String>,
        error: AccessError,
    ) -> Self {
        self.content_failures.insert(volume_id.into(), error);
        self
    }

    /// Number of `volume_info` calls served so far
    pub fn info_lookups(&self) -> usize {
        self.info_lookups.load(Ordering::SeqCst)
    }

    fn lookup(&self, volume_id: &str) -> AccessResult<&MemoryVolume> {
        if let Some(err) = self.failures.get(volume_id) {
            return Err(err.clone());
        }
        self.volumes
            .get(volume_id)
            .ok_or_else(|| AccessError::key_not_found(volume_id))
    }

    fn lookup_content(&self, volume_id: &str) -> AccessResult<&MemoryVolume> {
        match self.content_failures.get(volume_id) {
            Some(err) => Err(err.clone()),
            None => self.lookup(volume_id),
        }
    }
}

impl VolumeStore for MemoryStore {
    fn volume_info(&self, volume_id: &str) -> AccessResult<VolumeInfo> {
        self.info_lookups.fetch_add(1, Ordering::SeqCst);
        let volume = self.lookup(volume_id)?;
        Ok(VolumeInfo::new(volume_id, volume.pages.len() as u32))
    }

    fn page(&self, volume_id: &str, sequence: u32) -> AccessResult<Vec<u8>> {
        let volume = self.lookup_content(volume_id)?;
        sequence
            .checked_sub(1)
            .and_then(|idx| volume.pages.get(idx as usize))
            .cloned()
            .ok_or_else(|| AccessError::key_not_found(format!("{}[{}]", volume_id, sequence)))
    }

    fn metadata(&self, volume_id: &str) -> AccessResult<Vec<ContentReader>> {
        Ok(self.lookup_content(volume_id)?.metadata.clone())
    }
}
