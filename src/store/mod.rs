//! # Backing Store Access
//!
//! The repository holding volume metadata, page text and metadata documents.
//!
//! Each call is a single blocking operation that either returns content or a
//! terminal failure. Transient failures are retried by [`RetryingStore`]
//! before they surface as `RepositoryFailure`.

mod directory;
mod memory;
mod retry;

pub use directory::DirectoryStore;
pub use memory::MemoryStore;
pub use retry::{retry_delay, RetryPolicy, RetryingStore, StoreRetryConfig};

use serde::{Deserialize, Serialize};

use crate::errors::AccessResult;
use crate::retrieval::ContentReader;

/// Snapshot of one volume's metadata as reported by the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeInfo {
    pub volume_id: String,
    pub page_count: u32,
}

impl VolumeInfo {
    pub fn new(volume_id: impl Into<String>, page_count: u32) -> Self {
        Self {
            volume_id: volume_id.into(),
            page_count,
        }
    }
}

/// Backend trait for the volume repository
pub trait VolumeStore: Send + Sync {
    /// Volume metadata; `KeyNotFound` if the store has no such volume
    fn volume_info(&self, volume_id: &str) -> AccessResult<VolumeInfo>;

    /// Text of one page (1-based sequence)
    fn page(&self, volume_id: &str, sequence: u32) -> AccessResult<Vec<u8>>;

    /// Metadata documents of a volume, in a stable order
    fn metadata(&self, volume_id: &str) -> AccessResult<Vec<ContentReader>>;
}
