//! # Volume Retrieval
//!
//! Lazy access to requested volumes and their content.
//!
//! The retriever yields one tagged result per requested id. A missing
//! volume, an out-of-range page or a store failure is reported for that
//! volume only; the consumer decides whether to continue.

mod reader;
mod retriever;

pub use reader::{ContentReader, VolumeReader};
pub use retriever::{StoreVolumeRetriever, StreamingQuota, VolumeRetriever};
