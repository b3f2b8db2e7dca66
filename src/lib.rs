//! dataapi - quota-checked bulk page and volume access
//!
//! Requests name volumes (optionally specific pages). Each request is
//! admitted against three quotas, its volumes are fetched lazily from the
//! backing store, and the content is streamed out as a zip archive while
//! an audit trail records what was released.

pub mod archive;
pub mod cli;
pub mod coordinates;
pub mod errors;
pub mod http_server;
pub mod observability;
pub mod policy;
pub mod retrieval;
pub mod store;
pub mod validation;
