//! # Request Policies
//!
//! Quota rules limiting how much a single request may release:
//! volumes per request, total pages per request, and pages per volume.
//! A limit of 0 disables the rule.

mod checker;
mod registry;

pub use checker::{NullPolicy, PolicyChecker, PolicyKind, QuotaPolicy};
pub use registry::{PolicyLimits, PolicyRegistry};
