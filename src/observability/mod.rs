//! Observability subsystem
//!
//! This module provides:
//! - Structured logging (JSON lines)
//! - The append-only access audit trail
//!
//! # Usage
//!
//! ```ignore
//! use dataapi::observability::{Logger, MemoryAuditor, Auditor, AuditRecord};
//!
//! Logger::info("ARCHIVE_COMPLETE", &[("volumes", "3")]);
//!
//! let auditor = MemoryAuditor::new();
//! auditor.audit(&AuditRecord::accessed("vol1", vec!["00000001".into()]))?;
//! ```

pub mod audit;
mod logger;

pub use audit::{AuditAction, AuditRecord, Auditor, FileAuditor, MemoryAuditor};
pub use logger::{Logger, Severity};
