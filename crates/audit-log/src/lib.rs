//! Audit trail for the webhook relay.
//!
//! Every received envelope and every delivery outcome is written as one JSON
//! object per line. Sinks are append-only and safe to share between the read
//! loop and concurrently running forward tasks.

mod error;
mod record;
mod sink;

pub use error::{AuditError, AuditResult};
pub use record::{AuditEntry, AuditLevel, AuditRecord};
pub use sink::{AuditSink, JsonlAuditLog, MemoryAuditSink};
