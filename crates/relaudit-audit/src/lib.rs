//! Audit engine for relaudit.
//!
//! [`Auditor`] runs the read-only audits and the trigger provisioner over any
//! [`relaudit_introspect::Catalog`]. Work spanning many tables runs through a
//! bounded pool that honours cancellation and an optional deadline.

mod auditor;
mod integrity;
pub mod options;
mod pool;
mod relationships;
mod report;
mod triggers;

pub use auditor::Auditor;
pub use options::AuditOptions;
pub use relaudit_core::{DefaultSuggestion, suggest_default};
pub use tokio_util::sync::CancellationToken;
