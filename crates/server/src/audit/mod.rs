//! Append-only audit trail of who changed what, and when.

pub mod db;
pub mod handlers;
pub mod models;

pub use db::{Recorded, diff, record};
pub use models::{AuditAction, AuditEntry, AuditLog, EntityType};
