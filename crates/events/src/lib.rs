//! Security audit events and the recorder that builds them.
//!
//! Audit events are recorded synchronously, inside the same unit of work as the
//! state change they describe. There is no bus and no delivery retry.

pub mod audit;
pub mod context;
pub mod recorder;

pub use audit::{AuditAction, AuditEvent, AuditRecord};
pub use context::{ANONYMOUS, RequestContext};
pub use recorder::AuditTrail;
