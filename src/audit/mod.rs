//! Append-only audit trail of vote mutations.
//!
//! Recording is best effort: [`AuditRecorder::record`] never fails the
//! operation that produced the event.

mod entry;
mod recorder;
mod sink;

pub use entry::*;
pub use recorder::*;
pub use sink::*;
