//! Application layer - the cleanup run
//!
//! Coordinates the domain rules against a record source: guarded collaborator access, the
//! per-record reconciliation engine, page traversal and the run supervisor.

pub mod guarded_source;
pub mod reconciliation;
pub mod supervisor;
pub mod traversal;

// Re-export commonly used items
pub use guarded_source::GuardedSource;
pub use reconciliation::{BLANK_RECORD_KEY, ReconciliationEngine, RecordDisposition};
pub use supervisor::{RunOutcome, RunSupervisor};
pub use traversal::{PageTraversalController, PagingState, TraversalStep};
