//! Domain module - attribute rules and run bookkeeping
//!
//! Pure business logic of the cleanup: the attribute vocabulary, validation and correction rules,
//! record snapshots, run counters and ledgers, the error taxonomy, and the contract of the record
//! source the cleanup reads from and writes to.

pub mod attribute;
pub mod correction;
pub mod errors;
pub mod record;
pub mod record_source;
pub mod run_state;
pub mod validation;

// Re-export commonly used items for convenience
pub use attribute::{Attribute, AttributeValue};
pub use correction::CorrectionError;
pub use errors::{CleanupError, CleanupResult};
pub use record::{CorrectedRecord, CorrectionPlan, RecordSnapshot};
pub use record_source::{AccessError, PagingInfo, PagingSnapshot, RecordAccessor, RowHandle};
pub use run_state::{RunCounters, RunState, StopReason};
pub use validation::{ValidationReport, Validity};
