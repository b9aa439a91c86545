//! Counters and ledgers accumulated over one cleanup run.
//!
//! Invariants kept by every mutation:
//! - `reviewed == reviewed_ledger.len()` and `fixed == corrected_ledger.len()`
//! - a record key enters the reviewed ledger at most once
//! - a record enters the corrected ledger only with at least one applied correction

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, warn};

use super::record::{CorrectedRecord, CorrectionPlan, RecordSnapshot};

/// Why a run reached its finalize step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    /// Traversal reached the last record.
    Completed,
    /// The search returned nothing to review.
    NoRecords,
    /// The operator asked the run to stop.
    Cancelled,
    /// Too many consecutive hiccups.
    HiccupLimit,
}

impl StopReason {
    /// Runs stopped by the hiccup limit did not finish their traversal.
    #[must_use]
    pub const fn is_failure(self) -> bool {
        matches!(self, Self::HiccupLimit)
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Completed => "completed",
            Self::NoRecords => "no records to review",
            Self::Cancelled => "cancelled by operator",
            Self::HiccupLimit => "stopped after too many consecutive hiccups",
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCounters {
    /// Records visited, corrected or not.
    pub reviewed: u64,
    /// Records with at least one applied correction.
    pub fixed: u64,
    /// Individual attribute corrections applied.
    pub errors_fixed: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Recorded { corrections: usize },
    /// The key is already in the reviewed ledger; nothing changed.
    AlreadyReviewed,
}

/// A record abandoned after some of its corrections were already written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InFlightRecord {
    /// Values as they were before the first write.
    pub original: RecordSnapshot,
    pub applied: CorrectionPlan,
}

#[derive(Debug, Default)]
pub struct RunState {
    counters: RunCounters,
    reviewed: Vec<RecordSnapshot>,
    corrected: Vec<CorrectedRecord>,
    seen: HashSet<String>,
    in_flight: Option<InFlightRecord>,
}

impl RunState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn counters(&self) -> RunCounters {
        self.counters
    }

    #[must_use]
    pub fn reviewed_ledger(&self) -> &[RecordSnapshot] {
        &self.reviewed
    }

    #[must_use]
    pub fn corrected_ledger(&self) -> &[CorrectedRecord] {
        &self.corrected
    }

    #[must_use]
    pub fn has_reviewed(&self, record_key: &str) -> bool {
        self.seen.contains(record_key)
    }

    #[must_use]
    pub const fn in_flight(&self) -> Option<&InFlightRecord> {
        self.in_flight.as_ref()
    }

    /// Appends a visited record to the ledgers and bumps the counters.
    pub fn record(&mut self, original: RecordSnapshot, applied: CorrectionPlan) -> RecordOutcome {
        if !self.seen.insert(original.record_key.clone()) {
            warn!(record_key = %original.record_key, "record already reviewed in this run, skipping");
            return RecordOutcome::AlreadyReviewed;
        }

        let corrections = applied.len();
        self.counters.reviewed += 1;
        self.reviewed.push(original.clone());
        if corrections > 0 {
            self.counters.fixed += 1;
            self.counters.errors_fixed += corrections as u64;
            self.corrected.push(CorrectedRecord {
                original,
                corrections: applied,
            });
        }
        RecordOutcome::Recorded { corrections }
    }

    /// Keeps the writes of an abandoned record so a retry of the same record can finish it.
    ///
    /// When the same key is already in flight, its original values are kept and the new
    /// corrections are merged in.
    pub fn stash_in_flight(&mut self, original: RecordSnapshot, applied: CorrectionPlan) {
        if self.is_in_flight(&original.record_key) {
            if let Some(existing) = self.in_flight.as_mut() {
                existing.applied.merge_missing(applied);
            }
            return;
        }
        self.settle_in_flight();
        if !applied.is_empty() {
            self.in_flight = Some(InFlightRecord { original, applied });
        }
    }

    /// Takes the in-flight record for `record_key`. An in-flight record for another key is
    /// recorded first, since its writes already happened.
    pub fn take_in_flight(&mut self, record_key: &str) -> Option<InFlightRecord> {
        if self.is_in_flight(record_key) {
            return self.in_flight.take();
        }
        self.settle_in_flight();
        None
    }

    fn is_in_flight(&self, record_key: &str) -> bool {
        self.in_flight
            .as_ref()
            .is_some_and(|existing| existing.original.record_key == record_key)
    }

    /// Records whatever is still in flight. Called when the record cannot be revisited.
    pub fn settle_in_flight(&mut self) -> Option<RecordOutcome> {
        let InFlightRecord { original, applied } = self.in_flight.take()?;
        debug!(record_key = %original.record_key, applied = applied.len(), "settling partially corrected record");
        Some(self.record(original, applied))
    }

    /// Ledger lengths and counters agree.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        let applied: u64 = self.corrected.iter().map(|r| r.corrections.len() as u64).sum();
        self.counters.reviewed == self.reviewed.len() as u64
            && self.counters.fixed == self.corrected.len() as u64
            && self.counters.errors_fixed == applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::attribute::{Attribute, AttributeValue};

    fn snapshot(key: &str) -> RecordSnapshot {
        RecordSnapshot {
            record_key: key.into(),
            manufacturer_number: "42".into(),
            start_availability: AttributeValue::Blank,
            master_gtin: AttributeValue::Blank,
            net_content: "-1".into(),
            company_net_content: "10.00".into(),
        }
    }

    fn plan(entries: &[(Attribute, &str)]) -> CorrectionPlan {
        let mut plan = CorrectionPlan::new();
        for (attribute, value) in entries {
            plan.insert(*attribute, AttributeValue::from_text(*value));
        }
        plan
    }

    #[test]
    fn counters_track_ledgers() {
        let mut state = RunState::new();
        state.record(snapshot("A"), CorrectionPlan::new());
        state.record(
            snapshot("B"),
            plan(&[
                (Attribute::ManufacturerNumber, "000042"),
                (Attribute::NetContent, "10.00"),
            ]),
        );

        assert_eq!(
            state.counters(),
            RunCounters {
                reviewed: 2,
                fixed: 1,
                errors_fixed: 2
            }
        );
        assert_eq!(state.reviewed_ledger().len(), 2);
        assert_eq!(state.corrected_ledger().len(), 1);
        assert!(state.is_consistent());
    }

    #[test]
    fn duplicate_keys_are_not_recorded_twice() {
        let mut state = RunState::new();
        assert_eq!(
            state.record(snapshot("A"), CorrectionPlan::new()),
            RecordOutcome::Recorded { corrections: 0 }
        );
        assert_eq!(
            state.record(snapshot("A"), plan(&[(Attribute::MasterGtin, "1")])),
            RecordOutcome::AlreadyReviewed
        );
        assert_eq!(state.counters().reviewed, 1);
        assert!(state.is_consistent());
    }

    #[test]
    fn in_flight_merges_for_same_key() {
        let mut state = RunState::new();
        state.stash_in_flight(snapshot("A"), plan(&[(Attribute::ManufacturerNumber, "000042")]));
        let mut retried = snapshot("A");
        retried.manufacturer_number = "000042".into();
        state.stash_in_flight(retried, plan(&[(Attribute::NetContent, "10.00")]));

        let carried = state.take_in_flight("A").expect("in flight");
        assert_eq!(carried.original.manufacturer_number, AttributeValue::from("42"));
        assert_eq!(carried.applied.len(), 2);
        assert!(state.in_flight().is_none());
        assert_eq!(state.counters(), RunCounters::default());
    }

    #[test]
    fn stale_in_flight_is_settled_when_another_key_shows_up() {
        let mut state = RunState::new();
        state.stash_in_flight(snapshot("A"), plan(&[(Attribute::ManufacturerNumber, "000042")]));
        assert!(state.take_in_flight("B").is_none());
        assert_eq!(state.counters().fixed, 1);
        assert_eq!(state.corrected_ledger()[0].original.record_key, "A");
        assert!(state.is_consistent());
    }

    #[test]
    fn empty_stash_is_ignored() {
        let mut state = RunState::new();
        state.stash_in_flight(snapshot("A"), CorrectionPlan::new());
        assert!(state.in_flight().is_none());
        assert!(state.settle_in_flight().is_none());
    }
}
