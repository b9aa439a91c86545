//! Per-record validate, correct, apply and record sequence.
//!
//! A record moves through `Fetching -> Validating -> Correcting -> Applying -> Recorded`. Any
//! collaborator failure abandons the record for this pass; corrections already written are kept
//! as the run's in-flight record so the retry of the same row can finish the record without
//! losing track of its original values.

use tracing::{debug, info, warn};

use super::guarded_source::GuardedSource;
use crate::domain::attribute::{Attribute, AttributeValue};
use crate::domain::correction::{
    CorrectionError, correct_blank_net_content, correct_company_net_content,
    correct_manufacturer_number, correct_master_gtin, correct_start_availability,
};
use crate::domain::errors::{CleanupError, CleanupResult};
use crate::domain::record::{CorrectionPlan, RecordSnapshot};
use crate::domain::record_source::RowHandle;
use crate::domain::run_state::{RecordOutcome, RunState};
use crate::domain::validation::{ValidationReport, Validity};

/// Key column value for rows whose product number cell is empty.
pub const BLANK_RECORD_KEY: &str = "blank_in_main_grid";

/// Rows without a product number are keyed by their grid position.
fn blank_record_key(row: &RowHandle) -> String {
    format!("{BLANK_RECORD_KEY}@{row}")
}

/// How a row ended up once it was handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordDisposition {
    Recorded {
        record_key: String,
        corrections: usize,
    },
    /// The row showed a record this run already reviewed.
    AlreadyReviewed { record_key: String },
}

/// Corrections written during one pass over a record, kept even when the pass fails.
struct ApplyFailure {
    error: CleanupError,
    applied: CorrectionPlan,
}

pub struct ReconciliationEngine<'a> {
    source: GuardedSource<'a>,
}

impl<'a> ReconciliationEngine<'a> {
    #[must_use]
    pub const fn new(source: GuardedSource<'a>) -> Self {
        Self { source }
    }

    /// Handles the record on `row_on_page` of the current page.
    ///
    /// Counters and ledgers only change when the record is recorded. On
    /// [`CleanupError::CancellationRequested`] a record with at least one written correction is
    /// recorded before the error is returned.
    pub async fn process_row(
        &self,
        row_on_page: u32,
        state: &mut RunState,
    ) -> CleanupResult<RecordDisposition> {
        let row = self.source.row_handle(row_on_page).await?;
        let mut snapshot = self.fetch_snapshot(&row).await?;
        let record_key = snapshot.record_key.clone();

        let carry = state.take_in_flight(&record_key);
        if state.has_reviewed(&record_key) {
            return Ok(RecordDisposition::AlreadyReviewed { record_key });
        }

        let result = self.correct(&row, &mut snapshot).await;
        let original = carry
            .as_ref()
            .map_or(snapshot, |c| c.original.clone());
        let carried = carry.map(|c| c.applied).unwrap_or_default();

        match result {
            Ok(mut applied) => {
                applied.merge_missing(carried);
                let outcome = state.record(original, applied);
                Ok(Self::disposition(record_key, outcome))
            }
            Err(ApplyFailure { error, mut applied }) => {
                applied.merge_missing(carried);
                if error.is_cancellation() {
                    if applied.is_empty() {
                        debug!(%record_key, "record abandoned before any write");
                    } else {
                        info!(%record_key, applied = applied.len(), "recording partially corrected record");
                        state.record(original, applied);
                    }
                } else {
                    state.stash_in_flight(original, applied);
                }
                Err(error)
            }
        }
    }

    fn disposition(record_key: String, outcome: RecordOutcome) -> RecordDisposition {
        match outcome {
            RecordOutcome::Recorded { corrections } => RecordDisposition::Recorded {
                record_key,
                corrections,
            },
            RecordOutcome::AlreadyReviewed => RecordDisposition::AlreadyReviewed { record_key },
        }
    }

    async fn read(&self, row: &RowHandle, attribute: Attribute) -> CleanupResult<AttributeValue> {
        Ok(self.source.read_attribute(row, attribute).await?)
    }

    async fn fetch_snapshot(&self, row: &RowHandle) -> CleanupResult<RecordSnapshot> {
        let record_key = match self.read(row, Attribute::ProductNumber).await? {
            AttributeValue::Value(key) if !key.trim().is_empty() => key.trim().to_string(),
            _ => {
                debug!(%row, "row has no product number");
                blank_record_key(row)
            }
        };

        Ok(RecordSnapshot {
            manufacturer_number: self.read(row, Attribute::ManufacturerNumber).await?,
            start_availability: self.read(row, Attribute::StartAvailability).await?,
            master_gtin: self.read(row, Attribute::MasterGtin).await?,
            net_content: self.read(row, Attribute::NetContent).await?,
            company_net_content: self.read(row, Attribute::CompanyNetContent).await?,
            record_key,
        })
    }

    async fn correct(
        &self,
        row: &RowHandle,
        snapshot: &mut RecordSnapshot,
    ) -> Result<CorrectionPlan, ApplyFailure> {
        let fail = |error: CleanupError| ApplyFailure {
            error,
            applied: CorrectionPlan::new(),
        };

        let report = self.validate(row, snapshot).await.map_err(fail)?;
        if !report.needs_attention() {
            debug!(record_key = %snapshot.record_key, "record valid");
            return Ok(CorrectionPlan::new());
        }
        let plan = self.plan(row, snapshot, &report).await.map_err(fail)?;
        self.apply(row, &snapshot.record_key, &plan).await
    }

    /// Validates the snapshot. A start date masked in the grid is replaced by the stored value
    /// from the detail view, so the ledgers show what was cleared.
    async fn validate(
        &self,
        row: &RowHandle,
        snapshot: &mut RecordSnapshot,
    ) -> CleanupResult<ValidationReport> {
        let mut report = ValidationReport::of(snapshot);
        if report.start_availability == Validity::Indeterminate {
            let dialog_value = self
                .source
                .read_attribute_from_detail(row, Attribute::StartAvailability)
                .await?;
            report.resolve_start_availability(&dialog_value);
            snapshot.start_availability = dialog_value;
        }
        debug!(record_key = %snapshot.record_key, ?report, "validated record");
        Ok(report)
    }

    async fn plan(
        &self,
        row: &RowHandle,
        snapshot: &RecordSnapshot,
        report: &ValidationReport,
    ) -> CleanupResult<CorrectionPlan> {
        let mut plan = CorrectionPlan::new();
        let key = snapshot.record_key.as_str();

        if !report.manufacturer_number.is_valid() {
            let corrected = correct_manufacturer_number(&snapshot.manufacturer_number);
            Self::plan_entry(&mut plan, key, Attribute::ManufacturerNumber, &snapshot.manufacturer_number, corrected);
        }

        if !report.start_availability.is_valid() {
            plan.insert(Attribute::StartAvailability, correct_start_availability());
        }

        if !report.master_gtin.is_valid() {
            let corrected = correct_master_gtin(&snapshot.master_gtin);
            Self::plan_entry(&mut plan, key, Attribute::MasterGtin, &snapshot.master_gtin, corrected);
        }

        let mut corrected_company = None;
        if !report.company_net_content.is_valid() {
            let raw = self
                .source
                .read_attribute_from_detail(row, Attribute::CompanyNetContent)
                .await?;
            let corrected = correct_company_net_content(&raw);
            Self::plan_entry(&mut plan, key, Attribute::CompanyNetContent, &raw, Ok(corrected.clone()));
            corrected_company = Some(corrected);
        }

        if report.net_content_blank {
            if let Some(value) = correct_blank_net_content(
                &snapshot.company_net_content,
                corrected_company.as_deref(),
                &snapshot.net_content,
            ) {
                plan.insert(Attribute::NetContent, AttributeValue::from_text(value));
            }
        }

        Ok(plan)
    }

    /// Adds a corrected value unless it equals the current one. Corrector errors skip the attribute.
    fn plan_entry(
        plan: &mut CorrectionPlan,
        record_key: &str,
        attribute: Attribute,
        current: &AttributeValue,
        corrected: Result<String, CorrectionError>,
    ) {
        match corrected {
            Ok(value) if value == current.as_str() => {
                debug!(record_key, %attribute, %value, "correction matches current value, nothing to write");
            }
            Ok(value) => plan.insert(attribute, AttributeValue::from_text(value)),
            Err(error) => {
                let error = CleanupError::from_correction(attribute, error);
                warn!(record_key, %attribute, %error, "cannot correct attribute, skipping it");
            }
        }
    }

    async fn apply(
        &self,
        row: &RowHandle,
        record_key: &str,
        plan: &CorrectionPlan,
    ) -> Result<CorrectionPlan, ApplyFailure> {
        let mut applied = CorrectionPlan::new();
        for (attribute, value) in plan.iter() {
            if let Err(error) = self.source.write_attribute(row, attribute, value).await {
                warn!(record_key, %attribute, %error, "write failed");
                return Err(ApplyFailure {
                    error: error.into(),
                    applied,
                });
            }
            info!(record_key, %attribute, %value, "corrected attribute");
            applied.insert(attribute, value.clone());

            if let Err(error) = self.source.wait_for_grid().await {
                return Err(ApplyFailure {
                    error: error.into(),
                    applied,
                });
            }
        }
        Ok(applied)
    }
}
