//! Top-level cleanup loop: traversal, hiccup tolerance, cancellation and finalize.

use chrono::{DateTime, Local};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::guarded_source::GuardedSource;
use super::reconciliation::{ReconciliationEngine, RecordDisposition};
use super::traversal::{PageTraversalController, TraversalStep};
use crate::domain::errors::{CleanupError, CleanupResult};
use crate::domain::record_source::{PagingSnapshot, RecordAccessor};
use crate::domain::run_state::{RunCounters, RunState, StopReason};
use crate::infrastructure::persistence::{
    PersistedArtifacts, PersistenceError, ResultSink, RunReport,
};
use crate::infrastructure::retry::{RetryPolicy, cancellable_sleep};

/// Consecutive failed steps of the traversal loop.
#[derive(Debug, Clone, Copy)]
pub struct HiccupCounter {
    consecutive: u32,
    total: u32,
    limit: u32,
}

impl HiccupCounter {
    #[must_use]
    pub const fn new(limit: u32) -> Self {
        Self {
            consecutive: 0,
            total: 0,
            limit,
        }
    }

    /// Counts a hiccup; `true` once the limit is reached.
    pub const fn record(&mut self) -> bool {
        self.consecutive += 1;
        self.total += 1;
        self.consecutive >= self.limit
    }

    pub const fn reset(&mut self) {
        self.consecutive = 0;
    }

    #[must_use]
    pub const fn consecutive(&self) -> u32 {
        self.consecutive
    }

    #[must_use]
    pub const fn total(&self) -> u32 {
        self.total
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Handle the record under the current row.
    Review,
    /// Decide where the next record is.
    Traverse,
    /// Move to the next page.
    TurnPage,
}

enum Step {
    Continue(Phase),
    Stop(StopReason),
}

/// Result of a finished run.
#[derive(Debug)]
pub struct RunOutcome {
    pub run_id: Uuid,
    pub stop_reason: StopReason,
    pub counters: RunCounters,
    pub state: RunState,
    pub hiccups: u32,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
    pub persisted: Result<PersistedArtifacts, PersistenceError>,
}

impl RunOutcome {
    /// Traversal finished (or was stopped by the operator) and the artifacts were saved.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        !self.stop_reason.is_failure() && self.persisted.is_ok()
    }
}

pub struct RunSupervisor<'a> {
    source: &'a dyn RecordAccessor,
    sink: &'a dyn ResultSink,
    policy: RetryPolicy,
    cancel: CancellationToken,
}

impl<'a> RunSupervisor<'a> {
    #[must_use]
    pub fn new(
        source: &'a dyn RecordAccessor,
        sink: &'a dyn ResultSink,
        policy: RetryPolicy,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            source,
            sink,
            policy,
            cancel,
        }
    }

    /// Token that stops the run when cancelled, e.g. from an operator signal handler.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Runs the cleanup to completion, cancellation or the hiccup limit, then persists the
    /// ledgers. Consumes the supervisor, so finalize happens exactly once.
    pub async fn run(self) -> RunOutcome {
        let run_id = Uuid::new_v4();
        let started_at = Local::now();
        info!(%run_id, max_hiccups = self.policy.max_consecutive_hiccups, "Cleanup run started");

        let mut state = RunState::new();
        let mut hiccups = HiccupCounter::new(self.policy.max_consecutive_hiccups);
        let stop_reason = self.drive(&mut state, &mut hiccups).await;

        self.finalize(run_id, started_at, stop_reason, state, hiccups)
            .await
    }

    async fn drive(&self, state: &mut RunState, hiccups: &mut HiccupCounter) -> StopReason {
        let guarded = GuardedSource::new(self.source, &self.cancel, &self.policy);
        let engine = ReconciliationEngine::new(guarded);
        let mut controller = PageTraversalController::new();
        let mut phase = Phase::Review;

        loop {
            if self.cancel.is_cancelled() {
                info!("Cancellation requested, stopping traversal");
                return StopReason::Cancelled;
            }

            let step = match phase {
                Phase::Review => Self::review(&guarded, &engine, &mut controller, state).await,
                Phase::Traverse => Self::traverse(&guarded, &mut controller).await,
                Phase::TurnPage => Self::turn_page(&guarded, &mut controller).await,
            };

            match step {
                Ok(Step::Continue(next)) => {
                    hiccups.reset();
                    phase = next;
                }
                Ok(Step::Stop(reason)) => return reason,
                Err(CleanupError::CancellationRequested) => {
                    info!("Cancellation requested, stopping traversal");
                    return StopReason::Cancelled;
                }
                Err(error) => {
                    let limit_reached = hiccups.record();
                    warn!(
                        consecutive = hiccups.consecutive(),
                        limit = self.policy.max_consecutive_hiccups,
                        page = controller.current_page(),
                        row = controller.current_row(),
                        ?phase,
                        %error,
                        "Hiccup"
                    );
                    if limit_reached {
                        error!(
                            consecutive = hiccups.consecutive(),
                            "Too many consecutive hiccups, stopping run"
                        );
                        return StopReason::HiccupLimit;
                    }
                    let delay = self.policy.hiccup_backoff(hiccups.consecutive());
                    if !cancellable_sleep(delay, &self.cancel).await {
                        return StopReason::Cancelled;
                    }
                }
            }
        }
    }

    async fn review(
        guarded: &GuardedSource<'_>,
        engine: &ReconciliationEngine<'_>,
        controller: &mut PageTraversalController,
        state: &mut RunState,
    ) -> CleanupResult<Step> {
        guarded.wait_for_grid().await?;
        let info = match guarded.paging_info().await? {
            PagingSnapshot::NoRecords if state.counters().reviewed == 0 => {
                info!("No records to review");
                return Ok(Step::Stop(StopReason::NoRecords));
            }
            PagingSnapshot::NoRecords => return Ok(Step::Stop(StopReason::Completed)),
            PagingSnapshot::Records(info) => info,
        };
        controller.refresh(info);
        if controller.is_exhausted() {
            return Ok(Step::Stop(StopReason::Completed));
        }

        match engine.process_row(controller.current_row(), state).await? {
            RecordDisposition::Recorded {
                record_key,
                corrections,
            } => {
                let counters = state.counters();
                info!(
                    %record_key,
                    corrections,
                    record = controller.current_record(),
                    total = info.total_records,
                    reviewed = counters.reviewed,
                    fixed = counters.fixed,
                    errors_fixed = counters.errors_fixed,
                    "Record reviewed"
                );
            }
            RecordDisposition::AlreadyReviewed { record_key } => {
                warn!(%record_key, row = controller.current_row(), "Row shows an already reviewed record, moving on");
            }
        }
        Ok(Step::Continue(Phase::Traverse))
    }

    async fn traverse(
        guarded: &GuardedSource<'_>,
        controller: &mut PageTraversalController,
    ) -> CleanupResult<Step> {
        let PagingSnapshot::Records(info) = guarded.paging_info().await? else {
            return Ok(Step::Stop(StopReason::Completed));
        };
        controller.refresh(info);
        Ok(match controller.next_step() {
            TraversalStep::Complete => Step::Stop(StopReason::Completed),
            TraversalStep::NextRow => {
                controller.row_advanced();
                Step::Continue(Phase::Review)
            }
            TraversalStep::AdvancePage => Step::Continue(Phase::TurnPage),
        })
    }

    async fn turn_page(
        guarded: &GuardedSource<'_>,
        controller: &mut PageTraversalController,
    ) -> CleanupResult<Step> {
        // A previous attempt may have navigated before failing.
        if let PagingSnapshot::Records(info) = guarded.paging_info().await? {
            if controller.shows_following_page(&info) {
                controller.page_advanced();
                return Ok(Step::Continue(Phase::Review));
            }
        }

        guarded.advance_page(controller.current_page()).await?;
        controller.page_advanced();
        info!(page = controller.current_page(), "Advanced to next page");
        Ok(Step::Continue(Phase::Review))
    }

    async fn finalize(
        self,
        run_id: Uuid,
        started_at: DateTime<Local>,
        stop_reason: StopReason,
        mut state: RunState,
        hiccups: HiccupCounter,
    ) -> RunOutcome {
        if let Some(outcome) = state.settle_in_flight() {
            info!(?outcome, "Recorded partially corrected record at finalize");
        }

        let finished_at = Local::now();
        let counters = state.counters();
        info!(
            %run_id,
            %stop_reason,
            reviewed = counters.reviewed,
            fixed = counters.fixed,
            errors_fixed = counters.errors_fixed,
            hiccups = hiccups.total(),
            "Activity summary"
        );

        let report = RunReport {
            run_id,
            started_at,
            finished_at,
            stop_reason,
            counters,
            reviewed: state.reviewed_ledger(),
            corrected: state.corrected_ledger(),
        };
        let persisted = self.sink.persist(&report).await;
        if let Err(error) = &persisted {
            error!(%error, "Failed to save run artifacts");
        }

        RunOutcome {
            run_id,
            stop_reason,
            counters,
            state,
            hiccups: hiccups.total(),
            started_at,
            finished_at,
            persisted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hiccup_counter_resets_on_progress() {
        let mut counter = HiccupCounter::new(3);
        assert!(!counter.record());
        assert!(!counter.record());
        counter.reset();
        assert!(!counter.record());
        assert!(!counter.record());
        assert!(counter.record());
        assert_eq!(counter.consecutive(), 3);
        assert_eq!(counter.total(), 5);
    }
}
