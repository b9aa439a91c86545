//! Record source access with timeouts and cancellation applied to every call.

use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::domain::attribute::{Attribute, AttributeValue};
use crate::domain::record_source::{AccessError, PagingSnapshot, RecordAccessor, RowHandle};
use crate::infrastructure::retry::{RetryPolicy, bounded_call, wait_until};

/// Wraps a [`RecordAccessor`] for the single cleanup worker.
///
/// Reads race the cancellation token and are dropped as soon as it fires. Writes check the token
/// before starting and are then allowed to finish, so a save is never cut off halfway.
#[derive(Clone, Copy)]
pub struct GuardedSource<'a> {
    source: &'a dyn RecordAccessor,
    cancel: &'a CancellationToken,
    policy: &'a RetryPolicy,
}

impl<'a> GuardedSource<'a> {
    #[must_use]
    pub fn new(
        source: &'a dyn RecordAccessor,
        cancel: &'a CancellationToken,
        policy: &'a RetryPolicy,
    ) -> Self {
        Self {
            source,
            cancel,
            policy,
        }
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    #[must_use]
    pub const fn policy(&self) -> &RetryPolicy {
        self.policy
    }

    async fn read<T, F>(&self, operation: &'static str, call: F) -> Result<T, AccessError>
    where
        F: Future<Output = Result<T, AccessError>>,
    {
        if self.cancel.is_cancelled() {
            return Err(AccessError::Cancelled);
        }
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(AccessError::Cancelled),
            result = bounded_call(self.policy.call_timeout, operation, call) => result,
        }
    }

    pub async fn paging_info(&self) -> Result<PagingSnapshot, AccessError> {
        self.read("paging_info", self.source.paging_info()).await
    }

    pub async fn row_handle(&self, row_on_page: u32) -> Result<RowHandle, AccessError> {
        self.read("row_handle", self.source.row_handle(row_on_page))
            .await
    }

    pub async fn read_attribute(
        &self,
        row: &RowHandle,
        attribute: Attribute,
    ) -> Result<AttributeValue, AccessError> {
        trace!(%row, %attribute, "reading grid cell");
        self.read("read_attribute", self.source.read_attribute(row, attribute))
            .await
    }

    pub async fn read_attribute_from_detail(
        &self,
        row: &RowHandle,
        attribute: Attribute,
    ) -> Result<AttributeValue, AccessError> {
        trace!(%row, %attribute, "reading detail view");
        self.read(
            "read_attribute_from_detail",
            self.source.read_attribute_from_detail(row, attribute),
        )
        .await
    }

    /// Irreversible: checked against cancellation once, then run to completion or timeout.
    pub async fn write_attribute(
        &self,
        row: &RowHandle,
        attribute: Attribute,
        value: &AttributeValue,
    ) -> Result<(), AccessError> {
        if self.cancel.is_cancelled() {
            return Err(AccessError::Cancelled);
        }
        bounded_call(
            self.policy.call_timeout,
            "write_attribute",
            self.source.write_attribute(row, attribute, value),
        )
        .await
    }

    /// Page navigation is a single click; like writes it is not interrupted once started.
    pub async fn advance_page(&self, current_page: u32) -> Result<(), AccessError> {
        if self.cancel.is_cancelled() {
            return Err(AccessError::Cancelled);
        }
        bounded_call(
            self.policy.call_timeout,
            "advance_page",
            self.source.advance_page(current_page),
        )
        .await
    }

    /// Waits for the grid to finish its reload cycle.
    pub async fn wait_for_grid(&self) -> Result<(), AccessError> {
        let source = self.source;
        wait_until(self.policy, self.cancel, "grid reload", || source.is_grid_ready()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::grid_fixture::{GridOperation, GridRecord, InMemoryGrid};
    use tokio_test::assert_err;

    fn grid() -> InMemoryGrid {
        InMemoryGrid::new(
            vec![GridRecord {
                product_number: "A".into(),
                ..GridRecord::default()
            }],
            50,
        )
    }

    #[tokio::test]
    async fn cancelled_token_blocks_reads_and_writes() {
        let grid = grid();
        let cancel = CancellationToken::new();
        let policy = RetryPolicy::immediate();
        let guarded = GuardedSource::new(&grid, &cancel, &policy);
        let row = guarded.row_handle(1).await.unwrap();

        cancel.cancel();
        assert_eq!(
            guarded.read_attribute(&row, Attribute::NetContent).await,
            Err(AccessError::Cancelled)
        );
        assert_eq!(
            guarded
                .write_attribute(&row, Attribute::NetContent, &"1".into())
                .await,
            Err(AccessError::Cancelled)
        );
        assert!(grid.writes().is_empty());
    }

    #[tokio::test]
    async fn waits_through_reload_cycle() {
        let grid = grid().with_reload_polls(3);
        let cancel = CancellationToken::new();
        let policy = RetryPolicy::immediate();
        let guarded = GuardedSource::new(&grid, &cancel, &policy);
        let row = guarded.row_handle(1).await.unwrap();
        guarded
            .write_attribute(&row, Attribute::NetContent, &"1".into())
            .await
            .unwrap();
        guarded.wait_for_grid().await.unwrap();
    }

    #[tokio::test]
    async fn readiness_failures_become_timeouts() {
        let grid = grid();
        grid.inject_fault(GridOperation::GridReady, u32::MAX);
        let cancel = CancellationToken::new();
        let policy = RetryPolicy {
            call_timeout: std::time::Duration::from_millis(20),
            ..RetryPolicy::immediate()
        };
        let guarded = GuardedSource::new(&grid, &cancel, &policy);
        let err = assert_err!(guarded.wait_for_grid().await);
        assert!(matches!(err, AccessError::Timeout { .. }));
    }
}
