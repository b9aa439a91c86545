//! Contract of the collaborator that exposes product records through the PIM grid.
//!
//! Implementations own everything UI-specific: locating elements, opening and closing edit
//! dialogs, waiting for DOM transitions. The cleanup core only sees the operations below.

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

use super::attribute::{Attribute, AttributeValue};

/// Paging metadata of the page currently shown.
///
/// Record positions are zero-based offsets into the full result set, so the banner
/// "View 401 - 450 of 1,003,948" maps to `400..=449` of `1_003_948`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagingInfo {
    pub first_record_index: u64,
    pub last_record_index: u64,
    pub total_records: u64,
}

impl PagingInfo {
    /// Number of rows on the current page.
    #[must_use]
    pub const fn rows_on_page(&self) -> u64 {
        self.last_record_index
            .saturating_sub(self.first_record_index)
            .saturating_add(1)
    }
}

/// Result of asking the source for paging metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagingSnapshot {
    Records(PagingInfo),
    /// The search returned nothing to review.
    NoRecords,
}

/// Opaque handle of a grid row, valid until the grid reloads.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RowHandle(String);

impl RowHandle {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Failure reported by the record source.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
    #[error("element not found: {what}")]
    ElementNotFound { what: String },

    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("{operation} was rejected: {reason}")]
    Rejected {
        operation: &'static str,
        reason: String,
    },

    #[error("malformed {what}: {detail}")]
    Malformed { what: String, detail: String },

    #[error("operation cancelled")]
    Cancelled,
}

impl AccessError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::ElementNotFound { what: what.into() }
    }

    pub fn malformed(what: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Malformed {
            what: what.into(),
            detail: detail.into(),
        }
    }
}

/// Record source consumed by the cleanup core.
///
/// Calls are issued sequentially by a single worker; implementations do not need to support
/// concurrent use but must be shareable across tasks.
#[async_trait]
pub trait RecordAccessor: Send + Sync {
    /// Paging metadata of the page currently displayed.
    async fn paging_info(&self) -> Result<PagingSnapshot, AccessError>;

    /// Handle of the 1-based row on the current page.
    async fn row_handle(&self, row_on_page: u32) -> Result<RowHandle, AccessError>;

    /// Grid-level read. Empty cells come back as [`AttributeValue::Blank`].
    async fn read_attribute(
        &self,
        row: &RowHandle,
        attribute: Attribute,
    ) -> Result<AttributeValue, AccessError>;

    /// Opens the attribute's detail view, reads the untruncated value and cancels the view.
    async fn read_attribute_from_detail(
        &self,
        row: &RowHandle,
        attribute: Attribute,
    ) -> Result<AttributeValue, AccessError>;

    /// Opens the detail view, replaces the value, saves and confirms the view closed.
    async fn write_attribute(
        &self,
        row: &RowHandle,
        attribute: Attribute,
        value: &AttributeValue,
    ) -> Result<(), AccessError>;

    /// Navigates from `current_page` (1-based) to the next page.
    async fn advance_page(&self, current_page: u32) -> Result<(), AccessError>;

    /// Whether the grid finished reloading after a save or page change.
    async fn is_grid_ready(&self) -> Result<bool, AccessError> {
        Ok(true)
    }
}
