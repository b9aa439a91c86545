//! In-memory record source over a grid export.
//!
//! Mirrors how the PIM grid presents data: company net content is cut to 9 characters in the
//! grid, invalid start availability dates show up blank in the grid, and the detail view always
//! exposes the stored value. Saves and page changes trigger a reload cycle during which
//! [`RecordAccessor::is_grid_ready`] reports `false`. Faults can be injected per operation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, trace};

use super::paging_banner::{NO_RECORDS_BANNER, parse_paging_banner};
use crate::domain::attribute::{Attribute, AttributeValue};
use crate::domain::record_source::{
    AccessError, PagingSnapshot, RecordAccessor, RowHandle,
};
use crate::domain::validation::{COMPANY_NET_CONTENT_MAX_CHARS, start_availability_valid};

const ROW_PREFIX: &str = "row-";

/// One row of a grid export. Empty strings are blank cells.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridRecord {
    pub product_number: String,
    pub manufacturer_number: String,
    pub start_availability: String,
    pub master_gtin: String,
    pub net_content: String,
    pub company_net_content: String,
}

impl GridRecord {
    fn stored(&self, attribute: Attribute) -> &str {
        match attribute {
            Attribute::ProductNumber => &self.product_number,
            Attribute::ManufacturerNumber => &self.manufacturer_number,
            Attribute::StartAvailability => &self.start_availability,
            Attribute::MasterGtin => &self.master_gtin,
            Attribute::NetContent => &self.net_content,
            Attribute::CompanyNetContent => &self.company_net_content,
        }
    }

    fn stored_mut(&mut self, attribute: Attribute) -> Option<&mut String> {
        match attribute {
            Attribute::ProductNumber => None,
            Attribute::ManufacturerNumber => Some(&mut self.manufacturer_number),
            Attribute::StartAvailability => Some(&mut self.start_availability),
            Attribute::MasterGtin => Some(&mut self.master_gtin),
            Attribute::NetContent => Some(&mut self.net_content),
            Attribute::CompanyNetContent => Some(&mut self.company_net_content),
        }
    }

    /// Cell text as the grid renders it.
    fn displayed(&self, attribute: Attribute) -> AttributeValue {
        let stored = AttributeValue::from_text(self.stored(attribute));
        match attribute {
            Attribute::StartAvailability if !start_availability_valid(&stored) => {
                AttributeValue::Blank
            }
            Attribute::CompanyNetContent => AttributeValue::from_text(
                stored
                    .as_str()
                    .chars()
                    .take(COMPANY_NET_CONTENT_MAX_CHARS)
                    .collect::<String>(),
            ),
            _ => stored,
        }
    }
}

/// Operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GridOperation {
    PagingInfo,
    RowHandle,
    ReadAttribute,
    ReadDetail,
    WriteAttribute,
    AdvancePage,
    GridReady,
}

impl GridOperation {
    const fn name(self) -> &'static str {
        match self {
            Self::PagingInfo => "paging_info",
            Self::RowHandle => "row_handle",
            Self::ReadAttribute => "read_attribute",
            Self::ReadDetail => "read_attribute_from_detail",
            Self::WriteAttribute => "write_attribute",
            Self::AdvancePage => "advance_page",
            Self::GridReady => "is_grid_ready",
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Fault {
    skip: u32,
    remaining: u32,
}

/// A successful save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridWrite {
    pub record_key: String,
    pub attribute: Attribute,
    pub value: AttributeValue,
}

#[derive(Debug, thiserror::Error)]
pub enum GridLoadError {
    #[error("Failed to read grid export {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid grid export: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug)]
struct GridState {
    records: Vec<GridRecord>,
    page_size: u32,
    current_page: u32,
    reload_polls: u32,
    pending_reload: u32,
    faults: HashMap<GridOperation, Fault>,
    writes: Vec<GridWrite>,
    page_advances: u32,
}

impl GridState {
    fn check_fault(&mut self, operation: GridOperation) -> Result<(), AccessError> {
        let Some(fault) = self.faults.get_mut(&operation) else {
            return Ok(());
        };
        if fault.skip > 0 {
            fault.skip -= 1;
            return Ok(());
        }
        if fault.remaining == 0 {
            return Ok(());
        }
        fault.remaining -= 1;
        debug!(operation = operation.name(), "injected grid fault");
        Err(AccessError::not_found(format!(
            "{} (injected fault)",
            operation.name()
        )))
    }

    fn page_start(&self) -> usize {
        (self.current_page.saturating_sub(1) as usize) * self.page_size as usize
    }

    fn banner(&self) -> String {
        let total = self.records.len();
        if total == 0 {
            return NO_RECORDS_BANNER.to_string();
        }
        let first = self.page_start().min(total - 1);
        let last = (first + self.page_size as usize).min(total) - 1;
        format!(
            "View {} - {} of {}",
            group_thousands(first + 1),
            group_thousands(last + 1),
            group_thousands(total)
        )
    }

    fn record_index(&self, row: &RowHandle) -> Result<usize, AccessError> {
        row.as_str()
            .strip_prefix(ROW_PREFIX)
            .and_then(|index| index.parse::<usize>().ok())
            .filter(|index| *index < self.records.len())
            .ok_or_else(|| AccessError::not_found(format!("row {row}")))
    }
}

/// `1003948` -> `1,003,948`
fn group_thousands(value: usize) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

/// Record source backed by records held in memory.
#[derive(Debug)]
pub struct InMemoryGrid {
    state: Mutex<GridState>,
}

impl InMemoryGrid {
    #[must_use]
    pub fn new(records: Vec<GridRecord>, page_size: u32) -> Self {
        Self {
            state: Mutex::new(GridState {
                records,
                page_size: page_size.max(1),
                current_page: 1,
                reload_polls: 0,
                pending_reload: 0,
                faults: HashMap::new(),
                writes: Vec::new(),
                page_advances: 0,
            }),
        }
    }

    /// Loads a JSON array of [`GridRecord`]s.
    pub async fn from_json_file(path: &Path, page_size: u32) -> Result<Self, GridLoadError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| GridLoadError::Io {
                path: path.display().to_string(),
                source,
            })?;
        let records: Vec<GridRecord> = serde_json::from_slice(&bytes)?;
        Ok(Self::new(records, page_size))
    }

    /// Number of `is_grid_ready` polls answered with `false` after each save or page change.
    #[must_use]
    pub fn with_reload_polls(self, polls: u32) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.reload_polls = polls;
        }
        self
    }

    /// Fails the next `times` calls of `operation`.
    pub fn inject_fault(&self, operation: GridOperation, times: u32) {
        self.inject_fault_after(operation, 0, times);
    }

    /// Lets `skip` calls of `operation` succeed, then fails the next `times`.
    pub fn inject_fault_after(&self, operation: GridOperation, skip: u32, times: u32) {
        if let Ok(mut state) = self.state.lock() {
            state.faults.insert(
                operation,
                Fault {
                    skip,
                    remaining: times,
                },
            );
        }
    }

    #[must_use]
    pub fn records(&self) -> Vec<GridRecord> {
        self.state
            .lock()
            .map(|state| state.records.clone())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn writes(&self) -> Vec<GridWrite> {
        self.state
            .lock()
            .map(|state| state.writes.clone())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn page_advances(&self) -> u32 {
        self.state.lock().map(|state| state.page_advances).unwrap_or_default()
    }

    /// Writes the current records back out as a JSON export.
    pub async fn export_json(&self, path: &Path) -> Result<(), GridLoadError> {
        let bytes = serde_json::to_vec_pretty(&self.records())?;
        tokio::fs::write(path, bytes)
            .await
            .map_err(|source| GridLoadError::Io {
                path: path.display().to_string(),
                source,
            })
    }

    fn lock(&self) -> Result<MutexGuard<'_, GridState>, AccessError> {
        self.state.lock().map_err(|_| AccessError::Rejected {
            operation: "grid",
            reason: "grid state poisoned".to_string(),
        })
    }
}

#[async_trait]
impl RecordAccessor for InMemoryGrid {
    async fn paging_info(&self) -> Result<PagingSnapshot, AccessError> {
        let mut state = self.lock()?;
        state.check_fault(GridOperation::PagingInfo)?;
        let banner = state.banner();
        trace!(%banner, "paging banner");
        parse_paging_banner(&banner)
    }

    async fn row_handle(&self, row_on_page: u32) -> Result<RowHandle, AccessError> {
        let mut state = self.lock()?;
        state.check_fault(GridOperation::RowHandle)?;
        let index = state.page_start() + row_on_page.saturating_sub(1) as usize;
        if row_on_page == 0 || row_on_page > state.page_size || index >= state.records.len() {
            return Err(AccessError::not_found(format!(
                "row {row_on_page} on page {}",
                state.current_page
            )));
        }
        Ok(RowHandle::new(format!("{ROW_PREFIX}{index}")))
    }

    async fn read_attribute(
        &self,
        row: &RowHandle,
        attribute: Attribute,
    ) -> Result<AttributeValue, AccessError> {
        let mut state = self.lock()?;
        state.check_fault(GridOperation::ReadAttribute)?;
        let index = state.record_index(row)?;
        Ok(state.records[index].displayed(attribute))
    }

    async fn read_attribute_from_detail(
        &self,
        row: &RowHandle,
        attribute: Attribute,
    ) -> Result<AttributeValue, AccessError> {
        let mut state = self.lock()?;
        state.check_fault(GridOperation::ReadDetail)?;
        let index = state.record_index(row)?;
        Ok(AttributeValue::from_text(state.records[index].stored(attribute)))
    }

    async fn write_attribute(
        &self,
        row: &RowHandle,
        attribute: Attribute,
        value: &AttributeValue,
    ) -> Result<(), AccessError> {
        let mut state = self.lock()?;
        state.check_fault(GridOperation::WriteAttribute)?;
        let index = state.record_index(row)?;
        let record = &mut state.records[index];
        let record_key = record.product_number.clone();
        let Some(cell) = record.stored_mut(attribute) else {
            return Err(AccessError::Rejected {
                operation: "write_attribute",
                reason: format!("{attribute} is read-only"),
            });
        };
        *cell = value.as_str().to_string();

        state.writes.push(GridWrite {
            record_key,
            attribute,
            value: value.clone(),
        });
        state.pending_reload = state.reload_polls;
        Ok(())
    }

    async fn advance_page(&self, current_page: u32) -> Result<(), AccessError> {
        let mut state = self.lock()?;
        state.check_fault(GridOperation::AdvancePage)?;
        if current_page != state.current_page {
            return Err(AccessError::Rejected {
                operation: "advance_page",
                reason: format!(
                    "grid shows page {}, not page {current_page}",
                    state.current_page
                ),
            });
        }
        let next_start = state.current_page as usize * state.page_size as usize;
        if next_start >= state.records.len() {
            return Err(AccessError::Rejected {
                operation: "advance_page",
                reason: "already on the last page".to_string(),
            });
        }
        state.current_page += 1;
        state.page_advances += 1;
        state.pending_reload = state.reload_polls;
        Ok(())
    }

    async fn is_grid_ready(&self) -> Result<bool, AccessError> {
        let mut state = self.lock()?;
        state.check_fault(GridOperation::GridReady)?;
        if state.pending_reload > 0 {
            state.pending_reload -= 1;
            return Ok(false);
        }
        Ok(true)
    }
}
