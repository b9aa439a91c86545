//! Page and row bookkeeping for the traversal loop.

use crate::domain::record_source::PagingInfo;

/// Where the traversal stands. Paging fields are re-read from the source after every record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagingState {
    /// Zero-based offset of the first record on the current page.
    pub first_record_index: u64,
    /// Zero-based offset of the last record on the current page.
    pub last_record_index: u64,
    pub total_records: u64,
    /// 1-based page number.
    pub current_page: u32,
    /// 1-based row on the current page.
    pub current_row_on_page: u32,
}

impl Default for PagingState {
    fn default() -> Self {
        Self {
            first_record_index: 0,
            last_record_index: 0,
            total_records: 0,
            current_page: 1,
            current_row_on_page: 1,
        }
    }
}

/// What to do after a record has been handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraversalStep {
    /// The last record has been handled.
    Complete,
    /// The next record is on the following page.
    AdvancePage,
    /// The next record is on this page.
    NextRow,
}

#[derive(Debug, Clone, Default)]
pub struct PageTraversalController {
    state: PagingState,
}

impl PageTraversalController {
    /// Starts on row 1 of page 1.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn state(&self) -> PagingState {
        self.state
    }

    #[must_use]
    pub const fn current_page(&self) -> u32 {
        self.state.current_page
    }

    #[must_use]
    pub const fn current_row(&self) -> u32 {
        self.state.current_row_on_page
    }

    /// Takes fresh paging metadata from the source.
    pub const fn refresh(&mut self, info: PagingInfo) {
        self.state.first_record_index = info.first_record_index;
        self.state.last_record_index = info.last_record_index;
        self.state.total_records = info.total_records;
    }

    /// Records handled so far when the current row is done: `first + row`.
    #[must_use]
    pub const fn current_record(&self) -> u64 {
        self.state.first_record_index + self.state.current_row_on_page as u64
    }

    /// Zero-based offset of the record under the current row.
    #[must_use]
    pub const fn current_record_index(&self) -> u64 {
        self.current_record() - 1
    }

    /// Whether the current row points past the end of the result set.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.current_record_index() >= self.state.total_records
    }

    /// Decision once the current row has been handled.
    #[must_use]
    pub const fn next_step(&self) -> TraversalStep {
        let current = self.current_record();
        if current >= self.state.total_records {
            TraversalStep::Complete
        } else if current > self.state.last_record_index {
            TraversalStep::AdvancePage
        } else {
            TraversalStep::NextRow
        }
    }

    /// Whether `info` already shows the page after the one being traversed.
    #[must_use]
    pub const fn shows_following_page(&self, info: &PagingInfo) -> bool {
        info.first_record_index > self.state.last_record_index
    }

    pub const fn row_advanced(&mut self) {
        self.state.current_row_on_page += 1;
    }

    pub const fn page_advanced(&mut self) {
        self.state.current_page += 1;
        self.state.current_row_on_page = 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn info(first: u64, last: u64, total: u64) -> PagingInfo {
        PagingInfo {
            first_record_index: first,
            last_record_index: last,
            total_records: total,
        }
    }

    /// Drives the controller over `total` records in pages of `page_size`, returning the number
    /// of page advances and records visited.
    fn walk(total: u64, page_size: u64) -> (u32, u64) {
        let mut controller = PageTraversalController::new();
        let mut advances = 0;
        let mut visited = 0;
        loop {
            let first = u64::from(controller.current_page() - 1) * page_size;
            let last = (first + page_size).min(total) - 1;
            controller.refresh(info(first, last, total));
            assert!(!controller.is_exhausted());
            visited += 1;
            match controller.next_step() {
                TraversalStep::Complete => return (advances, visited),
                TraversalStep::AdvancePage => {
                    advances += 1;
                    controller.page_advanced();
                }
                TraversalStep::NextRow => controller.row_advanced(),
            }
        }
    }

    #[test]
    fn three_records_in_pages_of_two() {
        let mut controller = PageTraversalController::new();
        controller.refresh(info(0, 1, 3));
        assert_eq!(controller.next_step(), TraversalStep::NextRow);
        controller.row_advanced();
        assert_eq!(controller.next_step(), TraversalStep::AdvancePage);
        controller.page_advanced();
        assert_eq!(controller.current_page(), 2);
        assert_eq!(controller.current_row(), 1);

        controller.refresh(info(2, 2, 3));
        assert_eq!(controller.current_record(), 3);
        assert_eq!(controller.next_step(), TraversalStep::Complete);
    }

    #[rstest]
    #[case(1, 50, 0, 1)]
    #[case(3, 2, 1, 3)]
    #[case(3, 3, 0, 3)]
    #[case(4, 2, 1, 4)]
    #[case(101, 50, 2, 101)]
    fn visits_every_record_once(
        #[case] total: u64,
        #[case] page_size: u64,
        #[case] advances: u32,
        #[case] visited: u64,
    ) {
        assert_eq!(walk(total, page_size), (advances, visited));
    }

    #[test]
    fn shrinking_total_ends_traversal() {
        let mut controller = PageTraversalController::new();
        controller.refresh(info(0, 49, 100));
        controller.row_advanced();
        controller.refresh(info(0, 0, 1));
        assert!(controller.is_exhausted());
        assert_eq!(controller.next_step(), TraversalStep::Complete);
    }

    #[test]
    fn detects_page_that_already_moved() {
        let mut controller = PageTraversalController::new();
        controller.refresh(info(0, 49, 120));
        assert!(!controller.shows_following_page(&info(0, 49, 120)));
        assert!(controller.shows_following_page(&info(50, 99, 120)));
    }
}
