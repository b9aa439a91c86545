//! PIM Data Cleanup - page-by-page correction of product attribute defects
//!
//! Walks the records of a PIM grid, validates manufacturer number, start availability, master
//! GTIN, net content and company net content, writes corrected values back through the record
//! source, and saves reviewed/corrected ledgers when the run ends.

pub mod application;
pub mod domain;
pub mod infrastructure;
