//! Attribute validity rules.
//!
//! Requirements as agreed with the PIM business analysts:
//! - Manufacturer Number: numeric, exactly 6 digits.
//! - Start Availability Date Time: year of the date must be 1982 or later. The grid shows invalid
//!   dates as blank, so a blank grid cell is only a suspicion until the edit dialog is consulted.
//! - Master GTIN: blank allowed, otherwise numeric with exactly 14 digits.
//! - Net Content: only checked for blank / `-1` (full validation happens upstream).
//! - Company Net Content: at most 9 characters, at most 2 decimal digits, never blank.

use serde::{Deserialize, Serialize};

use super::attribute::AttributeValue;
use super::record::RecordSnapshot;

pub const MANUFACTURER_NUMBER_DIGITS: usize = 6;
pub const MASTER_GTIN_DIGITS: usize = 14;
pub const COMPANY_NET_CONTENT_MAX_CHARS: usize = 9;
pub const COMPANY_NET_CONTENT_MAX_DECIMALS: usize = 2;
/// Oldest year found on a legitimate product record.
pub const EARLIEST_AVAILABILITY_YEAR: i32 = 1982;
/// Marker an upstream pass writes into Net Content for confirmed-blank values.
pub const NET_CONTENT_BLANK_MARKER: &str = "-1";

/// Outcome of checking one attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Validity {
    Valid,
    Invalid,
    /// The grid cannot tell; the detail view has to be read before deciding.
    Indeterminate,
}

impl Validity {
    #[must_use]
    pub const fn from_bool(valid: bool) -> Self {
        if valid { Self::Valid } else { Self::Invalid }
    }

    #[must_use]
    pub const fn is_valid(self) -> bool {
        matches!(self, Self::Valid)
    }
}

pub(crate) fn is_all_digits(text: &str) -> bool {
    !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit())
}

#[must_use]
pub fn manufacturer_number_valid(value: &AttributeValue) -> bool {
    value
        .text()
        .is_some_and(|text| is_all_digits(text) && text.len() == MANUFACTURER_NUMBER_DIGITS)
}

/// Year check shared by the grid and dialog rules. Expects `MM/DD/YYYY hh:mm:ss`.
fn availability_year_ok(text: &str) -> bool {
    let date = text.split(' ').next().unwrap_or_default();
    if date.chars().count() != 10 {
        return false;
    }
    date.split('/')
        .nth(2)
        .and_then(|year| year.trim().parse::<i32>().ok())
        .is_some_and(|year| year >= EARLIEST_AVAILABILITY_YEAR)
}

/// Grid-sourced check: blank counts as invalid because the grid masks bad dates as blank.
#[must_use]
pub fn start_availability_valid(value: &AttributeValue) -> bool {
    value.text().is_some_and(availability_year_ok)
}

/// Dialog-sourced check: the dialog always shows the true value, so blank is a legitimate empty field.
#[must_use]
pub fn start_availability_valid_from_dialog(value: &AttributeValue) -> bool {
    value.text().is_none_or(availability_year_ok)
}

/// First phase of the two-phase start availability check.
#[must_use]
pub fn classify_start_availability(grid_value: &AttributeValue) -> Validity {
    if start_availability_valid(grid_value) {
        Validity::Valid
    } else {
        Validity::Indeterminate
    }
}

#[must_use]
pub fn master_gtin_valid(value: &AttributeValue) -> bool {
    value
        .text()
        .is_none_or(|text| is_all_digits(text) && text.len() == MASTER_GTIN_DIGITS)
}

#[must_use]
pub fn net_content_blank(value: &AttributeValue) -> bool {
    value.text().is_none_or(|text| text == NET_CONTENT_BLANK_MARKER)
}

#[must_use]
pub fn company_net_content_valid(value: &AttributeValue) -> bool {
    let Some(text) = value.text() else {
        return false;
    };
    let length = text.chars().count();
    if length > COMPANY_NET_CONTENT_MAX_CHARS {
        return false;
    }
    // Ranges ("min-max") only have the length limit.
    if text.contains('-') {
        return true;
    }
    if text.contains('.') {
        let decimals = text.split('.').nth(1).unwrap_or_default();
        return decimals.chars().count() <= COMPANY_NET_CONTENT_MAX_DECIMALS;
    }
    true
}

/// Validity of every attribute of a snapshot as seen from the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub manufacturer_number: Validity,
    pub start_availability: Validity,
    pub master_gtin: Validity,
    pub company_net_content: Validity,
    /// Net content is not validated, only checked for the blank condition.
    pub net_content_blank: bool,
}

impl ValidationReport {
    #[must_use]
    pub fn of(snapshot: &RecordSnapshot) -> Self {
        Self {
            manufacturer_number: Validity::from_bool(manufacturer_number_valid(
                &snapshot.manufacturer_number,
            )),
            start_availability: classify_start_availability(&snapshot.start_availability),
            master_gtin: Validity::from_bool(master_gtin_valid(&snapshot.master_gtin)),
            company_net_content: Validity::from_bool(company_net_content_valid(
                &snapshot.company_net_content,
            )),
            net_content_blank: net_content_blank(&snapshot.net_content),
        }
    }

    /// Settles an indeterminate start availability with the value read from the edit dialog.
    pub fn resolve_start_availability(&mut self, dialog_value: &AttributeValue) {
        if self.start_availability == Validity::Indeterminate {
            self.start_availability =
                Validity::from_bool(start_availability_valid_from_dialog(dialog_value));
        }
    }

    #[must_use]
    pub fn needs_attention(&self) -> bool {
        !self.manufacturer_number.is_valid()
            || !self.start_availability.is_valid()
            || !self.master_gtin.is_valid()
            || !self.company_net_content.is_valid()
            || self.net_content_blank
    }
}
