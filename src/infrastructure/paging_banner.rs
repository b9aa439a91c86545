//! Parsing of the grid's paging banner, e.g. `View 401 - 450 of 1,003,948`.
//!
//! UI-backed record sources read the banner text and hand it here; positions are converted to
//! zero-based offsets for [`PagingInfo`].

use crate::domain::record_source::{AccessError, PagingInfo, PagingSnapshot};

/// Banner shown when the search has no results.
pub const NO_RECORDS_BANNER: &str = "No records to view";

const BANNER: &str = "paging banner";

fn parse_count(token: &str, field: &str) -> Result<u64, AccessError> {
    token
        .replace(',', "")
        .parse::<u64>()
        .map_err(|err| AccessError::malformed(BANNER, format!("{field} '{token}': {err}")))
}

/// Parses `View <first> - <last> of <total>`.
pub fn parse_paging_banner(text: &str) -> Result<PagingSnapshot, AccessError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(AccessError::malformed(BANNER, "empty text"));
    }
    if text == NO_RECORDS_BANNER {
        return Ok(PagingSnapshot::NoRecords);
    }

    let tokens: Vec<&str> = text.split_whitespace().collect();
    let [_, first, "-", last, "of", total] = tokens.as_slice() else {
        return Err(AccessError::malformed(BANNER, format!("unexpected layout '{text}'")));
    };

    let first = parse_count(first, "first record")?;
    let last = parse_count(last, "last record")?;
    let total = parse_count(total, "total records")?;

    if total < 1 {
        return Err(AccessError::malformed(BANNER, "total records less than 1"));
    }
    if first < 1 || last < first || last > total {
        return Err(AccessError::malformed(
            BANNER,
            format!("inconsistent range {first}-{last} of {total}"),
        ));
    }

    Ok(PagingSnapshot::Records(PagingInfo {
        first_record_index: first - 1,
        last_record_index: last - 1,
        total_records: total,
    }))
}
