//! Corrected values for attributes that failed validation.

use super::attribute::AttributeValue;
use super::validation::{
    MANUFACTURER_NUMBER_DIGITS, MASTER_GTIN_DIGITS, NET_CONTENT_BLANK_MARKER,
    company_net_content_valid, is_all_digits,
};

/// Longest whole-number part kept when trimming decimals (`999999.99` is 9 characters).
const COMPANY_NET_CONTENT_MAX_WHOLE: usize = 6;
/// Longest minimum part kept when trimming a range value.
const RANGE_MIN_MAX_CHARS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CorrectionError {
    #[error("value '{0}' is not numeric")]
    NotNumeric(String),

    #[error("value '{value}' exceeds the {limit}-digit limit")]
    ExceedsLimit { value: String, limit: usize },
}

/// Left-pads a numeric value with zeros to a fixed width.
///
/// A value that already has the target width comes back unchanged.
fn pad_numeric(text: &str, width: usize) -> Result<String, CorrectionError> {
    if !is_all_digits(text) {
        return Err(CorrectionError::NotNumeric(text.to_string()));
    }
    if text.len() > width {
        return Err(CorrectionError::ExceedsLimit {
            value: text.to_string(),
            limit: width,
        });
    }
    Ok(format!("{text:0>width$}"))
}

/// Blank becomes `000000`; short numbers are zero-padded to 6 digits.
pub fn correct_manufacturer_number(value: &AttributeValue) -> Result<String, CorrectionError> {
    match value.text() {
        None => Ok("0".repeat(MANUFACTURER_NUMBER_DIGITS)),
        Some(text) => pad_numeric(text, MANUFACTURER_NUMBER_DIGITS),
    }
}

/// Short GTINs are zero-padded to 14 digits. Blank GTINs are valid and never reach this.
pub fn correct_master_gtin(value: &AttributeValue) -> Result<String, CorrectionError> {
    pad_numeric(value.as_str(), MASTER_GTIN_DIGITS)
}

/// An invalid start availability is cleared.
#[must_use]
pub const fn correct_start_availability() -> AttributeValue {
    AttributeValue::Blank
}

/// Repairs a company net content read from the edit dialog (the grid truncates at 9 characters).
///
/// - Range `min-max`: `min` is cut to 4 characters, or 3 when the 4th would be a decimal point.
/// - Decimal `whole.decimal` with more than 2 decimals: rounded half-up to 2 decimals and the
///   whole part kept to at most 6 digits.
/// - Anything else is treated as blank and flagged with `-1`.
///
/// A decimal value that already has 2 or fewer decimals is returned unchanged.
#[must_use]
pub fn correct_company_net_content(raw: &AttributeValue) -> String {
    let text = raw.as_str();

    if let Some((min, max)) = text.split_once('-') {
        let mut min: String = min.chars().take(RANGE_MIN_MAX_CHARS).collect();
        if min.chars().nth(RANGE_MIN_MAX_CHARS - 1) == Some('.') {
            min.pop();
        }
        return format!("{min}-{max}");
    }

    if let Some((whole, rest)) = text.split_once('.') {
        let decimals = rest.split('.').next().unwrap_or_default();
        if decimals.chars().count() <= 2 {
            return text.to_string();
        }
        let whole: String = whole.chars().take(COMPANY_NET_CONTENT_MAX_WHOLE).collect();
        return round_two_decimals(&whole, decimals);
    }

    NET_CONTENT_BLANK_MARKER.to_string()
}

/// Rounds `whole.decimals` half-up to two decimals using decimal string arithmetic.
///
/// Rounding, not truncation: `123.456` must become `123.46`.
///
/// Falls back to plain truncation when the parts are not digits or when the carry would push
/// the whole part past its width.
fn round_two_decimals(whole: &str, decimals: &str) -> String {
    let kept: String = decimals.chars().take(2).collect();
    let truncated = format!("{whole}.{kept}");

    let rounds_up = decimals.chars().nth(2).is_some_and(|c| ('5'..='9').contains(&c));
    if !rounds_up || !(whole.is_empty() || is_all_digits(whole)) || !is_all_digits(&kept) {
        return truncated;
    }

    let mut digits: Vec<u8> = format!("{whole}{kept}").into_bytes();
    let mut carry = true;
    for digit in digits.iter_mut().rev() {
        if !carry {
            break;
        }
        if *digit == b'9' {
            *digit = b'0';
        } else {
            *digit += 1;
            carry = false;
        }
    }
    if carry {
        digits.insert(0, b'1');
    }

    let split = digits.len() - 2;
    let new_whole = String::from_utf8_lossy(&digits[..split]).into_owned();
    if new_whole.len() > COMPANY_NET_CONTENT_MAX_WHOLE {
        return truncated;
    }
    let new_decimals = String::from_utf8_lossy(&digits[split..]).into_owned();
    format!("{new_whole}.{new_decimals}")
}

/// Picks the value a blank (or `-1`) net content should receive.
///
/// Precedence: the original company net content when it is valid, then the corrected company net
/// content when valid, then `-1` when the corrected company value is `-1`, then `-1` unless net
/// content already holds it. `None` means no write is needed.
#[must_use]
pub fn correct_blank_net_content(
    original_company: &AttributeValue,
    corrected_company: Option<&str>,
    current_net_content: &AttributeValue,
) -> Option<String> {
    if company_net_content_valid(original_company) {
        return Some(original_company.as_str().to_string());
    }
    if let Some(corrected) = corrected_company {
        if company_net_content_valid(&AttributeValue::from_text(corrected)) {
            return Some(corrected.to_string());
        }
        if corrected == NET_CONTENT_BLANK_MARKER {
            return Some(corrected.to_string());
        }
    }
    if current_net_content.as_str() != NET_CONTENT_BLANK_MARKER {
        return Some(NET_CONTENT_BLANK_MARKER.to_string());
    }
    None
}
