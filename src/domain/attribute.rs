//! Attribute vocabulary shared by the rule engine and the record source.
//!
//! The grid reports an empty cell as a distinct [`AttributeValue::Blank`] instead of an in-band
//! marker string, so genuine data can never collide with the blank signal.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Product attributes the cleanup pass reads or writes.
///
/// Variant order is the order corrections are applied and the column order of the ledgers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Attribute {
    /// Business product identifier, used as the record key. Never corrected.
    ProductNumber,
    ManufacturerNumber,
    StartAvailability,
    MasterGtin,
    CompanyNetContent,
    NetContent,
}

impl Attribute {
    /// Attributes that make up a record snapshot besides the key, in ledger column order.
    pub const SNAPSHOT_COLUMNS: [Self; 5] = [
        Self::ManufacturerNumber,
        Self::StartAvailability,
        Self::MasterGtin,
        Self::NetContent,
        Self::CompanyNetContent,
    ];

    /// Label the PIM system shows for the attribute (grid header and edit dialog title).
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::ProductNumber => "Company Product Number",
            Self::ManufacturerNumber => "Manufacturer Number",
            Self::StartAvailability => "Start Availability Date Time",
            Self::MasterGtin => "Master GTIN",
            Self::CompanyNetContent => "Company Net Content",
            Self::NetContent => "Net Content",
        }
    }

    /// Whether the cleanup pass may ever write this attribute.
    #[must_use]
    pub const fn is_correctable(self) -> bool {
        !matches!(self, Self::ProductNumber)
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Value of a single attribute as read from the grid or a detail view.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum AttributeValue {
    /// The cell had no text (or no title) at all.
    #[default]
    Blank,
    Value(String),
}

impl AttributeValue {
    /// Builds a value from raw cell text; empty text becomes [`AttributeValue::Blank`].
    #[must_use]
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        if text.is_empty() {
            Self::Blank
        } else {
            Self::Value(text)
        }
    }

    #[must_use]
    pub const fn is_blank(&self) -> bool {
        matches!(self, Self::Blank)
    }

    /// Text of the value; blank reads as the empty string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Blank => "",
            Self::Value(text) => text,
        }
    }

    /// The non-blank text, if any.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Blank => None,
            Self::Value(text) => Some(text),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(text: &str) -> Self {
        Self::from_text(text)
    }
}

impl From<String> for AttributeValue {
    fn from(text: String) -> Self {
        Self::from_text(text)
    }
}

impl From<Option<String>> for AttributeValue {
    fn from(text: Option<String>) -> Self {
        text.map_or(Self::Blank, Self::from_text)
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_is_blank() {
        assert_eq!(AttributeValue::from_text(""), AttributeValue::Blank);
        assert_eq!(AttributeValue::from(None), AttributeValue::Blank);
        assert!(AttributeValue::from("").is_blank());
    }

    #[test]
    fn blank_reads_as_empty_string() {
        assert_eq!(AttributeValue::Blank.as_str(), "");
        assert_eq!(AttributeValue::Blank.text(), None);
        assert_eq!(AttributeValue::from("42").text(), Some("42"));
    }

    #[test]
    fn product_number_is_never_correctable() {
        assert!(!Attribute::ProductNumber.is_correctable());
        assert!(Attribute::SNAPSHOT_COLUMNS.iter().all(|a| a.is_correctable()));
    }

    #[test]
    fn correction_order_follows_variant_order() {
        let mut attrs = vec![
            Attribute::NetContent,
            Attribute::MasterGtin,
            Attribute::ManufacturerNumber,
            Attribute::CompanyNetContent,
            Attribute::StartAvailability,
        ];
        attrs.sort();
        assert_eq!(
            attrs,
            vec![
                Attribute::ManufacturerNumber,
                Attribute::StartAvailability,
                Attribute::MasterGtin,
                Attribute::CompanyNetContent,
                Attribute::NetContent,
            ]
        );
    }
}
