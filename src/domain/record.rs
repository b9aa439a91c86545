//! Record snapshots and the corrections planned or applied for them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::attribute::{Attribute, AttributeValue};

/// Attribute values of one product record, captured once per pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSnapshot {
    pub record_key: String,
    pub manufacturer_number: AttributeValue,
    pub start_availability: AttributeValue,
    pub master_gtin: AttributeValue,
    pub net_content: AttributeValue,
    pub company_net_content: AttributeValue,
}

impl RecordSnapshot {
    /// Value of a snapshot column. The product number maps to the record key.
    #[must_use]
    pub fn value(&self, attribute: Attribute) -> AttributeValue {
        match attribute {
            Attribute::ProductNumber => AttributeValue::from_text(self.record_key.clone()),
            Attribute::ManufacturerNumber => self.manufacturer_number.clone(),
            Attribute::StartAvailability => self.start_availability.clone(),
            Attribute::MasterGtin => self.master_gtin.clone(),
            Attribute::NetContent => self.net_content.clone(),
            Attribute::CompanyNetContent => self.company_net_content.clone(),
        }
    }

    /// Reviewed-ledger row: key followed by the five original values.
    #[must_use]
    pub fn reviewed_row(&self) -> [String; 6] {
        [
            self.record_key.clone(),
            self.manufacturer_number.to_string(),
            self.start_availability.to_string(),
            self.master_gtin.to_string(),
            self.net_content.to_string(),
            self.company_net_content.to_string(),
        ]
    }
}

/// Corrected value per attribute, ordered by application order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectionPlan {
    entries: BTreeMap<Attribute, AttributeValue>,
}

impl CorrectionPlan {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the corrected value for an attribute.
    pub fn insert(&mut self, attribute: Attribute, value: AttributeValue) {
        debug_assert!(attribute.is_correctable());
        self.entries.insert(attribute, value);
    }

    #[must_use]
    pub fn get(&self, attribute: Attribute) -> Option<&AttributeValue> {
        self.entries.get(&attribute)
    }

    #[must_use]
    pub fn contains(&self, attribute: Attribute) -> bool {
        self.entries.contains_key(&attribute)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Attribute, &AttributeValue)> {
        self.entries.iter().map(|(attribute, value)| (*attribute, value))
    }

    /// Folds another plan in; entries already present here win.
    pub fn merge_missing(&mut self, other: Self) {
        for (attribute, value) in other.entries {
            self.entries.entry(attribute).or_insert(value);
        }
    }
}

/// A reviewed record together with the corrections that were actually written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectedRecord {
    pub original: RecordSnapshot,
    pub corrections: CorrectionPlan,
}

impl CorrectedRecord {
    /// Corrected-ledger row: key, then original/corrected pairs in ledger column order.
    /// The corrected cell is empty for attributes that were not changed.
    #[must_use]
    pub fn corrected_row(&self) -> [String; 11] {
        let pair = |attribute: Attribute| {
            (
                self.original.value(attribute).to_string(),
                self.corrections
                    .get(attribute)
                    .map(ToString::to_string)
                    .unwrap_or_default(),
            )
        };
        let (mfr, mfr_fixed) = pair(Attribute::ManufacturerNumber);
        let (start, start_fixed) = pair(Attribute::StartAvailability);
        let (gtin, gtin_fixed) = pair(Attribute::MasterGtin);
        let (net, net_fixed) = pair(Attribute::NetContent);
        let (company, company_fixed) = pair(Attribute::CompanyNetContent);
        [
            self.original.record_key.clone(),
            mfr,
            mfr_fixed,
            start,
            start_fixed,
            gtin,
            gtin_fixed,
            net,
            net_fixed,
            company,
            company_fixed,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> RecordSnapshot {
        RecordSnapshot {
            record_key: "1000234".into(),
            manufacturer_number: "42".into(),
            start_availability: "02/06/2018 00:00:01".into(),
            master_gtin: AttributeValue::Blank,
            net_content: "-1".into(),
            company_net_content: "10.00".into(),
        }
    }

    #[test]
    fn reviewed_row_keeps_column_order() {
        assert_eq!(
            snapshot().reviewed_row(),
            ["1000234", "42", "02/06/2018 00:00:01", "", "-1", "10.00"].map(String::from)
        );
    }

    #[test]
    fn corrected_row_leaves_unchanged_columns_empty() {
        let mut corrections = CorrectionPlan::new();
        corrections.insert(Attribute::NetContent, "10.00".into());
        corrections.insert(Attribute::ManufacturerNumber, "000042".into());
        let record = CorrectedRecord {
            original: snapshot(),
            corrections,
        };
        assert_eq!(
            record.corrected_row(),
            [
                "1000234",
                "42",
                "000042",
                "02/06/2018 00:00:01",
                "",
                "",
                "",
                "-1",
                "10.00",
                "10.00",
                ""
            ]
            .map(String::from)
        );
    }

    #[test]
    fn merge_keeps_existing_entries() {
        let mut plan = CorrectionPlan::new();
        plan.insert(Attribute::MasterGtin, "00000000000123".into());
        let mut other = CorrectionPlan::new();
        other.insert(Attribute::MasterGtin, "ignored".into());
        other.insert(Attribute::StartAvailability, AttributeValue::Blank);
        plan.merge_missing(other);
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.get(Attribute::MasterGtin), Some(&AttributeValue::from("00000000000123")));
        let order: Vec<_> = plan.iter().map(|(a, _)| a).collect();
        assert_eq!(order, vec![Attribute::StartAvailability, Attribute::MasterGtin]);
    }
}
