//! Property tests for the attribute rules.

use proptest::prelude::*;

use pim_data_cleanup_lib::domain::AttributeValue;
use pim_data_cleanup_lib::domain::correction::{
    correct_company_net_content, correct_manufacturer_number, correct_master_gtin,
};
use pim_data_cleanup_lib::domain::validation::{
    company_net_content_valid, manufacturer_number_valid, master_gtin_valid,
    start_availability_valid, start_availability_valid_from_dialog,
};

fn value(text: &str) -> AttributeValue {
    AttributeValue::from_text(text)
}

proptest! {
    #[test]
    fn manufacturer_number_valid_iff_six_digits(text in "\\PC{0,10}") {
        let expected = text.len() == 6 && text.bytes().all(|b| b.is_ascii_digit());
        prop_assert_eq!(manufacturer_number_valid(&value(&text)), expected);
    }

    #[test]
    fn short_manufacturer_numbers_pad_to_valid(digits in "[0-9]{1,6}") {
        let fixed = correct_manufacturer_number(&value(&digits)).unwrap();
        prop_assert!(manufacturer_number_valid(&value(&fixed)));
        prop_assert!(fixed.ends_with(&digits));
        // Already valid values are left alone.
        prop_assert_eq!(correct_manufacturer_number(&value(&fixed)).unwrap(), fixed);
    }

    #[test]
    fn short_gtins_pad_to_valid(digits in "[0-9]{1,14}") {
        let fixed = correct_master_gtin(&value(&digits)).unwrap();
        prop_assert_eq!(fixed.len(), 14);
        prop_assert!(master_gtin_valid(&value(&fixed)));
    }

    #[test]
    fn start_year_threshold(month in 1u32..=12, day in 1u32..=28, year in 1000i32..=9999) {
        let text = format!("{month:02}/{day:02}/{year} 00:00:01");
        prop_assert_eq!(start_availability_valid(&value(&text)), year >= 1982);
        prop_assert_eq!(start_availability_valid_from_dialog(&value(&text)), year >= 1982);
    }

    #[test]
    fn corrected_decimals_are_valid(whole in "[0-9]{1,8}", decimals in "[0-9]{3,6}") {
        let raw = format!("{whole}.{decimals}");
        let fixed = correct_company_net_content(&value(&raw));
        prop_assert!(company_net_content_valid(&value(&fixed)), "{} -> {}", raw, fixed);
    }

    #[test]
    fn corrected_ranges_keep_max(min in "[0-9.]{1,8}", max in "[0-9]{1,4}") {
        let raw = format!("{min}-{max}");
        let fixed = correct_company_net_content(&value(&raw));
        let (fixed_min, fixed_max) = fixed.split_once('-').unwrap();
        prop_assert!(fixed_min.chars().count() <= 4);
        prop_assert!(!(fixed_min.chars().count() == 4 && fixed_min.ends_with('.')));
        prop_assert_eq!(fixed_max, max.as_str());
    }
}
