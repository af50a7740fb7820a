//! Hire rates and their volume discount tables.
//!
//! Rates are read-only reference data; the core selects them per event and
//! reads them back when assembling invoices.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How a discount band reduces the bill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountKind {
    /// A fixed amount off, regardless of duration.
    Flat,
}

/// One band in a discount table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountBand {
    #[serde(rename = "type")]
    pub kind: DiscountKind,
    pub value: Decimal,
}

/// Tiered volume discounts keyed by an hours threshold.
///
/// Keys are stringly-typed hour counts (the stored JSON shape); a booking
/// qualifies for every band whose threshold it meets and gets the largest.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiscountTable(pub BTreeMap<String, DiscountBand>);

impl DiscountTable {
    /// The best (largest) discount for a booking of `hours`, if any band
    /// applies. Returned as a positive amount; callers negate it when
    /// writing a discount line.
    pub fn discount_for_hours(&self, hours: Decimal) -> Option<Decimal> {
        self.0
            .iter()
            .filter_map(|(threshold, band)| {
                let threshold: Decimal = threshold.parse().ok()?;
                (hours >= threshold).then_some(band.value)
            })
            .max()
    }
}

/// A hire rate: hourly price plus its discount table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rate {
    pub id: String,
    pub description: String,
    pub hourly_rate: Decimal,
    pub discounts: DiscountTable,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn table() -> DiscountTable {
        let mut bands = BTreeMap::new();
        bands.insert(
            "5".to_string(),
            DiscountBand {
                kind: DiscountKind::Flat,
                value: dec("25"),
            },
        );
        bands.insert(
            "10".to_string(),
            DiscountBand {
                kind: DiscountKind::Flat,
                value: dec("50"),
            },
        );
        DiscountTable(bands)
    }

    #[test]
    fn short_bookings_get_no_discount() {
        assert_eq!(table().discount_for_hours(dec("2")), None);
    }

    #[test]
    fn qualifying_bookings_get_the_largest_band() {
        assert_eq!(table().discount_for_hours(dec("5")), Some(dec("25")));
        assert_eq!(table().discount_for_hours(dec("12")), Some(dec("50")));
    }

    #[test]
    fn table_round_trips_through_the_stored_json_shape() {
        let json = r#"{"5":{"type":"flat","value":"25"},"10":{"type":"flat","value":"50"}}"#;
        let parsed: DiscountTable = serde_json::from_str(json).unwrap();
        assert_eq!(parsed, table());
    }
}
