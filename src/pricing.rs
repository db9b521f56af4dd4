//! Price tier selection, case/unit conversion and support-fund arithmetic.
//!
//! Everything here is pure so the order handlers stay thin: they load rows,
//! call into this module and persist the result.

use serde::Serialize;
use utoipa::ToSchema;

use crate::models::ProductEntity;

/// Class names are free-form reference data; the tier is resolved by
/// substring so "International", "Intl - International EMEA" and similar
/// variants all land on the international price.
pub fn is_international(class_name: &str) -> bool {
    class_name.to_lowercase().contains("international")
}

/// Selects the unit price for a company class. A missing or unrecognized
/// class name falls back to the Americas price.
pub fn unit_price_for_class(product: &ProductEntity, class_name: Option<&str>) -> f32 {
    match class_name {
        Some(name) if is_international(name) => product.price_international,
        _ => product.price_americas,
    }
}

/// Whether a product is listed for a company class at all.
pub fn is_visible_to_class(product: &ProductEntity, class_name: Option<&str>) -> bool {
    match class_name {
        Some(name) if is_international(name) => product.visible_international,
        _ => product.visible_americas,
    }
}

/// One order line after case-to-unit conversion.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PricedLine {
    pub product_id: i32,
    pub cases: i32,
    pub quantity: i32,
    pub unit_price: f32,
    pub total_price: f32,
}

/// Converts a case quantity into a priced line. A non-positive case quantity
/// means the line was removed from the working set, so no line is produced.
pub fn price_line(product_id: i32, cases: i32, case_pack: i32, unit_price: f32) -> Option<PricedLine> {
    if cases <= 0 {
        return None;
    }
    let quantity = cases * case_pack;
    Some(PricedLine {
        product_id,
        cases,
        quantity,
        unit_price,
        total_price: quantity as f32 * unit_price,
    })
}

pub fn order_total(lines: &[PricedLine]) -> f32 {
    lines.iter().map(|line| line.total_price).sum()
}

/// Credit earned on an order: `total_value × percent / 100`.
pub fn support_fund_earned(total_value: f32, percent: f32) -> f32 {
    total_value * percent / 100.0
}

/// Largest whole-case quantity of a product that fits into the remaining
/// credit. Degenerate prices or case packs yield 0 rather than a division
/// blow-up.
pub fn max_redeemable_cases(remaining_credit: f32, unit_price: f32, case_pack: i32) -> i32 {
    if remaining_credit <= 0.0 || unit_price <= 0.0 || case_pack <= 0 {
        return 0;
    }
    (remaining_credit / unit_price / case_pack as f32).floor() as i32
}

pub fn final_total(original_total: f32, support_fund_used: f32) -> f32 {
    original_total - support_fund_used
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn product(price_americas: f32, price_international: f32, case_pack: i32) -> ProductEntity {
        ProductEntity {
            id: 1,
            sku: "SKU-001".to_string(),
            item_name: "Sample".to_string(),
            price_americas,
            price_international,
            case_pack,
            enable: true,
            list_in_support_funds: true,
            visible_americas: true,
            visible_international: false,
            image_url: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn tier_is_selected_by_class_substring() {
        let p = product(4.0, 5.5, 6);

        assert_eq!(unit_price_for_class(&p, Some("International")), 5.5);
        assert_eq!(unit_price_for_class(&p, Some("INTERNATIONAL EMEA")), 5.5);
        assert_eq!(unit_price_for_class(&p, Some("Distributor - international")), 5.5);
        assert_eq!(unit_price_for_class(&p, Some("Americas")), 4.0);
    }

    #[test]
    fn absent_or_malformed_class_defaults_to_americas() {
        let p = product(4.0, 5.5, 6);

        assert_eq!(unit_price_for_class(&p, None), 4.0);
        assert_eq!(unit_price_for_class(&p, Some("")), 4.0);
        assert_eq!(unit_price_for_class(&p, Some("Internat1onal")), 4.0);
    }

    #[test]
    fn visibility_follows_the_same_tier_resolution() {
        let p = product(4.0, 5.5, 6);

        assert!(is_visible_to_class(&p, Some("Americas")));
        assert!(is_visible_to_class(&p, None));
        assert!(!is_visible_to_class(&p, Some("International")));
    }

    #[test]
    fn case_to_unit_conversion_is_exact() {
        for cases in 1..=50 {
            for case_pack in 1..=24 {
                let line = price_line(7, cases, case_pack, 2.5).unwrap();
                assert_eq!(line.quantity, cases * case_pack);
                assert_eq!(line.total_price, line.quantity as f32 * 2.5);
            }
        }
    }

    #[test]
    fn zero_case_quantity_drops_the_line() {
        assert_eq!(price_line(7, 0, 6, 2.5), None);
        assert_eq!(price_line(7, -1, 6, 2.5), None);
    }

    #[test]
    fn earned_credit_matches_percent_of_total() {
        let earned = support_fund_earned(1000.0, 5.0);
        assert!((earned - 50.0).abs() < 1e-4);

        let earned = support_fund_earned(1234.56, 2.5);
        assert!((earned - 30.864).abs() < 1e-3);

        assert_eq!(support_fund_earned(1000.0, 0.0), 0.0);
    }

    #[test]
    fn max_redeemable_cases_floors_the_quotient() {
        // 50 / 4 / 6 = 2.08 -> 2 cases
        assert_eq!(max_redeemable_cases(50.0, 4.0, 6), 2);
        // exactly one case worth of credit
        assert_eq!(max_redeemable_cases(24.0, 4.0, 6), 1);
        // one cent short of a case
        assert_eq!(max_redeemable_cases(23.99, 4.0, 6), 0);
    }

    #[test]
    fn max_redeemable_cases_handles_degenerate_inputs() {
        assert_eq!(max_redeemable_cases(0.0, 4.0, 6), 0);
        assert_eq!(max_redeemable_cases(-10.0, 4.0, 6), 0);
        assert_eq!(max_redeemable_cases(50.0, 0.0, 6), 0);
        assert_eq!(max_redeemable_cases(50.0, 4.0, 0), 0);
    }

    /// The worked redemption example: $1000 order at 5% earns $50; two cases
    /// of a case-pack-6 product at $4/unit come to $48, which fits, leaving a
    /// final total of $952.
    #[test]
    fn redemption_example_reconciles() {
        let earned = support_fund_earned(1000.0, 5.0);
        assert!((earned - 50.0).abs() < 1e-4);

        let line = price_line(7, 2, 6, 4.0).unwrap();
        assert_eq!(line.quantity, 12);
        assert!((line.total_price - 48.0).abs() < 1e-4);
        assert!(line.total_price <= earned);

        let total = order_total(std::slice::from_ref(&line));
        assert!((final_total(1000.0, total) - 952.0).abs() < 1e-4);
    }

    #[test]
    fn redemption_above_earned_credit_is_detectable() {
        let earned = support_fund_earned(1000.0, 5.0);
        // 3 cases x 6 units x $4 = $72 > $50
        let line = price_line(7, 3, 6, 4.0).unwrap();
        assert!(order_total(std::slice::from_ref(&line)) > earned);
    }
}
