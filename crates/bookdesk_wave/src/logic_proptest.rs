#[cfg(test)]
mod tests {
    use crate::logic::{compute_totals, format_cents, AddOn, DiscountMode};
    use bookdesk_config::{InvoicingConfig, TaxApplies};
    use proptest::prelude::*;

    fn applies() -> impl Strategy<Value = TaxApplies> {
        prop_oneof![Just(TaxApplies::BeforeDiscount), Just(TaxApplies::AfterDiscount)]
    }

    proptest! {
        #[test]
        fn taxable_base_is_bounded(
            total in 0i64..5_000_000,
            addon_prices in prop::collection::vec(0i64..100_000, 0..5),
            discount in -1_000.0f64..100_000.0,
            rate in 0.0f64..0.25,
            applies in applies(),
        ) {
            let addons: Vec<AddOn> = addon_prices
                .iter()
                .map(|p| AddOn { name: "x".into(), price: *p })
                .collect();
            let rules = InvoicingConfig { tax_rate: rate, tax_applies: applies, due_days: 7 };
            let totals = compute_totals(total, &addons, DiscountMode::Amount, discount, &rules).unwrap();

            prop_assert_eq!(totals.subtotal_base, total + addon_prices.iter().sum::<i64>());
            prop_assert!(totals.discount >= 0);
            prop_assert!(totals.taxable_base >= 0);
            prop_assert!(totals.taxable_base <= totals.subtotal_base);
            prop_assert!(totals.tax >= 0);
            prop_assert!(totals.tax <= totals.taxable_base);
        }

        #[test]
        fn percent_discount_never_exceeds_subtotal(
            total in 0i64..5_000_000,
            pct in 0.0f64..100.0,
        ) {
            let totals = compute_totals(total, &[], DiscountMode::Percent, pct, &InvoicingConfig::default()).unwrap();
            prop_assert!(totals.discount <= totals.subtotal_base);
        }

        #[test]
        fn cents_format_parses_back(cents in -10_000_000i64..10_000_000) {
            let rendered = format_cents(cents);
            let parsed: f64 = rendered.parse().unwrap();
            prop_assert_eq!((parsed * 100.0).round() as i64, cents);
        }
    }
}
