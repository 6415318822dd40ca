//! Price arithmetic using decimal types.
//!
//! Money is represented as `rust_decimal::Decimal` in the currency's
//! standard unit (dollars, not cents). There is a single pricing rule in
//! Trellis: a product's displayed price is its custom override when set,
//! otherwise the cheapest default price among its assigned categories,
//! otherwise zero.

use rust_decimal::Decimal;

/// Compute the price displayed to a buyer.
///
/// Returns `custom_price` when set, else the minimum of
/// `category_defaults`, else zero. Cart item snapshots store the result of
/// this function at submission time and never recalculate it.
#[must_use]
pub fn effective_price(custom_price: Option<Decimal>, category_defaults: &[Decimal]) -> Decimal {
    custom_price.unwrap_or_else(|| {
        category_defaults
            .iter()
            .min()
            .copied()
            .unwrap_or(Decimal::ZERO)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::dec;

    #[test]
    fn custom_price_wins_over_categories() {
        let price = effective_price(Some(dec!(19.99)), &[dec!(10), dec!(5)]);
        assert_eq!(price, dec!(19.99));
    }

    #[test]
    fn cheapest_category_default_applies_without_override() {
        let price = effective_price(None, &[dec!(12.50), dec!(8.00), dec!(30)]);
        assert_eq!(price, dec!(8.00));
    }

    #[test]
    fn no_override_and_no_categories_is_zero() {
        assert_eq!(effective_price(None, &[]), Decimal::ZERO);
    }

    #[test]
    fn zero_custom_price_is_respected() {
        // An explicit zero override is still an override.
        let price = effective_price(Some(Decimal::ZERO), &[dec!(10)]);
        assert_eq!(price, Decimal::ZERO);
    }
}
