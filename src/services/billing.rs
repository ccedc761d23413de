//! Money arithmetic for carts and orders.
//!
//! Amounts are `Decimal` with two decimal places, rounded half-up (midpoint
//! away from zero). Line subtotals, the discount, tax and service charge are
//! rounded individually; the total is the exact sum of those rounded parts, so
//! `total == subtotal - discount + tax + service_charge` always holds.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::{AppError, AppResult},
    models::{CartLine, Settings},
};

const DECIMAL_PLACES: u32 = 2;
const ORDER_ID_WIDTH: usize = 5;

/// Tax and service charge fractions, e.g. `0.10` for 10 %.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rates {
    pub tax_rate: Decimal,
    pub service_charge_rate: Decimal,
}

impl From<&Settings> for Rates {
    fn from(settings: &Settings) -> Self {
        Self {
            tax_rate: settings.tax_rate,
            service_charge_rate: settings.service_charge_rate,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct Totals {
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub tax: Decimal,
    pub service_charge: Decimal,
    pub total: Decimal,
}

pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

pub fn line_subtotal(unit_price: Decimal, quantity: i32) -> Decimal {
    round_money(unit_price * Decimal::from(quantity))
}

pub fn compute_totals(lines: &[CartLine], discount: Decimal, rates: &Rates) -> AppResult<Totals> {
    let subtotal: Decimal = lines
        .iter()
        .map(|line| line_subtotal(line.unit_price, line.quantity))
        .sum();

    if discount < Decimal::ZERO {
        return Err(AppError::InvalidDiscount("discount must not be negative".into()));
    }
    let discount = round_money(discount);
    if discount > subtotal {
        return Err(AppError::InvalidDiscount(format!(
            "discount {discount} exceeds subtotal {subtotal}"
        )));
    }

    let taxable = subtotal - discount;
    let tax = round_money(taxable * rates.tax_rate);
    let service_charge = round_money(taxable * rates.service_charge_rate);

    Ok(Totals {
        subtotal,
        discount,
        tax,
        service_charge,
        total: taxable + tax + service_charge,
    })
}

/// `ORD` followed by the counter value, zero-padded to five digits.
pub fn format_order_id(number: i64) -> String {
    format!("ORD{:0width$}", number, width = ORDER_ID_WIDTH)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(price: Decimal, quantity: i32) -> CartLine {
        CartLine {
            menu_item_id: "BEV001".into(),
            name: "Item".into(),
            unit_price: price,
            quantity,
            subtotal: line_subtotal(price, quantity),
        }
    }

    fn rates(tax: Decimal, service: Decimal) -> Rates {
        Rates {
            tax_rate: tax,
            service_charge_rate: service,
        }
    }

    #[test]
    fn worked_example_matches_expected_bill() {
        let lines = vec![line(Decimal::new(250, 2), 2), line(Decimal::new(400, 2), 1)];
        let totals = compute_totals(
            &lines,
            Decimal::ZERO,
            &rates(Decimal::new(10, 2), Decimal::new(5, 2)),
        )
        .unwrap();

        assert_eq!(totals.subtotal, Decimal::new(900, 2));
        assert_eq!(totals.tax, Decimal::new(90, 2));
        assert_eq!(totals.service_charge, Decimal::new(45, 2));
        assert_eq!(totals.total, Decimal::new(1035, 2));
    }

    #[test]
    fn identity_holds_after_rounding() {
        let prices = [
            Decimal::new(1, 2),
            Decimal::new(199, 2),
            Decimal::new(333, 2),
            Decimal::new(1250, 2),
            Decimal::new(7, 1),
        ];
        let rate_pairs = [
            rates(Decimal::new(10, 2), Decimal::new(5, 2)),
            rates(Decimal::new(1875, 4), Decimal::new(125, 4)),
            rates(Decimal::new(7, 2), Decimal::ZERO),
        ];

        for (i, price) in prices.iter().enumerate() {
            for quantity in 1..=7 {
                let lines = vec![line(*price, quantity), line(prices[(i + 2) % prices.len()], 3)];
                let subtotal: Decimal = lines.iter().map(|l| l.subtotal).sum();
                for discount in [Decimal::ZERO, Decimal::new(33, 2), subtotal] {
                    for r in &rate_pairs {
                        let t = compute_totals(&lines, discount, r).unwrap();
                        assert_eq!(t.total, t.subtotal - t.discount + t.tax + t.service_charge);
                        assert_eq!(t.total, round_money(t.total));
                    }
                }
            }
        }
    }

    #[test]
    fn rejects_discount_out_of_range() {
        let lines = vec![line(Decimal::new(500, 2), 1)];
        let r = rates(Decimal::new(10, 2), Decimal::new(5, 2));

        assert!(matches!(
            compute_totals(&lines, Decimal::new(-1, 0), &r),
            Err(AppError::InvalidDiscount(_))
        ));
        assert!(matches!(
            compute_totals(&lines, Decimal::new(-4, 3), &r),
            Err(AppError::InvalidDiscount(_))
        ));
        assert!(matches!(
            compute_totals(&lines, Decimal::new(501, 2), &r),
            Err(AppError::InvalidDiscount(_))
        ));
        let full = compute_totals(&lines, Decimal::new(500, 2), &r).unwrap();
        assert_eq!(full.total, Decimal::ZERO);
    }

    #[test]
    fn rounds_half_up() {
        assert_eq!(round_money(Decimal::new(5, 3)), Decimal::new(1, 2));
        assert_eq!(round_money(Decimal::new(4, 3)), Decimal::ZERO);
        assert_eq!(line_subtotal(Decimal::new(3335, 3), 1), Decimal::new(334, 2));
    }

    #[test]
    fn empty_cart_totals_are_zero() {
        let t = compute_totals(&[], Decimal::ZERO, &rates(Decimal::new(10, 2), Decimal::ZERO))
            .unwrap();
        assert_eq!(t.total, Decimal::ZERO);
    }

    #[test]
    fn order_ids_are_zero_padded() {
        assert_eq!(format_order_id(1), "ORD00001");
        assert_eq!(format_order_id(42), "ORD00042");
        assert_eq!(format_order_id(123456), "ORD123456");
    }
}
