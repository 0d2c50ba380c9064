//! Bill totals and payment status

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde::Serialize;

use super::round_money;

/// Lifecycle status of a bill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillStatus {
    Draft,
    #[default]
    Pending,
    PartiallyPaid,
    Paid,
    Overdue,
    Cancelled,
}

impl BillStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BillStatus::Draft => "draft",
            BillStatus::Pending => "pending",
            BillStatus::PartiallyPaid => "partially_paid",
            BillStatus::Paid => "paid",
            BillStatus::Overdue => "overdue",
            BillStatus::Cancelled => "cancelled",
        }
    }

    /// Draft and cancelled bills keep their status regardless of payments.
    pub fn is_manual(self) -> bool {
        matches!(self, BillStatus::Draft | BillStatus::Cancelled)
    }
}

/// Quantity and unit price of one bill line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineInput {
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

impl LineInput {
    pub fn new(quantity: Decimal, unit_price: Decimal) -> Self {
        Self { quantity, unit_price }
    }

    pub fn amount(&self) -> Option<Decimal> {
        line_amount(self.quantity, self.unit_price)
    }
}

/// Header-level inputs of a bill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BillInputs {
    /// Percentage, e.g. `8.25` for 8.25%.
    pub tax_rate: Decimal,
    /// Flat discount amount.
    pub discount: Decimal,
    pub amount_paid: Decimal,
}

/// Derived amounts of a bill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BillTotals {
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub discount_amount: Decimal,
    pub total: Decimal,
    pub balance_due: Decimal,
}

/// `quantity * unit_price`, rounded to cents; `None` on overflow.
pub fn line_amount(quantity: Decimal, unit_price: Decimal) -> Option<Decimal> {
    quantity.checked_mul(unit_price).map(round_money)
}

/// Computes every derived amount of a bill; `None` when an amount overflows.
///
/// The discount is capped so the total never goes below zero, and the
/// balance never goes below zero when a bill is overpaid.
pub fn compute_totals(lines: &[LineInput], inputs: &BillInputs) -> Option<BillTotals> {
    let subtotal = lines
        .iter()
        .try_fold(Decimal::ZERO, |sum, line| sum.checked_add(line.amount()?))?;
    let tax_amount = round_money(
        subtotal
            .checked_mul(inputs.tax_rate)?
            .checked_div(Decimal::ONE_HUNDRED)?,
    );
    let gross = subtotal.checked_add(tax_amount)?;
    let discount_amount = round_money(inputs.discount.max(Decimal::ZERO)).min(gross.max(Decimal::ZERO));
    let total = gross.checked_sub(discount_amount)?;
    let balance_due = total.checked_sub(inputs.amount_paid)?.max(Decimal::ZERO);

    Some(BillTotals {
        subtotal,
        tax_amount,
        discount_amount,
        total,
        balance_due,
    })
}

/// Status implied by payments and the due date.
///
/// `current` is returned unchanged when it is a manual status.
pub fn derive_status(
    current: BillStatus,
    total: Decimal,
    amount_paid: Decimal,
    due_date: Option<NaiveDate>,
    today: NaiveDate,
) -> BillStatus {
    if current.is_manual() {
        return current;
    }
    if total > Decimal::ZERO && amount_paid >= total {
        BillStatus::Paid
    } else if amount_paid > Decimal::ZERO {
        BillStatus::PartiallyPaid
    } else if due_date.is_some_and(|due| due < today) {
        BillStatus::Overdue
    } else {
        BillStatus::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calc::tests::d;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_totals() {
        let lines = [LineInput::new(d("2"), d("19.99")), LineInput::new(d("1.5"), d("10"))];
        let totals = compute_totals(
            &lines,
            &BillInputs {
                tax_rate: d("10"),
                discount: d("5"),
                amount_paid: d("20"),
            },
        )
        .unwrap();
        assert_eq!(totals.subtotal, d("54.98"));
        assert_eq!(totals.tax_amount, d("5.50"));
        assert_eq!(totals.discount_amount, d("5.00"));
        assert_eq!(totals.total, d("55.48"));
        assert_eq!(totals.balance_due, d("35.48"));
    }

    #[test]
    fn test_discount_is_capped_and_overpay_balance_is_zero() {
        let lines = [LineInput::new(d("1"), d("10"))];
        let totals = compute_totals(
            &lines,
            &BillInputs {
                tax_rate: Decimal::ZERO,
                discount: d("50"),
                amount_paid: d("3"),
            },
        )
        .unwrap();
        assert_eq!(totals.total, Decimal::ZERO);
        assert_eq!(totals.balance_due, Decimal::ZERO);
    }

    #[test]
    fn test_empty_bill() {
        let totals = compute_totals(&[], &BillInputs::default());
        assert_eq!(totals, Some(BillTotals::default()));
    }

    #[test]
    fn test_overflow_is_none() {
        let huge = d("100000000000000000");
        assert_eq!(line_amount(huge, huge), None);
        assert_eq!(compute_totals(&[LineInput::new(huge, huge)], &BillInputs::default()), None);

        let max = [LineInput::new(Decimal::ONE, Decimal::MAX)];
        let taxed = BillInputs {
            tax_rate: d("10"),
            ..BillInputs::default()
        };
        assert_eq!(compute_totals(&max, &taxed), None);
    }

    #[test]
    fn test_status() {
        let today = date("2024-05-10");
        let due = Some(date("2024-05-01"));
        assert_eq!(derive_status(BillStatus::Pending, d("10"), d("10"), due, today), BillStatus::Paid);
        assert_eq!(
            derive_status(BillStatus::Pending, d("10"), d("4"), due, today),
            BillStatus::PartiallyPaid
        );
        assert_eq!(derive_status(BillStatus::Pending, d("10"), d("0"), due, today), BillStatus::Overdue);
        assert_eq!(
            derive_status(BillStatus::Overdue, d("10"), d("0"), Some(date("2024-06-01")), today),
            BillStatus::Pending
        );
        assert_eq!(derive_status(BillStatus::Draft, d("10"), d("10"), due, today), BillStatus::Draft);
        assert_eq!(derive_status(BillStatus::Pending, d("0"), d("0"), None, today), BillStatus::Pending);
    }
}
