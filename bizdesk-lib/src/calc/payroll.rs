//! Payroll gross/net calculations

use rust_decimal::Decimal;

use super::round_money;

/// Earnings and deductions of one payroll record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PayInputs {
    pub base_salary: Decimal,
    pub overtime_hours: Decimal,
    pub overtime_rate: Decimal,
    pub bonus: Decimal,
    pub allowances: Decimal,
    pub tax: Decimal,
    pub benefits: Decimal,
    pub other_deductions: Decimal,
}

/// Derived pay amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PayBreakdown {
    pub overtime_pay: Decimal,
    pub gross_pay: Decimal,
    pub total_deductions: Decimal,
    pub net_pay: Decimal,
}

/// Computes overtime, gross, deductions and net pay; `None` when an amount
/// overflows.
///
/// Net pay may be negative; callers reject such records during validation.
pub fn compute_pay(inputs: &PayInputs) -> Option<PayBreakdown> {
    let overtime_pay = round_money(inputs.overtime_hours.checked_mul(inputs.overtime_rate)?);
    let gross_pay = round_money(
        inputs
            .base_salary
            .checked_add(overtime_pay)?
            .checked_add(inputs.bonus)?
            .checked_add(inputs.allowances)?,
    );
    let total_deductions = round_money(
        inputs
            .tax
            .checked_add(inputs.benefits)?
            .checked_add(inputs.other_deductions)?,
    );

    Some(PayBreakdown {
        overtime_pay,
        gross_pay,
        total_deductions,
        net_pay: gross_pay.checked_sub(total_deductions)?,
    })
}

/// Sums over the records of one pay period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PeriodTotals {
    pub employees: usize,
    pub gross_pay: Decimal,
    pub total_deductions: Decimal,
    pub net_pay: Decimal,
}

impl PeriodTotals {
    /// Adds one record; `None` when a sum overflows.
    pub fn checked_add(mut self, pay: &PayBreakdown) -> Option<Self> {
        self.employees += 1;
        self.gross_pay = self.gross_pay.checked_add(pay.gross_pay)?;
        self.total_deductions = self.total_deductions.checked_add(pay.total_deductions)?;
        self.net_pay = self.net_pay.checked_add(pay.net_pay)?;
        Some(self)
    }

    /// Sums every record of a period.
    pub fn try_sum<'a, I>(pays: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a PayBreakdown>,
    {
        pays.into_iter().try_fold(Self::default(), Self::checked_add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calc::tests::d;

    #[test]
    fn test_compute_pay() {
        let pay = compute_pay(&PayInputs {
            base_salary: d("3000"),
            overtime_hours: d("4.5"),
            overtime_rate: d("22.25"),
            bonus: d("100"),
            allowances: d("50"),
            tax: d("450.10"),
            benefits: d("120"),
            other_deductions: d("0"),
        })
        .unwrap();
        assert_eq!(pay.overtime_pay, d("100.13"));
        assert_eq!(pay.gross_pay, d("3250.13"));
        assert_eq!(pay.total_deductions, d("570.10"));
        assert_eq!(pay.net_pay, d("2680.03"));
    }

    #[test]
    fn test_period_totals() {
        let a = compute_pay(&PayInputs {
            base_salary: d("1000"),
            tax: d("100"),
            ..PayInputs::default()
        })
        .unwrap();
        let b = compute_pay(&PayInputs {
            base_salary: d("2000"),
            tax: d("300"),
            ..PayInputs::default()
        })
        .unwrap();
        let totals = PeriodTotals::try_sum(&[a, b]).unwrap();
        assert_eq!(totals.employees, 2);
        assert_eq!(totals.gross_pay, d("3000"));
        assert_eq!(totals.net_pay, d("2600"));
    }

    #[test]
    fn test_overflow_is_none() {
        let pay = PayInputs {
            base_salary: Decimal::MAX,
            bonus: d("1"),
            ..PayInputs::default()
        };
        assert_eq!(compute_pay(&pay), None);

        let max = PayBreakdown {
            gross_pay: Decimal::MAX,
            ..PayBreakdown::default()
        };
        assert_eq!(PeriodTotals::try_sum(&[max, max]), None);
    }
}
