use chrono::{DateTime, Months, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::{Money, Rate};
use crate::errors::{LendingError, Result};
use crate::types::{LoanId, PaymentId, PaymentStatus};

/// one scheduled installment of a funded loan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub loan_id: LoanId,
    /// 1-based position in the schedule
    pub payment_number: u32,
    /// amount the borrower owes on the due date
    pub amount: Money,
    pub due_date: NaiveDate,
    pub status: PaymentStatus,
    pub paid_at: Option<DateTime<Utc>>,
    /// slice of the platform fee collected with this installment
    pub platform_fee_share: Money,
    /// what the lender receives, amount minus the fee share
    pub lender_share: Money,
}

impl Payment {
    pub fn is_paid(&self) -> bool {
        self.status == PaymentStatus::Paid
    }
}

/// Full repayment schedule for a funded loan.
///
/// Interest is flat: every month charges the monthly rate on the whole
/// financed amount, and the financed amount is split into equal principal
/// slices. The recurring installment is rounded to cents half-up; the last
/// installment absorbs all rounding residue so the schedule sums exactly
/// to `total_due + total_interest`. The platform fee is split the same
/// way, with the last share absorbing its residue, so the shares sum
/// exactly to the fee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallmentSchedule {
    pub loan_id: LoanId,
    /// principal plus platform fee, the financed amount
    pub total_due: Money,
    /// flat interest charged over the whole period
    pub total_interest: Money,
    /// recurring installment amount, rounded to cents
    pub installment: Money,
    pub payments: Vec<Payment>,
}

impl InstallmentSchedule {
    pub fn generate(
        loan_id: LoanId,
        principal: Money,
        annual_rate: Rate,
        period_months: u32,
        platform_fee: Money,
        funded_at: DateTime<Utc>,
    ) -> Result<Self> {
        if period_months == 0 {
            return Err(LendingError::InvalidPeriod {
                months: period_months,
            });
        }

        let months = Decimal::from(period_months);
        let monthly_rate = annual_rate.monthly_rate().as_decimal();
        let total_due = principal + platform_fee;

        let principal_portion = total_due.as_decimal() / months;
        let interest_portion = total_due.as_decimal() * monthly_rate;
        let installment = Money::from_decimal(principal_portion + interest_portion).round_to_cents();
        let total_interest = Money::from_decimal(interest_portion * months);

        let grand_total = total_due + total_interest;
        let fee_share = platform_fee / months;

        let mut payments = Vec::with_capacity(period_months as usize);
        for number in 1..=period_months {
            let last = number == period_months;

            let amount = if last {
                grand_total - installment * Decimal::from(period_months - 1)
            } else {
                installment
            };
            let platform_fee_share = if last {
                platform_fee - fee_share * Decimal::from(period_months - 1)
            } else {
                fee_share
            };

            // one calendar month per installment, day-of-month clamped
            // to the end of shorter months
            let due_date = funded_at
                .checked_add_months(Months::new(number))
                .ok_or(LendingError::InvalidPeriod {
                    months: period_months,
                })?
                .date_naive();

            payments.push(Payment {
                id: Uuid::new_v4(),
                loan_id,
                payment_number: number,
                amount,
                due_date,
                status: PaymentStatus::Pending,
                paid_at: None,
                platform_fee_share,
                lender_share: amount - platform_fee_share,
            });
        }

        Ok(InstallmentSchedule {
            loan_id,
            total_due,
            total_interest,
            installment,
            payments,
        })
    }

    /// everything the borrower will pay over the life of the loan
    pub fn grand_total(&self) -> Money {
        self.total_due + self.total_interest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn funded_at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    fn money(d: Decimal) -> Money {
        Money::from_decimal(d)
    }

    #[test]
    fn test_six_month_schedule_hand_computed() {
        let schedule = InstallmentSchedule::generate(
            Uuid::new_v4(),
            Money::from_major(5_000),
            Rate::from_percentage(dec!(15)),
            6,
            money(dec!(3.75)),
            funded_at(2024, 1, 15),
        )
        .unwrap();

        // 5003.75 / 6 = 833.9583..., 5003.75 * 0.0125 = 62.546875,
        // sum 896.5052... rounds half-up to 896.51
        assert_eq!(schedule.total_due, money(dec!(5003.75)));
        assert_eq!(schedule.installment, money(dec!(896.51)));
        assert_eq!(schedule.total_interest, money(dec!(375.28125)));
        assert_eq!(schedule.grand_total(), money(dec!(5379.03125)));
        assert_eq!(schedule.payments.len(), 6);

        for payment in &schedule.payments[..5] {
            assert_eq!(payment.amount, money(dec!(896.51)));
            assert_eq!(payment.platform_fee_share, money(dec!(0.625)));
            assert_eq!(payment.lender_share, money(dec!(895.885)));
            assert_eq!(payment.status, PaymentStatus::Pending);
        }

        // the last installment absorbs the rounding residue
        let last = &schedule.payments[5];
        assert_eq!(last.amount, money(dec!(896.48125)));
        assert_eq!(last.platform_fee_share, money(dec!(0.625)));
        assert_eq!(last.lender_share, money(dec!(895.85625)));

        let total: Money = schedule
            .payments
            .iter()
            .fold(Money::ZERO, |sum, p| sum + p.amount);
        assert_eq!(total, schedule.grand_total());
    }

    #[test]
    fn test_due_dates_advance_by_calendar_month() {
        let schedule = InstallmentSchedule::generate(
            Uuid::new_v4(),
            Money::from_major(5_000),
            Rate::from_percentage(dec!(15)),
            6,
            money(dec!(3.75)),
            funded_at(2024, 1, 15),
        )
        .unwrap();

        let expected = [
            NaiveDate::from_ymd_opt(2024, 2, 15).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
            NaiveDate::from_ymd_opt(2024, 4, 15).unwrap(),
            NaiveDate::from_ymd_opt(2024, 5, 15).unwrap(),
            NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(),
            NaiveDate::from_ymd_opt(2024, 7, 15).unwrap(),
        ];
        for (payment, want) in schedule.payments.iter().zip(expected) {
            assert_eq!(payment.due_date, want);
        }
    }

    #[test]
    fn test_due_dates_clamp_to_month_end() {
        let schedule = InstallmentSchedule::generate(
            Uuid::new_v4(),
            Money::from_major(1_000),
            Rate::from_percentage(dec!(12)),
            4,
            Money::ZERO,
            funded_at(2024, 1, 31),
        )
        .unwrap();

        let expected = [
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap(), // leap year
            NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
            NaiveDate::from_ymd_opt(2024, 4, 30).unwrap(),
            NaiveDate::from_ymd_opt(2024, 5, 31).unwrap(),
        ];
        for (payment, want) in schedule.payments.iter().zip(expected) {
            assert_eq!(payment.due_date, want);
        }
    }

    #[test]
    fn test_fee_shares_reconcile_when_period_does_not_divide() {
        // 3.75 / 7 is a repeating decimal; the shares must still sum
        // to exactly 3.75
        let schedule = InstallmentSchedule::generate(
            Uuid::new_v4(),
            Money::from_major(5_000),
            Rate::from_percentage(dec!(15)),
            7,
            money(dec!(3.75)),
            funded_at(2024, 3, 1),
        )
        .unwrap();

        for payment in &schedule.payments[..6] {
            assert_eq!(payment.platform_fee_share, money(dec!(0.53571429)));
        }
        assert_eq!(
            schedule.payments[6].platform_fee_share,
            money(dec!(0.53571426))
        );

        let fee_total: Money = schedule
            .payments
            .iter()
            .fold(Money::ZERO, |sum, p| sum + p.platform_fee_share);
        assert_eq!(fee_total, money(dec!(3.75)));

        let amount_total: Money = schedule
            .payments
            .iter()
            .fold(Money::ZERO, |sum, p| sum + p.amount);
        assert_eq!(amount_total, schedule.grand_total());

        // every installment splits cleanly between lender and platform
        for payment in &schedule.payments {
            assert_eq!(
                payment.lender_share + payment.platform_fee_share,
                payment.amount
            );
        }
    }

    #[test]
    fn test_installment_rounds_half_up() {
        // 400.50 / 4 = 100.125: half-up gives 100.13 where banker's
        // rounding would give 100.12
        let schedule = InstallmentSchedule::generate(
            Uuid::new_v4(),
            money(dec!(400.50)),
            Rate::ZERO,
            4,
            Money::ZERO,
            funded_at(2024, 6, 1),
        )
        .unwrap();

        assert_eq!(schedule.installment, money(dec!(100.13)));
        assert_eq!(schedule.payments[3].amount, money(dec!(100.11)));

        let total: Money = schedule
            .payments
            .iter()
            .fold(Money::ZERO, |sum, p| sum + p.amount);
        assert_eq!(total, money(dec!(400.50)));
    }

    #[test]
    fn test_zero_rate_schedule() {
        let schedule = InstallmentSchedule::generate(
            Uuid::new_v4(),
            Money::from_major(100),
            Rate::ZERO,
            4,
            Money::ZERO,
            funded_at(2024, 6, 1),
        )
        .unwrap();

        assert_eq!(schedule.total_interest, Money::ZERO);
        assert_eq!(schedule.installment, Money::from_major(25));
        for payment in &schedule.payments {
            assert_eq!(payment.amount, Money::from_major(25));
            assert_eq!(payment.platform_fee_share, Money::ZERO);
            assert_eq!(payment.lender_share, Money::from_major(25));
        }
    }

    #[test]
    fn test_single_installment_carries_everything() {
        let schedule = InstallmentSchedule::generate(
            Uuid::new_v4(),
            Money::from_major(1_200),
            Rate::from_percentage(dec!(12)),
            1,
            money(dec!(3.75)),
            funded_at(2024, 6, 1),
        )
        .unwrap();

        assert_eq!(schedule.payments.len(), 1);
        let only = &schedule.payments[0];
        // 1203.75 + 1203.75 * 0.01
        assert_eq!(only.amount, money(dec!(1215.7875)));
        assert_eq!(only.platform_fee_share, money(dec!(3.75)));
        assert_eq!(only.amount, schedule.grand_total());
    }

    #[test]
    fn test_zero_period_rejected() {
        let result = InstallmentSchedule::generate(
            Uuid::new_v4(),
            Money::from_major(100),
            Rate::ZERO,
            0,
            Money::ZERO,
            funded_at(2024, 6, 1),
        );
        assert!(matches!(
            result,
            Err(LendingError::InvalidPeriod { months: 0 })
        ));
    }
}
