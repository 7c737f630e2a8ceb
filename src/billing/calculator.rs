use crate::core::config::BillingConfig;
use crate::core::dates::{day_of, days_between};
use crate::core::loan::Loan;
use chrono::{DateTime, Days, NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The amount a borrower owes on a given day, and whether it is overdue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillQuote {
    pub due_date: NaiveDate,
    pub amount_due: Decimal,
    pub is_late: bool,
    /// Whole days past the reference date (negative before it).
    pub days_late: i64,
}

/// Pure bill arithmetic.
///
/// Nothing here reads the clock or touches storage: every function takes the
/// dates it compares. All date arithmetic is done on whole UTC days.
///
/// # Examples
///
/// ```
/// use billing_engine::billing::calculator::BillingCalculator;
/// use billing_engine::core::config::BillingConfig;
/// use rust_decimal_macros::dec;
///
/// let calc = BillingCalculator::new(BillingConfig::default());
/// assert_eq!(calc.initial_bill(dec!(1000), 10), dec!(110));
/// assert_eq!(calc.late_penalty(dec!(110), dec!(1000), 2), dec!(220));
/// ```
#[derive(Debug, Clone, Default)]
pub struct BillingCalculator {
    config: BillingConfig,
}

impl BillingCalculator {
    pub fn new(config: BillingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BillingConfig {
        &self.config
    }

    /// Per-installment bill: `amount / term * (1 + rate)`.
    ///
    /// `term` must be non-zero; origination validates it before calling.
    pub fn initial_bill(&self, amount: Decimal, term: u32) -> Decimal {
        debug_assert!(term > 0, "term must be positive");
        amount / Decimal::from(term) * self.config.markup()
    }

    /// The next installment date.
    ///
    /// One interval per whole unit of principal already repaid, plus one,
    /// counted from the creation day. This ties the schedule to the amount
    /// repaid rather than to the number of installments made.
    pub fn next_due_date(
        &self,
        create_time: DateTime<Utc>,
        amount: Decimal,
        outstanding: Decimal,
    ) -> NaiveDate {
        let paid = (amount - outstanding).max(Decimal::ZERO);
        let periods = paid.trunc().to_u64().unwrap_or(u64::MAX).saturating_add(1);
        let interval = self.config.installment_interval_days.max(0) as u64;
        day_of(create_time)
            .checked_add_days(Days::new(periods.saturating_mul(interval)))
            .unwrap_or(NaiveDate::MAX)
    }

    /// Whether `current` is past `reference` by more than the grace period.
    pub fn is_late(&self, current: NaiveDate, reference: NaiveDate) -> bool {
        days_between(current, reference) > self.config.grace_period_days
    }

    /// Whole installment intervals contained in `days_late`.
    pub fn weeks_late(&self, days_late: i64) -> i64 {
        days_late.div_euclid(self.config.installment_interval_days.max(1))
    }

    /// Amount due for an overdue loan: one bill per week late, but never more
    /// than the remaining balance with its markup.
    pub fn late_penalty(
        &self,
        bill_amount: Decimal,
        outstanding: Decimal,
        weeks_late: i64,
    ) -> Decimal {
        let penalty = bill_amount * Decimal::from(weeks_late);
        if penalty > outstanding {
            outstanding * self.config.markup()
        } else {
            penalty
        }
    }

    /// Principal retired by a payment: the payment stripped of its markup.
    pub fn principal_portion(&self, payment: Decimal) -> Decimal {
        payment / self.config.markup()
    }

    /// Quote the next installment of `loan` as seen on `today`, measuring
    /// lateness from the scheduled due date.
    pub fn quote(&self, loan: &Loan, today: NaiveDate) -> BillQuote {
        let due_date = self.next_due_date(loan.create_time, loan.amount, loan.outstanding);
        self.quote_against(loan, today, due_date)
    }

    /// Quote a payment made on `payment_day`, measuring lateness from the
    /// loan's last accepted payment (or its creation).
    pub fn payment_quote(&self, loan: &Loan, payment_day: NaiveDate) -> BillQuote {
        let due_date = self.next_due_date(loan.create_time, loan.amount, loan.outstanding);
        let mut quote = self.quote_against(loan, payment_day, day_of(loan.update_time));
        quote.due_date = due_date;
        quote
    }

    fn quote_against(&self, loan: &Loan, today: NaiveDate, reference: NaiveDate) -> BillQuote {
        let days_late = days_between(today, reference);
        let is_late = self.is_late(today, reference);
        let amount_due = if is_late {
            // Late always means at least one bill, whatever the grace period.
            let weeks = self.weeks_late(days_late).max(1);
            self.late_penalty(loan.bill_amount, loan.outstanding, weeks)
        } else {
            loan.bill_amount.min(loan.outstanding * self.config.markup())
        };
        BillQuote {
            due_date: reference,
            amount_due,
            is_late,
            days_late,
        }
    }
}
