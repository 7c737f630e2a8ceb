use crate::billing::calculator::BillingCalculator;
use crate::billing::delinquency::DelinquencyTracker;
use crate::core::clock::Clock;
use crate::core::dates::{day_of, format_date, parse_date, start_of_day};
use crate::core::error::{BillingError, BillingResult};
use crate::core::loan::LoanId;
use crate::core::user::UserId;
use crate::store::LedgerStore;
use chrono::{DateTime, NaiveDate, Utc};
use log::{debug, info};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An installment payment submitted by a borrower.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub loan_id: LoanId,
    pub user_id: UserId,
    pub amount: Decimal,
    /// Overrides the payment date (backdated payments). Defaults to today.
    #[serde(default)]
    pub payment_date: Option<NaiveDate>,
}

impl PaymentRequest {
    pub fn new(loan_id: LoanId, user_id: UserId, amount: Decimal) -> Self {
        Self {
            loan_id,
            user_id,
            amount,
            payment_date: None,
        }
    }

    pub fn on(mut self, date: NaiveDate) -> Self {
        self.payment_date = Some(date);
        self
    }

    pub fn validate(&self) -> BillingResult<()> {
        if self.amount <= Decimal::ZERO {
            return Err(BillingError::InvalidRequest(format!(
                "amount must be positive, got {}",
                self.amount
            )));
        }
        Ok(())
    }
}

/// Parse an optional `YYYY-MM-DD` payment date supplied by a caller.
pub fn parse_payment_date(raw: Option<&str>) -> BillingResult<Option<NaiveDate>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => parse_date(s)
            .map(Some)
            .map_err(|_| BillingError::InvalidRequest(format!("payment date is invalid: {s}"))),
    }
}

/// What an accepted payment did to the loan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub loan_id: LoanId,
    pub user_id: UserId,
    pub amount_paid: Decimal,
    /// Part of the payment applied to the principal balance.
    pub principal_applied: Decimal,
    pub outstanding: Decimal,
    pub paid_at: DateTime<Utc>,
    /// Whether the payment arrived after the grace period.
    pub was_late: bool,
    /// Whether this payment brought the balance to zero.
    pub settled: bool,
    /// Whether the borrower's delinquent flag was lowered by this payment.
    pub delinquency_cleared: bool,
}

/// Validates payments against the bill and applies them to loans.
pub struct PaymentProcessor<'a> {
    store: &'a dyn LedgerStore,
    calculator: &'a BillingCalculator,
    clock: &'a dyn Clock,
}

impl<'a> PaymentProcessor<'a> {
    pub fn new(
        store: &'a dyn LedgerStore,
        calculator: &'a BillingCalculator,
        clock: &'a dyn Clock,
    ) -> Self {
        Self {
            store,
            calculator,
            clock,
        }
    }

    /// Run one payment attempt to a terminal outcome.
    ///
    /// A late payment flags the borrower delinquent before the amount is
    /// checked, and that flag stays set even if the amount is then rejected.
    /// The delinquency re-check runs only after the new balance is stored.
    pub fn process(&self, request: &PaymentRequest) -> BillingResult<PaymentReceipt> {
        request.validate()?;

        let user = self.store.get_user(request.user_id)?;
        let mut loan = self.store.get_loan(request.loan_id)?;

        if loan.user_id != user.id {
            return Err(BillingError::LoanUserMismatch {
                loan: loan.id,
                owner: loan.user_id,
                user: user.id,
            });
        }
        if loan.is_paid() {
            return Err(BillingError::LoanAlreadyPaid(loan.id));
        }

        let paid_at = match request.payment_date {
            Some(date) => start_of_day(date),
            None => self.clock.now(),
        };
        if day_of(paid_at) < day_of(loan.update_time) {
            return Err(BillingError::InvalidRequest(format!(
                "payment date {} precedes the last payment on {}",
                format_date(day_of(paid_at)),
                format_date(day_of(loan.update_time))
            )));
        }

        let quote = self.calculator.payment_quote(&loan, day_of(paid_at));
        let tracker = DelinquencyTracker::new(self.store, self.calculator);
        if quote.is_late {
            debug!(
                "payment on loan {} is {} days after the last one",
                loan.id, quote.days_late
            );
            tracker.mark_delinquent(user.id)?;
        }

        let config = self.calculator.config();
        let amount_paid = config.round_money(request.amount);
        if !config.same_money(quote.amount_due, amount_paid) {
            return Err(BillingError::AmountMismatch {
                expected: config.round_money(quote.amount_due),
                actual: request.amount,
            });
        }

        // Principal comes from the unrounded quote the payment matched.
        let principal = self.calculator.principal_portion(quote.amount_due);
        let remaining = (loan.outstanding - principal).max(Decimal::ZERO);
        loan.outstanding = if config.round_money(remaining).is_zero() {
            Decimal::ZERO
        } else {
            remaining
        };
        loan.update_time = paid_at.max(loan.update_time);
        let loan = self.store.update_loan(&loan)?;
        info!(
            "loan {} paid {} (principal {}), outstanding now {}",
            loan.id,
            amount_paid,
            config.round_money(principal),
            config.round_money(loan.outstanding)
        );

        let settled = loan.is_paid();
        let delinquency_cleared = if quote.is_late || (settled && user.is_delinquent) {
            tracker.clear_if_settled(user.id)?
        } else {
            false
        };

        Ok(PaymentReceipt {
            loan_id: loan.id,
            user_id: user.id,
            amount_paid,
            principal_applied: principal,
            outstanding: loan.outstanding,
            paid_at,
            was_late: quote.is_late,
            settled,
            delinquency_cleared,
        })
    }
}
