use crate::billing::calculator::{BillQuote, BillingCalculator};
use crate::core::dates::day_of;
use crate::core::error::BillingResult;
use crate::core::loan::Loan;
use crate::core::user::{User, UserId};
use crate::store::LedgerStore;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};

/// Raises and lowers the delinquent flag of borrowers.
///
/// A user becomes delinquent as soon as any of their loans is observed more
/// than the grace period overdue, and stays delinquent until none of their
/// loans has an outstanding balance.
pub struct DelinquencyTracker<'a> {
    store: &'a dyn LedgerStore,
    calculator: &'a BillingCalculator,
}

impl<'a> DelinquencyTracker<'a> {
    pub fn new(store: &'a dyn LedgerStore, calculator: &'a BillingCalculator) -> Self {
        Self { store, calculator }
    }

    /// Quote the next installment of `loan` as of `now`.
    ///
    /// If the loan is overdue the owner is marked delinquent. That write is
    /// best-effort: a failure is logged and the quote is still returned.
    pub fn evaluate_lateness(&self, loan: &Loan, now: DateTime<Utc>) -> BillQuote {
        let quote = self.calculator.quote(loan, day_of(now));
        debug!(
            "loan {} due {} amount {} late={} ({} days)",
            loan.id, quote.due_date, quote.amount_due, quote.is_late, quote.days_late
        );
        if quote.is_late {
            if let Err(e) = self.mark_delinquent(loan.user_id) {
                warn!(
                    "could not flag user {} delinquent for overdue loan {}: {}",
                    loan.user_id, loan.id, e
                );
            }
        }
        quote
    }

    /// Set the delinquent flag of `user_id`, writing through to the store.
    pub fn mark_delinquent(&self, user_id: UserId) -> BillingResult<User> {
        let mut user = self.store.get_user(user_id)?;
        if !user.set_delinquent(true) {
            return Ok(user);
        }
        let user = self.store.update_user(&user)?;
        info!("user {} marked delinquent", user_id);
        Ok(user)
    }

    /// Clear the delinquent flag of `user_id` if none of their loans has an
    /// outstanding balance left. Returns whether the user is now clear.
    pub fn clear_if_settled(&self, user_id: UserId) -> BillingResult<bool> {
        let active = self.store.active_loans_by_user(user_id)?;
        if !active.is_empty() {
            debug!(
                "user {} still has {} active loan(s); delinquent flag kept",
                user_id,
                active.len()
            );
            return Ok(false);
        }

        let mut user = self.store.get_user(user_id)?;
        if user.set_delinquent(false) {
            self.store.update_user(&user)?;
            info!("user {} settled all loans; delinquent flag cleared", user_id);
        }
        Ok(true)
    }
}
