use crate::billing::calculator::BillingCalculator;
use crate::billing::delinquency::DelinquencyTracker;
use crate::core::clock::{Clock, SystemClock};
use crate::core::config::BillingConfig;
use crate::core::error::{BillingError, BillingResult};
use crate::core::loan::{Loan, LoanId};
use crate::core::user::{NewUser, User, UserId};
use crate::service::locks::KeyedLocks;
use crate::service::origination::{LoanOrigination, LoanRequest};
use crate::service::payment::{PaymentProcessor, PaymentReceipt, PaymentRequest};
use crate::store::LedgerStore;
use chrono::NaiveDate;
use log::warn;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, PoisonError};

/// Result of a payment attempt as reported to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentOutcome {
    pub loan_id: LoanId,
    pub accepted: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt: Option<PaymentReceipt>,
}

impl PaymentOutcome {
    fn accepted(receipt: PaymentReceipt) -> Self {
        Self {
            loan_id: receipt.loan_id,
            accepted: true,
            message: "success to make a payment".into(),
            receipt: Some(receipt),
        }
    }

    fn rejected(loan_id: LoanId, err: &BillingError) -> Self {
        Self {
            loan_id,
            accepted: false,
            message: err.to_string(),
            receipt: None,
        }
    }
}

impl fmt::Display for PaymentOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.accepted { "ACCEPTED" } else { "REJECTED" };
        writeln!(f, "=== Payment on loan {} ===", self.loan_id)?;
        writeln!(f, "Status:      {}", status)?;
        writeln!(f, "Message:     {}", self.message)?;
        if let Some(receipt) = &self.receipt {
            writeln!(f, "Paid:        {}", receipt.amount_paid)?;
            writeln!(f, "Principal:   {:.2}", receipt.principal_applied)?;
            writeln!(f, "Outstanding: {:.2}", receipt.outstanding)?;
            writeln!(f, "Late:        {}", receipt.was_late)?;
            if receipt.settled {
                writeln!(f, "Loan fully paid.")?;
            }
        }
        Ok(())
    }
}

/// The next installment of a loan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NextPayment {
    pub loan_id: LoanId,
    /// Serialized as `YYYY-MM-DD`.
    pub due_date: NaiveDate,
    pub amount_due: Decimal,
    pub is_late: bool,
}

impl fmt::Display for NextPayment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Next payment on loan {} ===", self.loan_id)?;
        writeln!(f, "Due date:   {}", self.due_date.format("%Y-%m-%d"))?;
        writeln!(f, "Amount due: {}", self.amount_due)?;
        writeln!(f, "Late:       {}", self.is_late)
    }
}

/// The caller-facing billing engine.
///
/// Every operation that may write takes the borrower's lock and then the
/// loan's lock for its whole read-modify-write, so concurrent requests for
/// the same borrower are applied one after another. The store's version
/// checks catch writers that bypass the engine.
///
/// # Examples
///
/// ```
/// use billing_engine::core::config::BillingConfig;
/// use billing_engine::service::engine::BillingEngine;
/// use billing_engine::service::payment::PaymentRequest;
/// use billing_engine::store::InMemoryLedgerStore;
/// use rust_decimal_macros::dec;
/// use std::sync::Arc;
///
/// let engine = BillingEngine::new(Arc::new(InMemoryLedgerStore::new()), BillingConfig::default());
/// let user = engine.create_user("alice").unwrap();
/// let loan = engine.create_loan(user.id, dec!(1000), 10).unwrap();
/// assert_eq!(loan.bill_amount, dec!(110));
///
/// let outcome = engine
///     .make_payment(PaymentRequest::new(loan.id, user.id, dec!(110)))
///     .unwrap();
/// assert!(outcome.accepted);
/// assert_eq!(engine.outstanding(loan.id).unwrap(), dec!(900));
/// ```
pub struct BillingEngine {
    store: Arc<dyn LedgerStore>,
    clock: Arc<dyn Clock>,
    calculator: BillingCalculator,
    user_locks: KeyedLocks<UserId>,
    loan_locks: KeyedLocks<LoanId>,
}

impl BillingEngine {
    pub fn new(store: Arc<dyn LedgerStore>, config: BillingConfig) -> Self {
        Self::with_clock(store, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        store: Arc<dyn LedgerStore>,
        config: BillingConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            clock,
            calculator: BillingCalculator::new(config),
            user_locks: KeyedLocks::new(),
            loan_locks: KeyedLocks::new(),
        }
    }

    pub fn config(&self) -> &BillingConfig {
        self.calculator.config()
    }

    pub fn store(&self) -> &Arc<dyn LedgerStore> {
        &self.store
    }

    /// Register a borrower.
    pub fn create_user(&self, name: &str) -> BillingResult<User> {
        let name = name.trim();
        if name.is_empty() {
            return Err(BillingError::InvalidRequest("name is required".into()));
        }
        Ok(self.store.insert_user(NewUser::new(name))?)
    }

    /// Open a loan of `amount` repaid over `term` weekly installments.
    pub fn create_loan(&self, user_id: UserId, amount: Decimal, term: u32) -> BillingResult<Loan> {
        let user_slot = self.user_locks.slot(&user_id);
        let _user_guard = user_slot.lock().unwrap_or_else(PoisonError::into_inner);

        LoanOrigination::new(self.store.as_ref(), &self.calculator, self.clock.as_ref())
            .create_loan(&LoanRequest::new(user_id, amount, term))
    }

    /// Submit a payment.
    ///
    /// Rejections of the payment itself (wrong borrower, loan already paid,
    /// wrong amount, malformed request) come back as a not-accepted outcome;
    /// lookup misses and storage failures are returned as errors.
    pub fn make_payment(&self, request: PaymentRequest) -> BillingResult<PaymentOutcome> {
        let user_slot = self.user_locks.slot(&request.user_id);
        let _user_guard = user_slot.lock().unwrap_or_else(PoisonError::into_inner);
        let loan_slot = self.loan_locks.slot(&request.loan_id);
        let _loan_guard = loan_slot.lock().unwrap_or_else(PoisonError::into_inner);

        let processor =
            PaymentProcessor::new(self.store.as_ref(), &self.calculator, self.clock.as_ref());
        match processor.process(&request) {
            Ok(receipt) => Ok(PaymentOutcome::accepted(receipt)),
            Err(err) if err.is_rejection() => {
                warn!("payment on loan {} rejected: {}", request.loan_id, err);
                Ok(PaymentOutcome::rejected(request.loan_id, &err))
            }
            Err(err) => Err(err),
        }
    }

    /// Due date and amount of the next installment.
    ///
    /// When the loan is overdue this also flags its borrower delinquent (best
    /// effort). A fully paid loan owes nothing and never flags anyone.
    pub fn next_payment_info(&self, loan_id: LoanId) -> BillingResult<NextPayment> {
        let owner = self.store.get_loan(loan_id)?.user_id;
        let user_slot = self.user_locks.slot(&owner);
        let _user_guard = user_slot.lock().unwrap_or_else(PoisonError::into_inner);
        let loan_slot = self.loan_locks.slot(&loan_id);
        let _loan_guard = loan_slot.lock().unwrap_or_else(PoisonError::into_inner);

        let loan = self.store.get_loan(loan_id)?;
        let config = self.calculator.config();
        if loan.is_paid() {
            return Ok(NextPayment {
                loan_id,
                due_date: self
                    .calculator
                    .next_due_date(loan.create_time, loan.amount, loan.outstanding),
                amount_due: Decimal::ZERO,
                is_late: false,
            });
        }

        let quote = DelinquencyTracker::new(self.store.as_ref(), &self.calculator)
            .evaluate_lateness(&loan, self.clock.now());
        Ok(NextPayment {
            loan_id,
            due_date: quote.due_date,
            amount_due: config.round_money(quote.amount_due),
            is_late: quote.is_late,
        })
    }

    pub fn get_user(&self, user_id: UserId) -> BillingResult<User> {
        Ok(self.store.get_user(user_id)?)
    }

    pub fn get_loan(&self, loan_id: LoanId) -> BillingResult<Loan> {
        Ok(self.store.get_loan(loan_id)?)
    }

    pub fn list_loans(&self) -> BillingResult<Vec<Loan>> {
        Ok(self.store.list_loans()?)
    }

    pub fn list_users(&self) -> BillingResult<Vec<User>> {
        Ok(self.store.list_users()?)
    }

    /// Loans of `user_id` that still carry a balance.
    pub fn active_loans(&self, user_id: UserId) -> BillingResult<Vec<Loan>> {
        Ok(self.store.active_loans_by_user(user_id)?)
    }

    pub fn outstanding(&self, loan_id: LoanId) -> BillingResult<Decimal> {
        Ok(self.store.get_loan(loan_id)?.outstanding)
    }

    pub fn is_delinquent(&self, user_id: UserId) -> BillingResult<bool> {
        Ok(self.store.get_user(user_id)?.is_delinquent)
    }
}
