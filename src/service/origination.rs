use crate::billing::calculator::BillingCalculator;
use crate::core::clock::Clock;
use crate::core::error::{BillingError, BillingResult};
use crate::core::loan::{Loan, NewLoan};
use crate::core::user::UserId;
use crate::store::LedgerStore;
use log::{debug, info, warn};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A request to lend `amount` to a user over `term` weekly installments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanRequest {
    pub user_id: UserId,
    pub amount: Decimal,
    pub term: u32,
}

impl LoanRequest {
    pub fn new(user_id: UserId, amount: Decimal, term: u32) -> Self {
        Self {
            user_id,
            amount,
            term,
        }
    }

    pub fn validate(&self) -> BillingResult<()> {
        if self.amount <= Decimal::ZERO {
            return Err(BillingError::InvalidRequest(format!(
                "amount must be positive, got {}",
                self.amount
            )));
        }
        if self.term == 0 {
            return Err(BillingError::InvalidRequest("term is required".into()));
        }
        Ok(())
    }
}

/// Opens new loans for borrowers in good standing.
pub struct LoanOrigination<'a> {
    store: &'a dyn LedgerStore,
    calculator: &'a BillingCalculator,
    clock: &'a dyn Clock,
}

impl<'a> LoanOrigination<'a> {
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

    /// Create a loan. Delinquent borrowers are refused.
    pub fn create_loan(&self, request: &LoanRequest) -> BillingResult<Loan> {
        request.validate()?;

        let user = self.store.get_user(request.user_id)?;
        if user.is_delinquent {
            warn!("refusing loan for delinquent user {}", user.id);
            return Err(BillingError::UserDelinquent(user.id));
        }

        let bill_amount = self.calculator.initial_bill(request.amount, request.term);
        debug!(
            "bill for {} over {} weeks: {}",
            request.amount, request.term, bill_amount
        );

        let loan = self.store.insert_loan(NewLoan {
            user_id: user.id,
            amount: request.amount,
            term: request.term,
            bill_amount,
            outstanding: request.amount,
            create_time: Some(self.clock.now()),
        })?;
        info!(
            "loan {} opened for user {}: {} over {} weeks at {} per week",
            loan.id, loan.user_id, loan.amount, loan.term, loan.bill_amount
        );
        Ok(loan)
    }
}
