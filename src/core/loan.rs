use crate::core::user::UserId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a loan, assigned by the ledger store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LoanId(u64);

impl LoanId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for LoanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for LoanId {
    fn from(id: u64) -> Self {
        Self::new(id)
    }
}

/// An installment loan.
///
/// The borrower repays `bill_amount` once per week for `term` weeks. The
/// bill includes the interest markup, while `outstanding` is denominated in
/// principal: each accepted payment is stripped of the markup before being
/// subtracted.
///
/// A loan with `outstanding == 0` is fully paid and accepts no further
/// payments.
///
/// # Examples
///
/// ```
/// use billing_engine::core::loan::{Loan, LoanId};
/// use billing_engine::core::user::UserId;
/// use chrono::Utc;
/// use rust_decimal_macros::dec;
///
/// let loan = Loan {
///     id: LoanId::new(1),
///     user_id: UserId::new(1),
///     amount: dec!(1000),
///     term: 10,
///     bill_amount: dec!(110),
///     outstanding: dec!(1000),
///     create_time: Utc::now(),
///     update_time: Utc::now(),
///     version: 0,
/// };
///
/// assert!(!loan.is_paid());
/// assert_eq!(loan.principal_paid(), dec!(0));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    pub id: LoanId,
    /// The borrower that owns this loan.
    pub user_id: UserId,
    /// Principal amount lent.
    pub amount: Decimal,
    /// Number of weekly installments.
    pub term: u32,
    /// Per-installment amount, fixed at origination.
    pub bill_amount: Decimal,
    /// Remaining principal-equivalent balance.
    pub outstanding: Decimal,
    pub create_time: DateTime<Utc>,
    /// Date of the last accepted payment, or `create_time` if never paid.
    pub update_time: DateTime<Utc>,
    /// Optimistic-concurrency counter, bumped by the store on every update.
    #[serde(default)]
    pub version: u64,
}

impl Loan {
    /// Whether the loan has reached its terminal, fully paid state.
    pub fn is_paid(&self) -> bool {
        self.outstanding <= Decimal::ZERO
    }

    /// Whether the loan still has a balance to repay.
    pub fn is_active(&self) -> bool {
        !self.is_paid()
    }

    /// Principal repaid so far.
    pub fn principal_paid(&self) -> Decimal {
        self.amount - self.outstanding
    }
}

/// A loan ready to be inserted into the ledger store.
///
/// The store assigns the identifier, and fills in the timestamps when
/// `create_time` is absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLoan {
    pub user_id: UserId,
    pub amount: Decimal,
    pub term: u32,
    pub bill_amount: Decimal,
    pub outstanding: Decimal,
    #[serde(default)]
    pub create_time: Option<DateTime<Utc>>,
}

impl NewLoan {
    /// Materialize the stored record once the store has picked an id.
    pub fn into_loan(self, id: LoanId, now: DateTime<Utc>) -> Loan {
        let created = self.create_time.unwrap_or(now);
        Loan {
            id,
            user_id: self.user_id,
            amount: self.amount,
            term: self.term,
            bill_amount: self.bill_amount,
            outstanding: self.outstanding,
            create_time: created,
            update_time: created,
            version: 0,
        }
    }
}
