use crate::core::loan::LoanId;
use crate::core::user::UserId;
use crate::store::StoreError;
use rust_decimal::Decimal;
use thiserror::Error;

/// Result type for billing operations.
pub type BillingResult<T> = Result<T, BillingError>;

/// Errors surfaced by the billing core.
///
/// Lookup misses and storage failures come from the ledger store; everything
/// else is a deterministic rejection of the request.
#[derive(Debug, Error)]
pub enum BillingError {
    #[error("user {0} not found")]
    UserNotFound(UserId),

    #[error("loan {0} not found")]
    LoanNotFound(LoanId),

    #[error("user {0} is delinquent")]
    UserDelinquent(UserId),

    #[error("loan {loan} belongs to user {owner}, not user {user}")]
    LoanUserMismatch {
        loan: LoanId,
        owner: UserId,
        user: UserId,
    },

    #[error("loan {0} has been paid")]
    LoanAlreadyPaid(LoanId),

    #[error("amount is not equal to the bill amount. Expected: {expected:.2}, Actual: {actual:.2}")]
    AmountMismatch { expected: Decimal, actual: Decimal },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("ledger store error: {0}")]
    Storage(StoreError),
}

impl BillingError {
    /// Whether this is a validation rejection of a payment, as opposed to a
    /// failed lookup or storage access.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::LoanUserMismatch { .. }
                | Self::LoanAlreadyPaid(_)
                | Self::AmountMismatch { .. }
                | Self::InvalidRequest(_)
        )
    }
}

impl From<StoreError> for BillingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UserNotFound(id) => Self::UserNotFound(id),
            StoreError::LoanNotFound(id) => Self::LoanNotFound(id),
            other => Self::Storage(other),
        }
    }
}
