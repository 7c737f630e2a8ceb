//! The ledger store contract.
//!
//! The billing core reads and writes loans and users only through
//! [`LedgerStore`]. Updates are guarded by the `version` field of the record
//! being written: a store must reject a write whose version no longer matches
//! the stored one, so two requests that read the same record cannot silently
//! overwrite each other.

pub mod memory;
pub mod snapshot;

#[cfg(test)]
pub(crate) mod faulty;

use crate::core::loan::{Loan, LoanId, NewLoan};
use crate::core::user::{NewUser, User, UserId};
use std::path::PathBuf;
use thiserror::Error;

pub use memory::InMemoryLedgerStore;

/// Result type for ledger store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Failures reported by a ledger store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("user {0} not found")]
    UserNotFound(UserId),
    #[error("loan {0} not found")]
    LoanNotFound(LoanId),
    #[error("{entity} {id} was modified concurrently (expected version {expected}, found {found})")]
    Conflict {
        entity: &'static str,
        id: u64,
        expected: u64,
        found: u64,
    },
    #[error("ledger store is unavailable: {0}")]
    Unavailable(String),
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed ledger snapshot: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Durable storage for loans and users.
pub trait LedgerStore: Send + Sync {
    fn get_user(&self, id: UserId) -> StoreResult<User>;

    fn get_loan(&self, id: LoanId) -> StoreResult<Loan>;

    fn list_loans(&self) -> StoreResult<Vec<Loan>>;

    fn list_users(&self) -> StoreResult<Vec<User>>;

    /// Loans of `user_id` whose outstanding balance is above zero.
    fn active_loans_by_user(&self, user_id: UserId) -> StoreResult<Vec<Loan>>;

    /// Persist a new loan. The store assigns the id, and the timestamps when
    /// the loan does not carry a creation time.
    fn insert_loan(&self, loan: NewLoan) -> StoreResult<Loan>;

    fn insert_user(&self, user: NewUser) -> StoreResult<User>;

    /// Persist `outstanding` and `update_time`. Returns the stored record with
    /// its bumped version.
    fn update_loan(&self, loan: &Loan) -> StoreResult<Loan>;

    /// Persist the delinquent flag. Returns the stored record with its bumped
    /// version.
    fn update_user(&self, user: &User) -> StoreResult<User>;
}
