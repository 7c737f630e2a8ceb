use crate::core::loan::{Loan, LoanId, NewLoan};
use crate::core::user::{NewUser, User, UserId};
use crate::store::{InMemoryLedgerStore, LedgerStore, StoreError, StoreResult};
use std::sync::atomic::{AtomicBool, Ordering};

/// An in-memory store whose writes can be switched to fail.
#[derive(Debug, Default)]
pub(crate) struct FaultyStore {
    pub inner: InMemoryLedgerStore,
    pub fail_user_updates: AtomicBool,
    pub fail_loan_updates: AtomicBool,
    pub fail_active_lookups: AtomicBool,
}

impl FaultyStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn check(flag: &AtomicBool, what: &str) -> StoreResult<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!("{what} disabled")));
        }
        Ok(())
    }
}

impl LedgerStore for FaultyStore {
    fn get_user(&self, id: UserId) -> StoreResult<User> {
        self.inner.get_user(id)
    }

    fn get_loan(&self, id: LoanId) -> StoreResult<Loan> {
        self.inner.get_loan(id)
    }

    fn list_loans(&self) -> StoreResult<Vec<Loan>> {
        self.inner.list_loans()
    }

    fn list_users(&self) -> StoreResult<Vec<User>> {
        self.inner.list_users()
    }

    fn active_loans_by_user(&self, user_id: UserId) -> StoreResult<Vec<Loan>> {
        Self::check(&self.fail_active_lookups, "active loan lookup")?;
        self.inner.active_loans_by_user(user_id)
    }

    fn insert_loan(&self, loan: NewLoan) -> StoreResult<Loan> {
        self.inner.insert_loan(loan)
    }

    fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        self.inner.insert_user(user)
    }

    fn update_loan(&self, loan: &Loan) -> StoreResult<Loan> {
        Self::check(&self.fail_loan_updates, "loan update")?;
        self.inner.update_loan(loan)
    }

    fn update_user(&self, user: &User) -> StoreResult<User> {
        Self::check(&self.fail_user_updates, "user update")?;
        self.inner.update_user(user)
    }
}
