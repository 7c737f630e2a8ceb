use crate::core::loan::{Loan, LoanId, NewLoan};
use crate::core::user::{NewUser, User, UserId};
use crate::store::snapshot::LedgerSnapshot;
use crate::store::{LedgerStore, StoreError, StoreResult};
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
struct LedgerState {
    users: BTreeMap<UserId, User>,
    loans: BTreeMap<LoanId, Loan>,
    next_user_id: u64,
    next_loan_id: u64,
}

/// A ledger store held entirely in memory.
///
/// Used by tests, simulations and the CLI (which round-trips it through a
/// [`LedgerSnapshot`] file). Version checks on update behave like a
/// `WHERE version = ?` clause in a SQL store.
///
/// # Examples
///
/// ```
/// use billing_engine::core::user::NewUser;
/// use billing_engine::store::{InMemoryLedgerStore, LedgerStore};
///
/// let store = InMemoryLedgerStore::new();
/// let user = store.insert_user(NewUser::new("alice")).unwrap();
/// assert_eq!(store.get_user(user.id).unwrap().name, "alice");
/// ```
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    state: RwLock<LedgerState>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from a snapshot. Id counters resume after the highest
    /// id present.
    pub fn from_snapshot(snapshot: LedgerSnapshot) -> Self {
        let next_user_id = snapshot.users.iter().map(|u| u.id.get()).max().unwrap_or(0);
        let next_loan_id = snapshot.loans.iter().map(|l| l.id.get()).max().unwrap_or(0);
        let state = LedgerState {
            users: snapshot.users.into_iter().map(|u| (u.id, u)).collect(),
            loans: snapshot.loans.into_iter().map(|l| (l.id, l)).collect(),
            next_user_id,
            next_loan_id,
        };
        Self {
            state: RwLock::new(state),
        }
    }

    /// Copy the full contents of the store.
    pub fn snapshot(&self) -> StoreResult<LedgerSnapshot> {
        let state = self.read()?;
        Ok(LedgerSnapshot {
            users: state.users.values().cloned().collect(),
            loans: state.loans.values().cloned().collect(),
        })
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, LedgerState>> {
        self.state
            .read()
            .map_err(|_| StoreError::Unavailable("ledger state lock poisoned".into()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, LedgerState>> {
        self.state
            .write()
            .map_err(|_| StoreError::Unavailable("ledger state lock poisoned".into()))
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn get_user(&self, id: UserId) -> StoreResult<User> {
        self.read()?
            .users
            .get(&id)
            .cloned()
            .ok_or(StoreError::UserNotFound(id))
    }

    fn get_loan(&self, id: LoanId) -> StoreResult<Loan> {
        self.read()?
            .loans
            .get(&id)
            .cloned()
            .ok_or(StoreError::LoanNotFound(id))
    }

    fn list_loans(&self) -> StoreResult<Vec<Loan>> {
        Ok(self.read()?.loans.values().cloned().collect())
    }

    fn list_users(&self) -> StoreResult<Vec<User>> {
        Ok(self.read()?.users.values().cloned().collect())
    }

    fn active_loans_by_user(&self, user_id: UserId) -> StoreResult<Vec<Loan>> {
        Ok(self
            .read()?
            .loans
            .values()
            .filter(|l| l.user_id == user_id && l.outstanding > Decimal::ZERO)
            .cloned()
            .collect())
    }

    fn insert_loan(&self, loan: NewLoan) -> StoreResult<Loan> {
        let mut state = self.write()?;
        state.next_loan_id += 1;
        let loan = loan.into_loan(LoanId::new(state.next_loan_id), Utc::now());
        state.loans.insert(loan.id, loan.clone());
        Ok(loan)
    }

    fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        let mut state = self.write()?;
        state.next_user_id += 1;
        let user = User {
            id: UserId::new(state.next_user_id),
            name: user.name,
            is_delinquent: user.is_delinquent,
            version: 0,
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    fn update_loan(&self, loan: &Loan) -> StoreResult<Loan> {
        let mut state = self.write()?;
        let stored = state
            .loans
            .get_mut(&loan.id)
            .ok_or(StoreError::LoanNotFound(loan.id))?;
        if stored.version != loan.version {
            return Err(StoreError::Conflict {
                entity: "loan",
                id: loan.id.get(),
                expected: loan.version,
                found: stored.version,
            });
        }
        stored.outstanding = loan.outstanding;
        stored.update_time = loan.update_time;
        stored.version += 1;
        Ok(stored.clone())
    }

    fn update_user(&self, user: &User) -> StoreResult<User> {
        let mut state = self.write()?;
        let stored = state
            .users
            .get_mut(&user.id)
            .ok_or(StoreError::UserNotFound(user.id))?;
        if stored.version != user.version {
            return Err(StoreError::Conflict {
                entity: "user",
                id: user.id.get(),
                expected: user.version,
                found: stored.version,
            });
        }
        stored.is_delinquent = user.is_delinquent;
        stored.version += 1;
        Ok(stored.clone())
    }
}
