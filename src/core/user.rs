use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a borrower in the ledger.
///
/// Identifiers are assigned by the ledger store on insert.
///
/// # Examples
///
/// ```
/// use billing_engine::core::user::UserId;
///
/// let alice = UserId::new(1);
/// let bob = UserId::new(2);
/// assert_ne!(alice, bob);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(u64);

impl UserId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw numeric value of this identifier.
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for UserId {
    fn from(id: u64) -> Self {
        Self::new(id)
    }
}

/// A borrower record.
///
/// The delinquent flag is owned by the delinquency tracker: it is raised when
/// a late installment is observed and lowered only once every loan of the
/// user has been paid off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub is_delinquent: bool,
    /// Optimistic-concurrency counter, bumped by the store on every update.
    #[serde(default)]
    pub version: u64,
}

impl User {
    /// Flip the delinquent flag, returning `true` if the value changed.
    pub fn set_delinquent(&mut self, delinquent: bool) -> bool {
        let changed = self.is_delinquent != delinquent;
        self.is_delinquent = delinquent;
        changed
    }
}

/// Input for registering a new borrower.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub name: String,
    #[serde(default)]
    pub is_delinquent: bool,
}

impl NewUser {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_delinquent: false,
        }
    }
}
