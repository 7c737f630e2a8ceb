//! # billing-engine
//!
//! Installment loan billing, delinquency tracking and payment processing.
//!
//! Loans are repaid in weekly installments that carry a flat interest markup.
//! The engine computes each bill, charges overdue borrowers for the weeks they
//! missed, flags them delinquent while any installment is overdue, and clears
//! the flag once all their loans are paid off.
//!
//! ## Architecture
//!
//! - **core**: foundational types (loans, users, configuration, dates, errors)
//! - **billing**: Bill arithmetic and the delinquency tracker
//! - **service**: Loan origination, payment processing and the engine facade
//! - **store**: The ledger store contract, an in-memory store, JSON snapshots
//! - **simulation**: Random portfolios and repayment schedules for stress tests

pub mod billing;
pub mod core;
pub mod service;
pub mod store;

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::billing::calculator::{BillQuote, BillingCalculator};
    pub use crate::core::config::BillingConfig;
    pub use crate::core::error::{BillingError, BillingResult};
    pub use crate::core::loan::{Loan, LoanId};
    pub use crate::core::user::{User, UserId};
    pub use crate::service::engine::{BillingEngine, NextPayment, PaymentOutcome};
    pub use crate::service::payment::PaymentRequest;
    pub use crate::store::{InMemoryLedgerStore, LedgerStore, StoreError};
}
