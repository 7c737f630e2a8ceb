use billing_engine::core::clock::FixedClock;
use billing_engine::core::config::BillingConfig;
use billing_engine::core::error::BillingError;
use billing_engine::core::loan::LoanId;
use billing_engine::service::engine::BillingEngine;
use billing_engine::service::payment::PaymentRequest;
use billing_engine::store::snapshot::LedgerSnapshot;
use billing_engine::store::InMemoryLedgerStore;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tempfile::tempdir;

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

type Harness = (BillingEngine, Arc<FixedClock>, Arc<InMemoryLedgerStore>);

fn engine_with(config: BillingConfig) -> Harness {
    let clock = Arc::new(FixedClock::new(start()));
    let store = Arc::new(InMemoryLedgerStore::new());
    let engine = BillingEngine::with_clock(store.clone(), config, clock.clone());
    (engine, clock, store)
}

fn engine() -> Harness {
    engine_with(BillingConfig::default())
}

/// Full lifecycle: originate, pay every week on time, loan settles.
#[test]
fn loan_lifecycle_on_time() {
    let (engine, clock, _) = engine();
    let user = engine.create_user("alice").unwrap();
    let loan = engine.create_loan(user.id, dec!(1000), 10).unwrap();
    assert_eq!(loan.bill_amount, dec!(110.0));
    assert_eq!(loan.outstanding, dec!(1000));

    for week in 1..=10 {
        clock.advance_days(7);
        let next = engine.next_payment_info(loan.id).unwrap();
        assert!(!next.is_late, "week {week} should be on time");
        assert_eq!(next.amount_due, dec!(110));

        let outcome = engine
            .make_payment(PaymentRequest::new(loan.id, user.id, dec!(110)))
            .unwrap();
        assert!(outcome.accepted, "week {week}: {}", outcome.message);
        assert_eq!(
            engine.outstanding(loan.id).unwrap(),
            dec!(1000) - Decimal::from(week * 100)
        );
    }

    assert!(engine.active_loans(user.id).unwrap().is_empty());

    let outcome = engine
        .make_payment(PaymentRequest::new(loan.id, user.id, dec!(110)))
        .unwrap();
    assert!(!outcome.accepted);
    assert_eq!(outcome.message, format!("loan {} has been paid", loan.id));
}

/// Paying the rounded bill every week for `term` weeks settles the loan on
/// schedule, even when the bill does not divide evenly.
#[test]
fn rounded_bills_settle_in_exactly_term_payments() {
    for (amount, term) in [(dec!(1000), 7), (dec!(100), 11), (dec!(5000), 104)] {
        let (engine, clock, _) = engine();
        let user = engine.create_user("ivan").unwrap();
        let loan = engine.create_loan(user.id, amount, term).unwrap();
        let bill = engine.config().round_money(loan.bill_amount);

        for _ in 0..term {
            clock.advance_days(7);
            let outcome = engine
                .make_payment(PaymentRequest::new(loan.id, user.id, bill))
                .unwrap();
            assert!(outcome.accepted, "{amount}/{term}: {}", outcome.message);
        }

        assert_eq!(
            engine.outstanding(loan.id).unwrap(),
            Decimal::ZERO,
            "{amount}/{term} left a balance after {term} payments of {bill}"
        );
        assert!(engine.active_loans(user.id).unwrap().is_empty());
    }
}

/// A grace period shorter than the installment interval is refused, and a
/// payment late by less than a week still owes one bill.
#[test]
fn short_grace_period() {
    let config = BillingConfig {
        grace_period_days: 3,
        ..Default::default()
    };
    assert!(config.validate().is_err());

    let (engine, _, _) = engine_with(config);
    let user = engine.create_user("judy").unwrap();
    let loan = engine.create_loan(user.id, dec!(1000), 10).unwrap();

    let outcome = engine
        .make_payment(PaymentRequest::new(loan.id, user.id, dec!(110)).on(date(2024, 1, 6)))
        .unwrap();
    assert!(outcome.accepted, "{}", outcome.message);
    assert!(outcome.receipt.unwrap().was_late);
    assert_eq!(engine.outstanding(loan.id).unwrap(), dec!(900));
}

/// Querying an overdue loan flags the borrower, who can then not borrow more.
#[test]
fn overdue_query_blocks_new_loans() {
    let (engine, clock, _) = engine();
    let user = engine.create_user("bob").unwrap();
    let loan = engine.create_loan(user.id, dec!(1000), 10).unwrap();

    clock.advance_days(30);
    let next = engine.next_payment_info(loan.id).unwrap();
    assert!(next.is_late);
    assert_eq!(next.due_date, date(2024, 1, 8));
    assert_eq!(next.amount_due, dec!(330));

    assert!(engine.is_delinquent(user.id).unwrap());
    assert!(matches!(
        engine.create_loan(user.id, dec!(100), 1),
        Err(BillingError::UserDelinquent(_))
    ));
}

/// A late payment is charged per week since the last payment, and the
/// borrower stays delinquent until the loan is settled.
#[test]
fn late_payment_then_settlement_clears_delinquency() {
    let (engine, _, _) = engine();
    let user = engine.create_user("carol").unwrap();
    let loan = engine.create_loan(user.id, dec!(300), 3).unwrap();
    assert_eq!(loan.bill_amount, dec!(110));

    // 21 days after creation: 3 weeks of bills exceed the 300 balance, so
    // the charge is the balance with its markup.
    let rejected = engine
        .make_payment(PaymentRequest::new(loan.id, user.id, dec!(110)).on(date(2024, 1, 22)))
        .unwrap();
    assert!(!rejected.accepted);
    assert!(rejected.message.contains("Expected: 330.00"));
    assert!(engine.is_delinquent(user.id).unwrap());

    let accepted = engine
        .make_payment(PaymentRequest::new(loan.id, user.id, dec!(330)).on(date(2024, 1, 22)))
        .unwrap();
    assert!(accepted.accepted);
    let receipt = accepted.receipt.unwrap();
    assert!(receipt.settled);
    assert!(receipt.delinquency_cleared);
    assert!(!engine.is_delinquent(user.id).unwrap());

    // Good standing again: new loans allowed.
    assert!(engine.create_loan(user.id, dec!(100), 1).is_ok());
}

/// Two overdue loans: paying one off is not enough to clear the flag.
#[test]
fn delinquency_clears_only_when_every_loan_is_paid() {
    let (engine, _, _) = engine();
    let user = engine.create_user("dave").unwrap();
    let first = engine.create_loan(user.id, dec!(200), 2).unwrap();
    let second = engine.create_loan(user.id, dec!(200), 2).unwrap();

    let pay_off = |loan: LoanId| {
        engine
            .make_payment(PaymentRequest::new(loan, user.id, dec!(220)).on(date(2024, 1, 29)))
            .unwrap()
    };

    assert!(pay_off(first.id).accepted);
    assert!(engine.is_delinquent(user.id).unwrap());

    assert!(pay_off(second.id).accepted);
    assert!(!engine.is_delinquent(user.id).unwrap());
}

/// A borrower flagged by a status query is cleared by the settling payment.
#[test]
fn settlement_after_status_query_clears_flag() {
    let (engine, clock, _) = engine();
    let user = engine.create_user("erin").unwrap();
    let loan = engine.create_loan(user.id, dec!(100), 1).unwrap();

    clock.advance_days(23);
    assert!(engine.next_payment_info(loan.id).unwrap().is_late);
    assert!(engine.is_delinquent(user.id).unwrap());

    // 23 days since creation: 3 weeks, 330 > 100, capped at 110.
    let outcome = engine
        .make_payment(PaymentRequest::new(loan.id, user.id, dec!(110)))
        .unwrap();
    assert!(outcome.accepted, "{}", outcome.message);
    assert!(!engine.is_delinquent(user.id).unwrap());
}

#[test]
fn payment_against_someone_elses_loan() {
    let (engine, _, _) = engine();
    let alice = engine.create_user("alice").unwrap();
    let mallory = engine.create_user("mallory").unwrap();
    let loan = engine.create_loan(alice.id, dec!(1000), 10).unwrap();

    let outcome = engine
        .make_payment(PaymentRequest::new(loan.id, mallory.id, dec!(110)))
        .unwrap();
    assert!(!outcome.accepted);
    assert_eq!(engine.outstanding(loan.id).unwrap(), dec!(1000));
}

#[test]
fn unknown_ids_are_errors() {
    let (engine, _, _) = engine();
    assert!(matches!(
        engine.next_payment_info(LoanId::new(1)),
        Err(BillingError::LoanNotFound(_))
    ));
    assert!(matches!(
        engine.create_loan(billing_engine::core::user::UserId::new(1), dec!(10), 1),
        Err(BillingError::UserNotFound(_))
    ));
}

/// The interest rate is configuration, not a constant.
#[test]
fn configured_interest_rate_flows_through() {
    let (engine, clock, _) = engine_with(BillingConfig::default().with_interest_rate(dec!(0.20)));
    let user = engine.create_user("frank").unwrap();
    let loan = engine.create_loan(user.id, dec!(1000), 10).unwrap();
    assert_eq!(loan.bill_amount, dec!(120));

    clock.advance_days(7);
    let outcome = engine
        .make_payment(PaymentRequest::new(loan.id, user.id, dec!(120)))
        .unwrap();
    assert!(outcome.accepted);
    assert_eq!(engine.outstanding(loan.id).unwrap(), dec!(900));
}

/// Ledger survives a save/load cycle and keeps assigning fresh ids.
#[test]
fn ledger_persists_through_snapshot() {
    let (engine, clock, store) = engine();
    let user = engine.create_user("grace").unwrap();
    let loan = engine.create_loan(user.id, dec!(1000), 10).unwrap();
    clock.advance_days(7);
    engine
        .make_payment(PaymentRequest::new(loan.id, user.id, dec!(110)))
        .unwrap();

    let dir = tempdir().unwrap();
    let path = dir.path().join("ledger.json");
    store.snapshot().unwrap().save(&path).unwrap();

    let restored = Arc::new(InMemoryLedgerStore::from_snapshot(
        LedgerSnapshot::load(&path).unwrap(),
    ));

    let engine = BillingEngine::with_clock(restored, BillingConfig::default(), clock.clone());
    assert_eq!(engine.outstanding(loan.id).unwrap(), dec!(900));
    assert_eq!(engine.list_users().unwrap().len(), 1);

    let second = engine.create_loan(user.id, dec!(500), 5).unwrap();
    assert_eq!(second.id, LoanId::new(2));
}

/// Payment outcomes serialize with the fields callers depend on.
#[test]
fn payment_outcome_serializes() {
    let (engine, clock, _) = engine();
    let user = engine.create_user("heidi").unwrap();
    let loan = engine.create_loan(user.id, dec!(1000), 10).unwrap();
    clock.set(start() + Duration::days(7));

    let outcome = engine
        .make_payment(PaymentRequest::new(loan.id, user.id, dec!(110)))
        .unwrap();
    let value = serde_json::to_value(&outcome).unwrap();
    assert_eq!(value["accepted"], true);
    assert_eq!(value["message"], "success to make a payment");
    assert_eq!(value["loan_id"], 1);
    assert!(value["receipt"]["outstanding"].is_string());
}
