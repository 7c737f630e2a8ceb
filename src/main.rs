//! billing-engine CLI
//!
//! Drive the billing engine against a JSON ledger file.
//!
//! # Usage
//!
//! ```bash
//! # Register a borrower and lend them 1000 over 10 weeks
//! billing-engine add-user --name alice
//! billing-engine create-loan --user 1 --amount 1000 --term 10
//!
//! # Ask what is due, then pay it
//! billing-engine next-payment --loan 1
//! billing-engine pay --loan 1 --user 1 --amount 110
//!
//! # Backdated payment, JSON output
//! billing-engine pay --loan 1 --user 1 --amount 110 --date 2024-01-08 --format json
//! ```

use billing_engine::core::config::BillingConfig;
use billing_engine::core::loan::{Loan, LoanId};
use billing_engine::core::user::{User, UserId};
use billing_engine::service::engine::BillingEngine;
use billing_engine::service::payment::{parse_payment_date, PaymentRequest};
use billing_engine::simulation::stress_test::{generate_portfolio, PortfolioConfig};
use billing_engine::store::snapshot::LedgerSnapshot;
use billing_engine::store::InMemoryLedgerStore;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::fmt::Display;
use std::process;
use std::str::FromStr;
use std::sync::Arc;

const DEFAULT_STATE_FILE: &str = "billing-ledger.json";

fn print_usage() {
    eprintln!(
        r#"billing-engine: installment loan billing and delinquency tracking

USAGE:
    billing-engine <COMMAND> [OPTIONS]

COMMANDS:
    add-user        Register a borrower
    create-loan     Open a loan for a borrower
    pay             Submit an installment payment
    next-payment    Show the next due date and amount of a loan
    outstanding     Show the outstanding balance of a loan
    status          Show whether a borrower is delinquent
    loans           List all loans (or one borrower's active loans)
    users           List all borrowers
    generate        Populate the ledger with a random portfolio
    help            Show this message

OPTIONS (all commands):
    --state <FILE>      Ledger file (default: billing-ledger.json)
    --config <FILE>     JSON billing configuration
    --format <FORMAT>   Output format: text (default) or json

OPTIONS (add-user):
    --name <NAME>

OPTIONS (create-loan):
    --user <ID> --amount <AMOUNT> --term <WEEKS>

OPTIONS (pay):
    --loan <ID> --user <ID> --amount <AMOUNT> [--date <YYYY-MM-DD>]

OPTIONS (next-payment, outstanding):
    --loan <ID>

OPTIONS (status):
    --user <ID>

OPTIONS (loans):
    --user <ID>         Only active loans of this borrower

OPTIONS (generate):
    --users <N>         Number of borrowers (default: 10)
    --loans-per-user <N> Loans per borrower (default: 1)

Set RUST_LOG=info to see engine activity."#
    );
}

fn fail(message: impl Display) -> ! {
    eprintln!("Error: {}", message);
    process::exit(1);
}

/// Parsed `--key value` pairs.
struct Options {
    values: HashMap<String, String>,
}

impl Options {
    fn parse(args: &[String]) -> Self {
        let mut values = HashMap::new();
        let mut i = 0;
        while i < args.len() {
            let key = args[i]
                .strip_prefix("--")
                .unwrap_or_else(|| fail(format!("Unknown argument: {}", args[i])));
            i += 1;
            let value = args
                .get(i)
                .cloned()
                .unwrap_or_else(|| fail(format!("--{} requires a value", key)));
            values.insert(key.to_string(), value);
            i += 1;
        }
        Self { values }
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    fn required(&self, key: &str) -> &str {
        self.get(key)
            .unwrap_or_else(|| fail(format!("--{} is required", key)))
    }

    fn parsed<T: FromStr>(&self, key: &str) -> Option<T>
    where
        T::Err: Display,
    {
        self.get(key).map(|raw| {
            raw.parse()
                .unwrap_or_else(|e| fail(format!("Invalid --{} '{}': {}", key, raw, e)))
        })
    }

    fn required_parsed<T: FromStr>(&self, key: &str) -> T
    where
        T::Err: Display,
    {
        let raw = self.required(key);
        raw.parse()
            .unwrap_or_else(|e| fail(format!("Invalid --{} '{}': {}", key, raw, e)))
    }

    fn json(&self) -> bool {
        match self.get("format").unwrap_or("text") {
            "json" => true,
            "text" => false,
            other => fail(format!("--format must be 'text' or 'json', got '{}'", other)),
        }
    }
}

/// The engine bound to a ledger file.
struct Session {
    store: Arc<InMemoryLedgerStore>,
    engine: BillingEngine,
    state_path: String,
}

impl Session {
    fn open(opts: &Options) -> Self {
        let config = match opts.get("config") {
            Some(path) => BillingConfig::from_json_file(path).unwrap_or_else(|e| fail(e)),
            None => BillingConfig::default(),
        };
        let state_path = opts.get("state").unwrap_or(DEFAULT_STATE_FILE).to_string();
        let snapshot = LedgerSnapshot::load(&state_path).unwrap_or_else(|e| fail(e));
        let store = Arc::new(InMemoryLedgerStore::from_snapshot(snapshot));
        let engine = BillingEngine::new(store.clone(), config);
        Self {
            store,
            engine,
            state_path,
        }
    }

    fn save(&self) {
        self.store
            .snapshot()
            .and_then(|snapshot| snapshot.save(&self.state_path))
            .unwrap_or_else(|e| fail(e));
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => fail(e),
    }
}

fn print_loan(loan: &Loan) {
    println!(
        "Loan {:>4}  user {:>4}  amount {:>12}  term {:>3}  bill {:>10}  outstanding {:>12}  updated {}",
        loan.id,
        loan.user_id,
        loan.amount,
        loan.term,
        loan.bill_amount.round_dp(2),
        loan.outstanding.round_dp(2),
        loan.update_time.format("%Y-%m-%d")
    );
}

fn print_user(user: &User) {
    let status = if user.is_delinquent {
        "DELINQUENT"
    } else {
        "in good standing"
    };
    println!("User {:>4}  {:<24} {}", user.id, user.name, status);
}

fn cmd_add_user(opts: &Options) {
    let session = Session::open(opts);
    let user = session
        .engine
        .create_user(opts.required("name"))
        .unwrap_or_else(|e| fail(e));
    session.save();

    if opts.json() {
        print_json(&user);
    } else {
        println!("success to create user");
        print_user(&user);
    }
}

fn cmd_create_loan(opts: &Options) {
    let session = Session::open(opts);
    let user = UserId::new(opts.required_parsed("user"));
    let amount: Decimal = opts.required_parsed("amount");
    let term: u32 = opts.required_parsed("term");

    let loan = session
        .engine
        .create_loan(user, amount, term)
        .unwrap_or_else(|e| fail(e));
    session.save();

    if opts.json() {
        print_json(&loan);
    } else {
        println!("success to create a loan");
        print_loan(&loan);
    }
}

fn cmd_pay(opts: &Options) {
    let session = Session::open(opts);
    let date = parse_payment_date(opts.get("date")).unwrap_or_else(|e| fail(e));
    let request = PaymentRequest {
        loan_id: LoanId::new(opts.required_parsed("loan")),
        user_id: UserId::new(opts.required_parsed("user")),
        amount: opts.required_parsed("amount"),
        payment_date: date,
    };

    let outcome = session
        .engine
        .make_payment(request)
        .unwrap_or_else(|e| fail(e));
    // Late payments flag the borrower even when rejected.
    session.save();

    if opts.json() {
        print_json(&outcome);
    } else {
        print!("{}", outcome);
    }
    if !outcome.accepted {
        process::exit(2);
    }
}

fn cmd_next_payment(opts: &Options) {
    let session = Session::open(opts);
    let loan = LoanId::new(opts.required_parsed("loan"));
    let next = session
        .engine
        .next_payment_info(loan)
        .unwrap_or_else(|e| fail(e));
    session.save();

    if opts.json() {
        print_json(&next);
    } else {
        print!("{}", next);
    }
}

fn cmd_outstanding(opts: &Options) {
    let session = Session::open(opts);
    let loan = LoanId::new(opts.required_parsed("loan"));
    let outstanding = session
        .engine
        .outstanding(loan)
        .unwrap_or_else(|e| fail(e));

    if opts.json() {
        print_json(&serde_json::json!({
            "loan_id": loan,
            "outstanding": outstanding,
        }));
    } else {
        println!("outstanding amount of loan ID {} is {:.2}", loan, outstanding);
    }
}

fn cmd_status(opts: &Options) {
    let session = Session::open(opts);
    let user = UserId::new(opts.required_parsed("user"));
    let delinquent = session
        .engine
        .is_delinquent(user)
        .unwrap_or_else(|e| fail(e));

    if opts.json() {
        print_json(&serde_json::json!({
            "user_id": user,
            "is_delinquent": delinquent,
        }));
    } else if delinquent {
        println!("user is delinquent");
    } else {
        println!("user is not delinquent");
    }
}

fn cmd_loans(opts: &Options) {
    let session = Session::open(opts);
    let loans = match opts.parsed::<u64>("user") {
        Some(user) => session.engine.active_loans(UserId::new(user)),
        None => session.engine.list_loans(),
    }
    .unwrap_or_else(|e| fail(e));

    if opts.json() {
        print_json(&loans);
    } else if loans.is_empty() {
        println!("No loans.");
    } else {
        loans.iter().for_each(print_loan);
    }
}

fn cmd_users(opts: &Options) {
    let session = Session::open(opts);
    let users = session.engine.list_users().unwrap_or_else(|e| fail(e));

    if opts.json() {
        print_json(&users);
    } else if users.is_empty() {
        println!("No users.");
    } else {
        users.iter().for_each(print_user);
    }
}

fn cmd_generate(opts: &Options) {
    let session = Session::open(opts);
    let config = PortfolioConfig {
        user_count: opts.parsed("users").unwrap_or(10),
        loans_per_user: opts.parsed("loans-per-user").unwrap_or(1),
        ..Default::default()
    };

    let loans = generate_portfolio(&session.engine, &config).unwrap_or_else(|e| fail(e));
    session.save();

    if opts.json() {
        print_json(&loans);
    } else {
        eprintln!(
            "Generated {} loans across {} borrowers → {}",
            loans.len(),
            config.user_count,
            session.state_path
        );
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let command = args[1].as_str();
    if matches!(command, "help" | "--help" | "-h") {
        print_usage();
        return;
    }
    let opts = Options::parse(&args[2..]);

    match command {
        "add-user" => cmd_add_user(&opts),
        "create-loan" => cmd_create_loan(&opts),
        "pay" => cmd_pay(&opts),
        "next-payment" => cmd_next_payment(&opts),
        "outstanding" => cmd_outstanding(&opts),
        "status" => cmd_status(&opts),
        "loans" => cmd_loans(&opts),
        "users" => cmd_users(&opts),
        "generate" => cmd_generate(&opts),
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            process::exit(1);
        }
    }
}
