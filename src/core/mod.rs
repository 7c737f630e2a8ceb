pub mod clock;
pub mod config;
pub mod dates;
pub mod error;
pub mod loan;
pub mod user;
