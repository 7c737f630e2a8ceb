pub mod calculator;
pub mod delinquency;
