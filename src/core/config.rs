use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors arising from loading or validating a [`BillingConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("interest rate must not be negative, got {0}")]
    NegativeInterestRate(Decimal),
    #[error("grace period must not be negative, got {0} days")]
    NegativeGracePeriod(i64),
    #[error("installment interval must be positive, got {0} days")]
    NonPositiveInterval(i64),
    #[error("grace period of {grace} days is shorter than the {interval}-day installment interval")]
    GraceShorterThanInterval { grace: i64, interval: i64 },
}

/// Tunables for bill computation.
///
/// Every loan in a ledger shares one configuration. The defaults reproduce
/// the weekly schedule with a 10% markup and a two-week grace period.
///
/// # Examples
///
/// ```
/// use billing_engine::core::config::BillingConfig;
/// use rust_decimal_macros::dec;
///
/// let config = BillingConfig::default();
/// assert_eq!(config.interest_rate, dec!(0.10));
/// assert_eq!(config.markup(), dec!(1.10));
/// assert_eq!(config.round_money(dec!(366.666666)), dec!(366.67));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BillingConfig {
    /// Flat interest markup applied to every installment.
    pub interest_rate: Decimal,
    /// Days past a due date before a payment counts as late.
    pub grace_period_days: i64,
    /// Days between two installments.
    pub installment_interval_days: i64,
    /// Decimal places money amounts are rounded to before comparison.
    pub money_scale: u32,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            interest_rate: dec!(0.10),
            grace_period_days: 14,
            installment_interval_days: 7,
            money_scale: 2,
        }
    }
}

impl BillingConfig {
    /// Load a configuration from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Use a different interest rate, keeping everything else.
    pub fn with_interest_rate(mut self, rate: Decimal) -> Self {
        self.interest_rate = rate;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interest_rate < Decimal::ZERO {
            return Err(ConfigError::NegativeInterestRate(self.interest_rate));
        }
        if self.grace_period_days < 0 {
            return Err(ConfigError::NegativeGracePeriod(self.grace_period_days));
        }
        if self.installment_interval_days <= 0 {
            return Err(ConfigError::NonPositiveInterval(
                self.installment_interval_days,
            ));
        }
        // A payment late by less than one interval would owe zero bills.
        if self.grace_period_days < self.installment_interval_days {
            return Err(ConfigError::GraceShorterThanInterval {
                grace: self.grace_period_days,
                interval: self.installment_interval_days,
            });
        }
        Ok(())
    }

    /// `1 + interest_rate`.
    pub fn markup(&self) -> Decimal {
        Decimal::ONE + self.interest_rate
    }

    /// Round a money amount to the configured scale. Halves round away from zero.
    pub fn round_money(&self, amount: Decimal) -> Decimal {
        amount.round_dp_with_strategy(
            self.money_scale,
            rust_decimal::RoundingStrategy::MidpointAwayFromZero,
        )
    }

    /// Whether two amounts are equal once rounded to the money scale.
    pub fn same_money(&self, a: Decimal, b: Decimal) -> bool {
        self.round_money(a) == self.round_money(b)
    }
}
