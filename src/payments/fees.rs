use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};

/// suffix for the fee entry derived from a provider payment
pub const PROFIT_KEY_SUFFIX: &str = "_PROFIT";

/// processor fee charged on automated payments
///
/// Booked after allocation as a negative entry against operator interest;
/// it never changes what the installment owes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProcessorFeePolicy {
    pub rate: Rate,
}

impl Default for ProcessorFeePolicy {
    fn default() -> Self {
        Self {
            rate: Rate::from_percentage(dec!(1)),
        }
    }
}

impl ProcessorFeePolicy {
    pub fn new(rate: Rate) -> Self {
        Self { rate }
    }

    pub fn fee_for(&self, paid: Money) -> Money {
        paid.percentage(self.rate)
    }

    /// idempotency key of the derived fee entry
    pub fn derived_key(payment_key: &str) -> String {
        format!("{}{}", payment_key, PROFIT_KEY_SUFFIX)
    }
}
