pub mod fees;
pub mod settlement;
pub mod waterfall;

use crate::decimal::Money;
use crate::errors::{PaymentError, Result};

pub use fees::ProcessorFeePolicy;
pub use settlement::{SettlementPlan, SettlementPlanner};
pub use waterfall::{allocate, allocate_breakdown, AllocationDeltas, BreakdownAllocation};

/// a tendered amount must be strictly positive
pub fn validate_tender(amount: Money) -> Result<()> {
    if !amount.is_positive() {
        return Err(PaymentError::invalid_input(format!(
            "payment amount must be positive, got {}",
            amount
        )));
    }
    Ok(())
}
