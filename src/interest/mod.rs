pub mod penalty;
pub mod resolver;

use serde::{Deserialize, Serialize};

use crate::decimal::Money;

pub use penalty::{PenaltyCalculation, PenaltyConfig, PenaltyEngine};
pub use resolver::{resolve, DebtResolver};

/// what is owed on one installment after forgiveness
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebtBreakdown {
    pub principal: Money,
    /// cycle interest, independent of lateness
    pub interest: Money,
    /// late fee assessed at an earlier posting, still unpaid
    pub carried_late_fee: Money,
    /// penalties newly assessed today
    pub fine: Money,
    pub daily_mora: Money,
    pub total: Money,
    pub days_late: u32,
    pub waived_fine: Money,
    pub waived_mora: Money,
}

impl DebtBreakdown {
    /// carried fee, fine and mora: the first tier of the waterfall
    pub fn late_fee_due(&self) -> Money {
        self.carried_late_fee + self.fine + self.daily_mora
    }

    /// amount a renewal must cover: penalties and cycle interest
    pub fn renew_amount(&self) -> Money {
        self.late_fee_due() + self.interest
    }

    pub fn full_amount(&self) -> Money {
        self.total
    }

    pub fn is_late(&self) -> bool {
        self.days_late > 0
    }
}
