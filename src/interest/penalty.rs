use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::state::Loan;

/// late penalty terms of a loan
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PenaltyConfig {
    /// flat fine, charged once regardless of days late
    pub fine_rate: Rate,
    /// mora per day late
    pub daily_mora_rate: Rate,
}

impl PenaltyConfig {
    pub fn new(fine_rate: Rate, daily_mora_rate: Rate) -> Self {
        Self {
            fine_rate,
            daily_mora_rate,
        }
    }

    pub fn from_loan(loan: &Loan) -> Self {
        Self::new(loan.fine_rate, loan.daily_interest_rate)
    }
}

/// engine for late penalties on an overdue base
pub struct PenaltyEngine {
    pub config: PenaltyConfig,
}

impl PenaltyEngine {
    pub fn new(config: PenaltyConfig) -> Self {
        Self { config }
    }

    /// linear mora on `base` for `days_late`, plus the fine when `charge_fine`
    pub fn calculate_penalty(&self, base: Money, days_late: u32, charge_fine: bool) -> PenaltyCalculation {
        if days_late == 0 {
            return PenaltyCalculation {
                fine: Money::ZERO,
                daily_mora: Money::ZERO,
                days_charged: 0,
                overdue_base: base,
            };
        }

        let fine = if charge_fine {
            base.percentage(self.config.fine_rate)
        } else {
            Money::ZERO
        };
        // rounded once on the full product, not per day
        let mora = base.as_decimal()
            * self.config.daily_mora_rate.as_fraction()
            * Decimal::from(days_late);

        PenaltyCalculation {
            fine,
            daily_mora: Money::from_decimal(mora),
            days_charged: days_late,
            overdue_base: base,
        }
    }
}

/// penalty calculation result
#[derive(Debug, Clone, PartialEq)]
pub struct PenaltyCalculation {
    pub fine: Money,
    pub daily_mora: Money,
    pub days_charged: u32,
    pub overdue_base: Money,
}
