//! Billing modality policy: what each repayment structure allows.

use chrono::{Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::state::Loan;
use crate::types::{BillingCycle, SettlementAction};

/// days a free-form daily loan is pushed on renewal
pub const DAILY_FREE_CYCLE_DAYS: u64 = 30;

/// settlement rules for one billing cycle kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModalityConfig {
    pub allow_partial: bool,
    pub allow_renew: bool,
    pub default_action: SettlementAction,
}

impl ModalityConfig {
    /// monthly loans: interest per cycle, renewal allowed
    pub fn monthly() -> Self {
        Self {
            allow_partial: true,
            allow_renew: true,
            default_action: SettlementAction::RenewInterest,
        }
    }

    /// free-form daily loans behave like monthly ones
    pub fn daily_free() -> Self {
        Self::monthly()
    }

    /// the total is derived from elapsed days, so the due date never moves
    pub fn daily_fixed_term() -> Self {
        Self {
            allow_partial: true,
            allow_renew: false,
            default_action: SettlementAction::Full,
        }
    }

    pub fn for_cycle(cycle: &BillingCycle) -> Self {
        match cycle {
            BillingCycle::Monthly => Self::monthly(),
            BillingCycle::DailyFree => Self::daily_free(),
            BillingCycle::DailyFixedTerm => Self::daily_fixed_term(),
            BillingCycle::Unknown(_) => Self::monthly(),
        }
    }
}

/// settlement rules for a loan
pub fn config_for(loan: &Loan) -> ModalityConfig {
    ModalityConfig::for_cycle(&loan.billing_cycle)
}

/// due date after one renewal, `None` when the cycle cannot renew
pub fn renewal_due_date(cycle: &BillingCycle, due_date: NaiveDate) -> Option<NaiveDate> {
    match cycle {
        BillingCycle::Monthly | BillingCycle::Unknown(_) => {
            due_date.checked_add_months(Months::new(1))
        }
        BillingCycle::DailyFree => due_date.checked_add_days(Days::new(DAILY_FREE_CYCLE_DAYS)),
        BillingCycle::DailyFixedTerm => None,
    }
}
