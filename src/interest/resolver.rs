use chrono::NaiveDate;
use tracing::debug;

use crate::decimal::Money;
use crate::errors::Result;
use crate::interest::penalty::{PenaltyConfig, PenaltyEngine};
use crate::interest::DebtBreakdown;
use crate::state::{Installment, Loan};
use crate::types::Forgiveness;

/// computes what is owed on one installment as of a given day
#[derive(Debug, Default, Clone, Copy)]
pub struct DebtResolver;

impl DebtResolver {
    pub fn new() -> Self {
        Self
    }

    /// resolve the current debt; `today` is always supplied by the caller
    pub fn resolve(
        &self,
        loan: &Loan,
        installment: &Installment,
        today: NaiveDate,
        forgiveness: Forgiveness,
    ) -> Result<DebtBreakdown> {
        loan.validate()?;
        installment.validate()?;

        let days_late = installment.days_late(today);
        let principal = installment.remaining_principal;
        let interest = installment.remaining_interest;
        let carried_late_fee = installment.accrued_late_fee;

        // only the days and the fine no earlier posting has assessed
        let engine = PenaltyEngine::new(PenaltyConfig::from_loan(loan));
        let penalty = engine.calculate_penalty(
            principal + interest,
            installment.unassessed_days_late(today),
            !installment.fine_assessed,
        );

        let fine = if forgiveness.waives_fine() { Money::ZERO } else { penalty.fine };
        let daily_mora = if forgiveness.waives_mora() { Money::ZERO } else { penalty.daily_mora };

        debug!(
            loan_id = %loan.id,
            installment_id = %installment.id,
            days_late,
            carried_late_fee = %carried_late_fee,
            fine = %fine,
            daily_mora = %daily_mora,
            forgiveness = ?forgiveness,
            "resolved installment debt"
        );

        Ok(DebtBreakdown {
            principal,
            interest,
            carried_late_fee,
            fine,
            daily_mora,
            total: principal + interest + carried_late_fee + fine + daily_mora,
            days_late,
            waived_fine: penalty.fine - fine,
            waived_mora: penalty.daily_mora - daily_mora,
        })
    }
}

/// shorthand for `DebtResolver::resolve`
pub fn resolve(
    loan: &Loan,
    installment: &Installment,
    today: NaiveDate,
    forgiveness: Forgiveness,
) -> Result<DebtBreakdown> {
    DebtResolver::new().resolve(loan, installment, today, forgiveness)
}
