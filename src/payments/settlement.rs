use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::{PaymentError, Result};
use crate::interest::{DebtBreakdown, DebtResolver};
use crate::policy::{config_for, renewal_due_date, ModalityConfig};
use crate::state::{Installment, Loan};
use crate::types::{Forgiveness, SettlementAction};

use super::validate_tender;
use super::waterfall::{allocate_breakdown, AllocationDeltas, BreakdownAllocation};

/// what an operator payment will do to an installment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementPlan {
    pub action: SettlementAction,
    pub breakdown: DebtBreakdown,
    pub allocation: BreakdownAllocation,
    pub deltas: AllocationDeltas,
    /// late fee owed at posting time (carried fee, fine and mora after forgiveness)
    pub late_fee_assessed: Money,
    /// day the penalties in `late_fee_assessed` run through, when late
    pub assessed_through: Option<NaiveDate>,
    /// new due date when the installment is renewed
    pub renew_to: Option<NaiveDate>,
}

impl SettlementPlan {
    pub fn amount(&self) -> Money {
        self.deltas.total_applied()
    }

    /// true when the plan leaves nothing owed
    pub fn settles(&self) -> bool {
        self.renew_to.is_none() && self.allocation.total_applied() == self.breakdown.total
    }
}

/// turns an operator's chosen action into a validated plan
pub struct SettlementPlanner {
    resolver: DebtResolver,
}

impl Default for SettlementPlanner {
    fn default() -> Self {
        Self::new()
    }
}

impl SettlementPlanner {
    pub fn new() -> Self {
        Self {
            resolver: DebtResolver::new(),
        }
    }

    /// build a plan; `action = None` takes the modality default
    pub fn plan(
        &self,
        loan: &Loan,
        installment: &Installment,
        today: NaiveDate,
        forgiveness: Forgiveness,
        action: Option<SettlementAction>,
        tendered: Money,
    ) -> Result<SettlementPlan> {
        if installment.is_paid() {
            return Err(PaymentError::InstallmentAlreadySettled {
                installment_id: installment.id,
            });
        }
        validate_tender(tendered)?;

        let modality = config_for(loan);
        let action = action.unwrap_or(modality.default_action);
        let breakdown = self.resolver.resolve(loan, installment, today, forgiveness)?;
        let assessed_through = breakdown.is_late().then_some(today);

        let plan = match action {
            SettlementAction::RenewInterest => {
                self.plan_renewal(loan, installment, &modality, breakdown, tendered)
            }
            SettlementAction::Full => self.plan_full(breakdown, tendered),
            SettlementAction::Partial => self.plan_partial(&modality, breakdown, tendered),
        }?;
        Ok(SettlementPlan {
            assessed_through,
            ..plan
        })
    }

    fn plan_renewal(
        &self,
        loan: &Loan,
        installment: &Installment,
        modality: &ModalityConfig,
        breakdown: DebtBreakdown,
        tendered: Money,
    ) -> Result<SettlementPlan> {
        let renew_to = match renewal_due_date(&loan.billing_cycle, installment.due_date) {
            Some(date) if modality.allow_renew => date,
            _ => {
                return Err(PaymentError::invalid_input(format!(
                    "{} loans cannot be renewed",
                    loan.billing_cycle
                )))
            }
        };

        let required = breakdown.renew_amount();
        if tendered < required {
            return Err(PaymentError::invalid_input(format!(
                "renewal requires {}, tendered {}",
                required, tendered
            )));
        }
        if tendered > required {
            return Err(PaymentError::Overpayment {
                unapplied: tendered - required,
            });
        }

        let allocation = BreakdownAllocation {
            to_late_fee: breakdown.carried_late_fee,
            to_fine: breakdown.fine,
            to_mora: breakdown.daily_mora,
            to_interest: breakdown.interest,
            to_principal: Money::ZERO,
            unapplied: Money::ZERO,
        };

        Ok(SettlementPlan {
            action: SettlementAction::RenewInterest,
            late_fee_assessed: breakdown.late_fee_due(),
            assessed_through: None,
            deltas: allocation.to_deltas(),
            allocation,
            breakdown,
            renew_to: Some(renew_to),
        })
    }

    fn plan_full(&self, breakdown: DebtBreakdown, tendered: Money) -> Result<SettlementPlan> {
        if tendered < breakdown.total {
            return Err(PaymentError::invalid_input(format!(
                "full settlement requires {}, tendered {}",
                breakdown.total, tendered
            )));
        }
        self.waterfall_plan(SettlementAction::Full, breakdown, tendered)
    }

    fn plan_partial(
        &self,
        modality: &ModalityConfig,
        breakdown: DebtBreakdown,
        tendered: Money,
    ) -> Result<SettlementPlan> {
        if !modality.allow_partial {
            return Err(PaymentError::invalid_input("partial payments are not allowed"));
        }
        self.waterfall_plan(SettlementAction::Partial, breakdown, tendered)
    }

    fn waterfall_plan(
        &self,
        action: SettlementAction,
        breakdown: DebtBreakdown,
        tendered: Money,
    ) -> Result<SettlementPlan> {
        let allocation = allocate_breakdown(&breakdown, tendered)?;
        let deltas = allocation.to_deltas().require_exact()?;

        Ok(SettlementPlan {
            action,
            late_fee_assessed: breakdown.late_fee_due(),
            assessed_through: None,
            deltas,
            allocation,
            breakdown,
            renew_to: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Rate;
    use crate::types::{BillingCycle, InstallmentStatus};
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn setup(cycle: BillingCycle) -> (Loan, Installment) {
        let loan = Loan::new(
            cycle,
            date(2024, 1, 1),
            Rate::from_percentage(dec!(2)),
            Rate::from_percentage(dec!(0.5)),
        );
        let inst = Installment::new(
            loan.id,
            1,
            date(2024, 2, 1),
            Money::from_major(1_000),
            Money::from_major(50),
        );
        (loan, inst)
    }

    fn late() -> NaiveDate {
        date(2024, 2, 11)
    }

    #[test]
    fn test_default_monthly_action_renews() {
        let (loan, inst) = setup(BillingCycle::Monthly);
        let planner = SettlementPlanner::new();

        let plan = planner
            .plan(&loan, &inst, late(), Forgiveness::None, None, Money::from_str_exact("123.5").unwrap())
            .unwrap();

        assert_eq!(plan.action, SettlementAction::RenewInterest);
        assert_eq!(plan.renew_to, Some(date(2024, 3, 1)));
        assert_eq!(plan.deltas.late_fee_delta, Money::from_str_exact("73.5").unwrap());
        assert_eq!(plan.deltas.interest_delta, Money::from_major(50));
        assert_eq!(plan.deltas.principal_delta, Money::ZERO);
        assert_eq!(plan.assessed_through, Some(late()));
        assert!(!plan.settles());
    }

    #[test]
    fn test_renewal_needs_exact_amount() {
        let (loan, inst) = setup(BillingCycle::Monthly);
        let planner = SettlementPlanner::new();
        let action = Some(SettlementAction::RenewInterest);

        let short = planner.plan(&loan, &inst, late(), Forgiveness::None, action, Money::from_major(100));
        assert!(matches!(short, Err(PaymentError::InvalidInput { .. })));

        let over = planner.plan(&loan, &inst, late(), Forgiveness::None, action, Money::from_major(130));
        assert!(matches!(
            over,
            Err(PaymentError::Overpayment { unapplied }) if unapplied == Money::from_str_exact("6.5").unwrap()
        ));
    }

    #[test]
    fn test_forgiveness_lowers_renewal_amount() {
        let (loan, inst) = setup(BillingCycle::DailyFree);
        let plan = SettlementPlanner::new()
            .plan(&loan, &inst, late(), Forgiveness::Both, None, Money::from_major(50))
            .unwrap();

        assert_eq!(plan.late_fee_assessed, Money::ZERO);
        assert_eq!(plan.renew_to, Some(date(2024, 3, 2)));
    }

    #[test]
    fn test_fixed_term_defaults_to_full_and_cannot_renew() {
        let (loan, inst) = setup(BillingCycle::DailyFixedTerm);
        let planner = SettlementPlanner::new();

        let renew = planner.plan(
            &loan,
            &inst,
            late(),
            Forgiveness::None,
            Some(SettlementAction::RenewInterest),
            Money::from_str_exact("123.5").unwrap(),
        );
        assert!(matches!(renew, Err(PaymentError::InvalidInput { .. })));

        let plan = planner
            .plan(&loan, &inst, late(), Forgiveness::None, None, Money::from_str_exact("1123.5").unwrap())
            .unwrap();
        assert_eq!(plan.action, SettlementAction::Full);
        assert!(plan.settles());
        assert_eq!(plan.amount(), Money::from_str_exact("1123.5").unwrap());
    }

    #[test]
    fn test_full_short_payment_rejected() {
        let (loan, inst) = setup(BillingCycle::Monthly);
        let result = SettlementPlanner::new().plan(
            &loan,
            &inst,
            late(),
            Forgiveness::None,
            Some(SettlementAction::Full),
            Money::from_major(1_000),
        );
        assert!(matches!(result, Err(PaymentError::InvalidInput { .. })));
    }

    #[test]
    fn test_partial_runs_waterfall() {
        let (loan, inst) = setup(BillingCycle::Monthly);
        let plan = SettlementPlanner::new()
            .plan(&loan, &inst, late(), Forgiveness::None, Some(SettlementAction::Partial), Money::from_major(100))
            .unwrap();

        assert_eq!(plan.allocation.to_fine, Money::from_major(21));
        assert_eq!(plan.allocation.to_mora, Money::from_str_exact("52.5").unwrap());
        assert_eq!(plan.allocation.to_interest, Money::from_str_exact("26.5").unwrap());
        assert_eq!(plan.allocation.to_principal, Money::ZERO);
        assert_eq!(plan.renew_to, None);
    }

    #[test]
    fn test_partial_overpayment_reported() {
        let (loan, inst) = setup(BillingCycle::Monthly);
        let result = SettlementPlanner::new().plan(
            &loan,
            &inst,
            late(),
            Forgiveness::Both,
            Some(SettlementAction::Partial),
            Money::from_major(1_100),
        );
        assert!(matches!(
            result,
            Err(PaymentError::Overpayment { unapplied }) if unapplied == Money::from_major(50)
        ));
    }

    #[test]
    fn test_paid_installment_rejected() {
        let (loan, mut inst) = setup(BillingCycle::Monthly);
        inst.status = InstallmentStatus::Paid;

        let result = SettlementPlanner::new().plan(
            &loan,
            &inst,
            late(),
            Forgiveness::None,
            None,
            Money::from_major(10),
        );
        assert!(matches!(result, Err(PaymentError::InstallmentAlreadySettled { .. })));
    }

    #[test]
    fn test_zero_tender_rejected() {
        let (loan, inst) = setup(BillingCycle::Monthly);
        let result = SettlementPlanner::new().plan(
            &loan,
            &inst,
            late(),
            Forgiveness::None,
            Some(SettlementAction::Partial),
            Money::ZERO,
        );
        assert!(matches!(result, Err(PaymentError::InvalidInput { .. })));
    }
}
