use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::{PaymentError, Result};
use crate::interest::DebtBreakdown;

/// buckets in the order a payment reaches them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PaymentComponent {
    /// late fee already on the installment
    LateFee,
    Fine,
    DailyMora,
    Interest,
    Principal,
}

/// late fee (carried, fine, then mora) -> cycle interest -> principal
const WATERFALL: [PaymentComponent; 5] = [
    PaymentComponent::LateFee,
    PaymentComponent::Fine,
    PaymentComponent::DailyMora,
    PaymentComponent::Interest,
    PaymentComponent::Principal,
];

/// amounts to take off each installment bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AllocationDeltas {
    pub late_fee_delta: Money,
    pub interest_delta: Money,
    pub principal_delta: Money,
    /// part of the tendered amount no bucket could take
    pub unapplied: Money,
}

impl AllocationDeltas {
    pub fn total_applied(&self) -> Money {
        self.late_fee_delta + self.interest_delta + self.principal_delta
    }

    /// fail with `Overpayment` when anything was left over
    pub fn require_exact(self) -> Result<Self> {
        if self.unapplied.is_positive() {
            return Err(PaymentError::Overpayment {
                unapplied: self.unapplied,
            });
        }
        Ok(self)
    }
}

/// allocation against a resolved breakdown, fine and mora kept apart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BreakdownAllocation {
    pub to_late_fee: Money,
    pub to_fine: Money,
    pub to_mora: Money,
    pub to_interest: Money,
    pub to_principal: Money,
    pub unapplied: Money,
}

impl BreakdownAllocation {
    pub fn total_applied(&self) -> Money {
        self.to_late_fee + self.to_fine + self.to_mora + self.to_interest + self.to_principal
    }

    /// collapse carried fee, fine and mora into the installment's late fee bucket
    pub fn to_deltas(&self) -> AllocationDeltas {
        AllocationDeltas {
            late_fee_delta: self.to_late_fee + self.to_fine + self.to_mora,
            interest_delta: self.to_interest,
            principal_delta: self.to_principal,
            unapplied: self.unapplied,
        }
    }
}

fn ensure_non_negative(label: &str, amount: Money) -> Result<()> {
    if amount.is_negative() {
        return Err(PaymentError::invalid_input(format!("{} {} is negative", label, amount)));
    }
    Ok(())
}

struct Waterfall {
    remaining: Money,
    allocation: BreakdownAllocation,
}

impl Waterfall {
    fn new(tendered: Money) -> Self {
        Self {
            remaining: tendered,
            allocation: BreakdownAllocation::default(),
        }
    }

    fn apply_to_component(&mut self, component: PaymentComponent, due: Money) {
        let applied_field = match component {
            PaymentComponent::LateFee => &mut self.allocation.to_late_fee,
            PaymentComponent::Fine => &mut self.allocation.to_fine,
            PaymentComponent::DailyMora => &mut self.allocation.to_mora,
            PaymentComponent::Interest => &mut self.allocation.to_interest,
            PaymentComponent::Principal => &mut self.allocation.to_principal,
        };

        let payment = self.remaining.min(due);
        *applied_field = payment;
        self.remaining -= payment;
    }

    fn finish(mut self) -> BreakdownAllocation {
        self.allocation.unapplied = self.remaining;
        self.allocation
    }
}

/// split a payment across carried fee, fine, mora, cycle interest and principal
pub fn allocate_breakdown(debt: &DebtBreakdown, tendered: Money) -> Result<BreakdownAllocation> {
    ensure_non_negative("tendered amount", tendered)?;
    ensure_non_negative("carried late fee", debt.carried_late_fee)?;
    ensure_non_negative("fine", debt.fine)?;
    ensure_non_negative("daily mora", debt.daily_mora)?;
    ensure_non_negative("interest", debt.interest)?;
    ensure_non_negative("principal", debt.principal)?;

    let mut waterfall = Waterfall::new(tendered);
    for component in WATERFALL {
        let due = match component {
            PaymentComponent::LateFee => debt.carried_late_fee,
            PaymentComponent::Fine => debt.fine,
            PaymentComponent::DailyMora => debt.daily_mora,
            PaymentComponent::Interest => debt.interest,
            PaymentComponent::Principal => debt.principal,
        };
        waterfall.apply_to_component(component, due);
    }
    Ok(waterfall.finish())
}

/// split a payment across late fee, interest and principal, in that order
///
/// Raw bucket form used for system-originated payments, which allocate
/// against stored balances without resolving penalties first.
pub fn allocate(
    late_fee_due: Money,
    interest_due: Money,
    principal_due: Money,
    tendered: Money,
) -> Result<AllocationDeltas> {
    ensure_non_negative("tendered amount", tendered)?;
    ensure_non_negative("late fee", late_fee_due)?;
    ensure_non_negative("interest", interest_due)?;
    ensure_non_negative("principal", principal_due)?;

    let mut waterfall = Waterfall::new(tendered);
    waterfall.apply_to_component(PaymentComponent::LateFee, late_fee_due);
    waterfall.apply_to_component(PaymentComponent::Interest, interest_due);
    waterfall.apply_to_component(PaymentComponent::Principal, principal_due);
    Ok(waterfall.finish().to_deltas())
}
