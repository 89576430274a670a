use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::{Money, Rate};
use crate::errors::{PaymentError, Result};
use crate::types::{BillingCycle, DerivedStatus, InstallmentId, InstallmentStatus, LoanId};

/// credit contract as read from the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    pub id: LoanId,
    pub billing_cycle: BillingCycle,
    pub start_date: NaiveDate,
    /// flat penalty charged once per late installment
    pub fine_rate: Rate,
    /// mora charged per day late
    pub daily_interest_rate: Rate,
    /// agreed total, fixed-term daily loans only
    pub total_to_receive: Money,
    pub term_days: Option<u32>,
}

impl Loan {
    pub fn new(
        billing_cycle: BillingCycle,
        start_date: NaiveDate,
        fine_rate: Rate,
        daily_interest_rate: Rate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            billing_cycle,
            start_date,
            fine_rate,
            daily_interest_rate,
            total_to_receive: Money::ZERO,
            term_days: None,
        }
    }

    /// fixed-term daily loan with a pre-agreed total
    pub fn fixed_term(
        start_date: NaiveDate,
        fine_rate: Rate,
        daily_interest_rate: Rate,
        total_to_receive: Money,
        term_days: u32,
    ) -> Self {
        Self {
            total_to_receive,
            term_days: Some(term_days),
            ..Self::new(BillingCycle::DailyFixedTerm, start_date, fine_rate, daily_interest_rate)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.fine_rate.is_negative() {
            return Err(PaymentError::invalid_input(format!(
                "loan {}: fine rate {} is negative",
                self.id, self.fine_rate
            )));
        }
        if self.daily_interest_rate.is_negative() {
            return Err(PaymentError::invalid_input(format!(
                "loan {}: daily interest rate {} is negative",
                self.id, self.daily_interest_rate
            )));
        }
        if self.total_to_receive.is_negative() {
            return Err(PaymentError::invalid_input(format!(
                "loan {}: total to receive {} is negative",
                self.id, self.total_to_receive
            )));
        }
        Ok(())
    }

    /// value of one daily installment on a fixed-term loan
    pub fn daily_installment_value(&self) -> Result<Money> {
        if self.billing_cycle != BillingCycle::DailyFixedTerm {
            return Err(PaymentError::invalid_input(format!(
                "loan {} is {}, not a fixed-term daily loan",
                self.id, self.billing_cycle
            )));
        }
        match self.term_days {
            Some(days) if days > 0 => {
                Ok(Money::from_decimal(self.total_to_receive.as_decimal() / Decimal::from(days)))
            }
            _ => Err(PaymentError::invalid_input(format!(
                "loan {} has no term in days",
                self.id
            ))),
        }
    }
}

/// one scheduled obligation of a loan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Installment {
    pub id: InstallmentId,
    pub loan_id: LoanId,
    pub due_date: NaiveDate,
    pub sequence: u32,
    pub remaining_principal: Money,
    pub remaining_interest: Money,
    /// interest owed for one full cycle; a renewal re-arms this amount
    pub cycle_interest: Money,
    /// penalties assessed at an earlier posting and not yet paid
    pub accrued_late_fee: Money,
    /// the flat fine has been charged for the current due date
    #[serde(default)]
    pub fine_assessed: bool,
    /// last day mora has been charged for
    #[serde(default)]
    pub penalties_assessed_through: Option<NaiveDate>,
    pub status: InstallmentStatus,
}

impl Installment {
    pub fn new(
        loan_id: LoanId,
        sequence: u32,
        due_date: NaiveDate,
        principal: Money,
        interest: Money,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            loan_id,
            due_date,
            sequence,
            remaining_principal: principal,
            remaining_interest: interest,
            cycle_interest: interest,
            accrued_late_fee: Money::ZERO,
            fine_assessed: false,
            penalties_assessed_through: None,
            status: InstallmentStatus::Open,
        }
    }

    /// reject negative balances instead of coercing them
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("remaining principal", self.remaining_principal),
            ("remaining interest", self.remaining_interest),
            ("cycle interest", self.cycle_interest),
            ("accrued late fee", self.accrued_late_fee),
        ];
        for (name, value) in fields {
            if value.is_negative() {
                return Err(PaymentError::invalid_input(format!(
                    "installment {}: {} {} is negative",
                    self.id, name, value
                )));
            }
        }
        Ok(())
    }

    pub fn is_paid(&self) -> bool {
        self.status == InstallmentStatus::Paid
    }

    /// whole calendar days past due, zero when not yet due
    pub fn days_late(&self, today: NaiveDate) -> u32 {
        let days = (today - self.due_date).num_days();
        days.max(0) as u32
    }

    /// late days no earlier posting has charged mora for
    pub fn unassessed_days_late(&self, today: NaiveDate) -> u32 {
        let from = match self.penalties_assessed_through {
            Some(through) if through > self.due_date => through,
            _ => self.due_date,
        };
        (today - from).num_days().max(0) as u32
    }

    pub fn derived_status(&self, today: NaiveDate) -> DerivedStatus {
        match self.status {
            InstallmentStatus::Paid => DerivedStatus::Paid,
            InstallmentStatus::Open if self.days_late(today) > 0 => DerivedStatus::Late,
            InstallmentStatus::Open => DerivedStatus::Open,
        }
    }

    /// stored balance, late fee included
    pub fn total_outstanding(&self) -> Money {
        self.remaining_principal + self.remaining_interest + self.accrued_late_fee
    }
}
