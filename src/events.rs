use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::{Forgiveness, InstallmentId, LoanId, SettlementAction};

/// all events emitted while processing payments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    PaymentApplied {
        loan_id: LoanId,
        installment_id: InstallmentId,
        idempotency_key: String,
        action: SettlementAction,
        forgiveness: Forgiveness,
        applied_to_late_fee: Money,
        applied_to_interest: Money,
        applied_to_principal: Money,
        timestamp: DateTime<Utc>,
    },
    PenaltyWaived {
        installment_id: InstallmentId,
        fine: Money,
        daily_mora: Money,
        timestamp: DateTime<Utc>,
    },
    InstallmentRenewed {
        installment_id: InstallmentId,
        old_due_date: NaiveDate,
        new_due_date: NaiveDate,
        timestamp: DateTime<Utc>,
    },
    InstallmentSettled {
        loan_id: LoanId,
        installment_id: InstallmentId,
        timestamp: DateTime<Utc>,
    },
    DuplicatePaymentIgnored {
        installment_id: InstallmentId,
        idempotency_key: String,
        timestamp: DateTime<Utc>,
    },
    ProcessorFeeCharged {
        loan_id: LoanId,
        idempotency_key: String,
        fee: Money,
        timestamp: DateTime<Utc>,
    },
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }
}
