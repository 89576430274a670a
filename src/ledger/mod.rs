//! Idempotent ledger posting.
//!
//! `LedgerWriter` is the only code that mutates installment balances. Every
//! posting is keyed by an idempotency key (usually the payment provider's
//! transaction id) and commits the balance change together with its ledger
//! entry through `LedgerStore::commit`.

pub mod memory;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::decimal::Money;
use crate::errors::{PaymentError, Result};
use crate::payments::AllocationDeltas;
use crate::state::Installment;
use crate::types::{EntryKind, InstallmentId, InstallmentStatus, LoanId};

pub use memory::InMemoryLedger;

/// immutable record of money movement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub idempotency_key: String,
    pub loan_id: LoanId,
    pub installment_id: InstallmentId,
    pub kind: EntryKind,
    /// signed balance changes; negative reduces what is owed
    pub late_fee_delta: Money,
    pub interest_delta: Money,
    pub principal_delta: Money,
    /// signed cash amount; fees are negative
    pub amount: Money,
    pub recorded_at: DateTime<Utc>,
}

/// one payment ready to post
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentPosting {
    pub idempotency_key: String,
    pub loan_id: LoanId,
    pub installment_id: InstallmentId,
    /// installment the deltas were planned from
    pub expected: Installment,
    pub deltas: AllocationDeltas,
    /// late fee owed when the deltas were computed
    pub late_fee_assessed: Money,
    /// day the penalties in `late_fee_assessed` run through
    pub assessed_through: Option<NaiveDate>,
    pub renew_to: Option<NaiveDate>,
    pub paid_at: DateTime<Utc>,
}

/// balance change committed with an entry
#[derive(Debug, Clone, PartialEq)]
pub struct InstallmentUpdate {
    /// snapshot the change was computed from
    pub expected: Installment,
    pub updated: Installment,
}

/// unit of work handed to the store
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerTransaction {
    pub entry: LedgerEntry,
    pub installment: Option<InstallmentUpdate>,
}

/// result of a successful posting
#[derive(Debug, Clone, PartialEq)]
pub struct Posted {
    pub entry: LedgerEntry,
    pub installment: Installment,
}

/// transactional boundary to the system of record
///
/// `commit` must be atomic: it fails with `AlreadyProcessed` when the entry's
/// key exists, with `ConcurrencyConflict` when the stored installment no
/// longer equals `expected`, and otherwise writes both or neither.
pub trait LedgerStore {
    fn find_entry(&self, idempotency_key: &str) -> Result<Option<LedgerEntry>>;

    fn load_installment(&self, installment_id: InstallmentId) -> Result<Installment>;

    fn commit(&self, transaction: LedgerTransaction) -> Result<()>;
}

/// applies allocation deltas at most once per idempotency key
pub struct LedgerWriter<S> {
    store: S,
}

impl<S: LedgerStore> LedgerWriter<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// post a payment; a known key fails with `AlreadyProcessed`
    pub fn apply_payment(&self, posting: &PaymentPosting) -> Result<Posted> {
        if let Some(existing) = self.store.find_entry(&posting.idempotency_key)? {
            info!(
                idempotency_key = posting.idempotency_key.as_str(),
                entry_id = %existing.id,
                "payment already posted"
            );
            return Err(PaymentError::AlreadyProcessed {
                idempotency_key: posting.idempotency_key.clone(),
            });
        }

        if posting.expected.id != posting.installment_id {
            return Err(PaymentError::invalid_input(format!(
                "posting for installment {} planned from installment {}",
                posting.installment_id, posting.expected.id
            )));
        }

        let current = self.store.load_installment(posting.installment_id)?;
        if current.loan_id != posting.loan_id {
            return Err(PaymentError::invalid_input(format!(
                "installment {} does not belong to loan {}",
                current.id, posting.loan_id
            )));
        }
        if current.is_paid() {
            warn!(
                installment_id = %current.id,
                idempotency_key = posting.idempotency_key.as_str(),
                "payment against settled installment rejected"
            );
            return Err(PaymentError::InstallmentAlreadySettled {
                installment_id: current.id,
            });
        }

        if current != posting.expected {
            warn!(
                installment_id = %current.id,
                idempotency_key = posting.idempotency_key.as_str(),
                "installment changed since the payment was planned"
            );
            return Err(PaymentError::ConcurrencyConflict {
                installment_id: current.id,
            });
        }

        let updated = apply_deltas(&current, posting)?;
        let d = &posting.deltas;
        let entry = LedgerEntry {
            id: Uuid::new_v4(),
            idempotency_key: posting.idempotency_key.clone(),
            loan_id: posting.loan_id,
            installment_id: posting.installment_id,
            kind: EntryKind::Payment,
            late_fee_delta: d.late_fee_delta.neg(),
            interest_delta: d.interest_delta.neg(),
            principal_delta: d.principal_delta.neg(),
            amount: d.total_applied(),
            recorded_at: posting.paid_at,
        };

        self.store.commit(LedgerTransaction {
            entry: entry.clone(),
            installment: Some(InstallmentUpdate {
                expected: current,
                updated: updated.clone(),
            }),
        })?;

        info!(
            idempotency_key = entry.idempotency_key.as_str(),
            installment_id = %updated.id,
            amount = %entry.amount,
            status = ?updated.status,
            "payment posted"
        );

        Ok(Posted {
            entry,
            installment: updated,
        })
    }

    /// book a processor fee as a negative entry; installment untouched
    pub fn record_fee(
        &self,
        idempotency_key: &str,
        loan_id: LoanId,
        installment_id: InstallmentId,
        fee: Money,
        recorded_at: DateTime<Utc>,
    ) -> Result<LedgerEntry> {
        if fee.is_negative() {
            return Err(PaymentError::invalid_input(format!("fee {} is negative", fee)));
        }
        if self.store.find_entry(idempotency_key)?.is_some() {
            return Err(PaymentError::AlreadyProcessed {
                idempotency_key: idempotency_key.to_string(),
            });
        }

        let entry = LedgerEntry {
            id: Uuid::new_v4(),
            idempotency_key: idempotency_key.to_string(),
            loan_id,
            installment_id,
            kind: EntryKind::ProcessorFee,
            late_fee_delta: Money::ZERO,
            interest_delta: Money::ZERO,
            principal_delta: Money::ZERO,
            amount: fee.neg(),
            recorded_at,
        };

        self.store.commit(LedgerTransaction {
            entry: entry.clone(),
            installment: None,
        })?;

        info!(
            idempotency_key,
            amount = %entry.amount,
            "processor fee recorded"
        );
        Ok(entry)
    }
}

/// new installment state after a posting; rejects deltas above a bucket
fn apply_deltas(current: &Installment, posting: &PaymentPosting) -> Result<Installment> {
    let d = &posting.deltas;
    let checks = [
        ("late fee", d.late_fee_delta, posting.late_fee_assessed),
        ("interest", d.interest_delta, current.remaining_interest),
        ("principal", d.principal_delta, current.remaining_principal),
    ];
    for (bucket, delta, available) in checks {
        if delta.is_negative() || available.is_negative() {
            return Err(PaymentError::invalid_input(format!(
                "{} delta {} against {} is negative",
                bucket, delta, available
            )));
        }
        if delta > available {
            return Err(PaymentError::invalid_input(format!(
                "{} delta {} exceeds balance {}",
                bucket, delta, available
            )));
        }
    }

    let mut updated = current.clone();
    updated.accrued_late_fee = posting.late_fee_assessed - d.late_fee_delta;
    updated.remaining_interest = current.remaining_interest - d.interest_delta;
    updated.remaining_principal = current.remaining_principal - d.principal_delta;

    if let Some(through) = posting.assessed_through {
        if through > current.due_date {
            updated.fine_assessed = true;
            updated.penalties_assessed_through = Some(through);
        }
    }

    match posting.renew_to {
        Some(next_due) => {
            // a new cycle starts owing a full cycle of interest and no penalties
            updated.due_date = next_due;
            updated.remaining_interest = current.cycle_interest;
            updated.fine_assessed = false;
            updated.penalties_assessed_through = None;
        }
        None if updated.total_outstanding().is_zero() => {
            updated.status = InstallmentStatus::Paid;
        }
        None => {}
    }
    Ok(updated)
}
