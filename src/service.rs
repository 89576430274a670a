//! Payment entry points shared by the operator screen and the provider webhook.

use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::CoreConfig;
use crate::decimal::Money;
use crate::errors::{PaymentError, Result};
use crate::events::{Event, EventStore};
use crate::ledger::{LedgerEntry, LedgerStore, LedgerWriter, PaymentPosting, Posted};
use crate::payments::{allocate, validate_tender, AllocationDeltas, ProcessorFeePolicy, SettlementPlanner};
use crate::state::{Installment, Loan};
use crate::types::{Forgiveness, InstallmentId, SettlementAction};

/// what happened to one payment request
#[derive(Debug, Clone, PartialEq)]
pub enum PostingOutcome {
    Applied(PaymentReceipt),
    /// the key was already posted; nothing changed
    Duplicate { idempotency_key: String },
}

impl PostingOutcome {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, PostingOutcome::Duplicate { .. })
    }

    pub fn receipt(&self) -> Option<&PaymentReceipt> {
        match self {
            PostingOutcome::Applied(receipt) => Some(receipt),
            PostingOutcome::Duplicate { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub entry: LedgerEntry,
    pub installment: Installment,
    pub deltas: AllocationDeltas,
    /// processor fee booked for automated payments
    pub fee_entry: Option<LedgerEntry>,
}

pub struct PaymentService<S> {
    writer: LedgerWriter<S>,
    planner: SettlementPlanner,
    time: SafeTimeProvider,
    config: CoreConfig,
    events: EventStore,
}

impl<S: LedgerStore> PaymentService<S> {
    pub fn new(store: S, time: SafeTimeProvider, config: CoreConfig) -> Self {
        Self {
            writer: LedgerWriter::new(store),
            planner: SettlementPlanner::new(),
            time,
            config,
            events: EventStore::new(),
        }
    }

    pub fn store(&self) -> &S {
        self.writer.store()
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn time(&self) -> &SafeTimeProvider {
        &self.time
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        self.events.take_events()
    }

    /// operator payment: resolve debt, apply the chosen action, post it
    pub fn pay_installment(
        &mut self,
        loan: &Loan,
        installment_id: InstallmentId,
        forgiveness: Forgiveness,
        action: Option<SettlementAction>,
        tendered: Money,
        idempotency_key: &str,
    ) -> Result<PostingOutcome> {
        if let Some(outcome) = self.check_duplicate(installment_id, idempotency_key)? {
            return Ok(outcome);
        }

        let now = self.time.now();
        let installment = self.writer.store().load_installment(installment_id)?;
        let plan = self.planner.plan(
            loan,
            &installment,
            now.date_naive(),
            forgiveness,
            action,
            tendered,
        )?;

        debug!(
            installment_id = %installment_id,
            action = ?plan.action,
            forgiveness = ?forgiveness,
            days_late = plan.breakdown.days_late,
            total_due = %plan.breakdown.total,
            "settlement planned"
        );

        let posting = PaymentPosting {
            idempotency_key: idempotency_key.to_string(),
            loan_id: loan.id,
            installment_id,
            expected: installment.clone(),
            deltas: plan.deltas,
            late_fee_assessed: plan.late_fee_assessed,
            assessed_through: plan.assessed_through,
            renew_to: plan.renew_to,
            paid_at: now,
        };

        let posted = match self.post(&posting)? {
            Some(posted) => posted,
            None => return Ok(self.duplicate(installment_id, idempotency_key)),
        };

        self.events.emit(Event::PaymentApplied {
            loan_id: loan.id,
            installment_id,
            idempotency_key: idempotency_key.to_string(),
            action: plan.action,
            forgiveness,
            applied_to_late_fee: plan.deltas.late_fee_delta,
            applied_to_interest: plan.deltas.interest_delta,
            applied_to_principal: plan.deltas.principal_delta,
            timestamp: now,
        });

        if !plan.breakdown.waived_fine.is_zero() || !plan.breakdown.waived_mora.is_zero() {
            self.events.emit(Event::PenaltyWaived {
                installment_id,
                fine: plan.breakdown.waived_fine,
                daily_mora: plan.breakdown.waived_mora,
                timestamp: now,
            });
        }

        if let Some(new_due_date) = plan.renew_to {
            info!(
                installment_id = %installment_id,
                old_due_date = %installment.due_date,
                new_due_date = %new_due_date,
                "installment renewed"
            );
            self.events.emit(Event::InstallmentRenewed {
                installment_id,
                old_due_date: installment.due_date,
                new_due_date,
                timestamp: now,
            });
        }

        self.emit_settled(loan, &posted);

        Ok(PostingOutcome::Applied(PaymentReceipt {
            entry: posted.entry,
            installment: posted.installment,
            deltas: plan.deltas,
            fee_entry: None,
        }))
    }

    /// automated payment reported by the provider
    ///
    /// Allocates against the stored balances with no forgiveness, then books
    /// the processor fee under `<payment_id>_PROFIT`. Money left after every
    /// bucket is paid stays in `deltas.unapplied` since the provider has
    /// already collected it. A retry of a posted payment still books a fee
    /// that failed to commit the first time.
    pub fn apply_provider_payment(
        &mut self,
        loan: &Loan,
        installment_id: InstallmentId,
        payment_id: &str,
        amount: Money,
    ) -> Result<PostingOutcome> {
        validate_tender(amount)?;
        if let Some(outcome) = self.check_duplicate(installment_id, payment_id)? {
            self.charge_processor_fee(loan, installment_id, payment_id, amount)?;
            return Ok(outcome);
        }

        let now = self.time.now();
        let installment = self.writer.store().load_installment(installment_id)?;
        if installment.is_paid() {
            warn!(
                installment_id = %installment_id,
                payment_id,
                "provider payment for settled installment"
            );
            return Err(PaymentError::InstallmentAlreadySettled { installment_id });
        }

        let deltas = allocate(
            installment.accrued_late_fee,
            installment.remaining_interest,
            installment.remaining_principal,
            amount,
        )?;
        if deltas.unapplied.is_positive() {
            warn!(
                installment_id = %installment_id,
                payment_id,
                unapplied = %deltas.unapplied,
                "provider payment exceeds balance"
            );
        }

        let posting = PaymentPosting {
            idempotency_key: payment_id.to_string(),
            loan_id: loan.id,
            installment_id,
            expected: installment.clone(),
            deltas,
            late_fee_assessed: installment.accrued_late_fee,
            assessed_through: None,
            renew_to: None,
            paid_at: now,
        };

        let posted = match self.post(&posting)? {
            Some(posted) => posted,
            None => {
                let outcome = self.duplicate(installment_id, payment_id);
                self.charge_processor_fee(loan, installment_id, payment_id, amount)?;
                return Ok(outcome);
            }
        };

        self.events.emit(Event::PaymentApplied {
            loan_id: loan.id,
            installment_id,
            idempotency_key: payment_id.to_string(),
            action: SettlementAction::Partial,
            forgiveness: Forgiveness::None,
            applied_to_late_fee: deltas.late_fee_delta,
            applied_to_interest: deltas.interest_delta,
            applied_to_principal: deltas.principal_delta,
            timestamp: now,
        });
        self.emit_settled(loan, &posted);

        let fee_entry = self.charge_processor_fee(loan, installment_id, payment_id, amount)?;

        Ok(PostingOutcome::Applied(PaymentReceipt {
            entry: posted.entry,
            installment: posted.installment,
            deltas,
            fee_entry,
        }))
    }

    fn charge_processor_fee(
        &mut self,
        loan: &Loan,
        installment_id: InstallmentId,
        payment_id: &str,
        amount: Money,
    ) -> Result<Option<LedgerEntry>> {
        if !self.config.charge_processor_fee {
            return Ok(None);
        }
        let fee = self.config.processor_fee.fee_for(amount);
        if fee.is_zero() {
            return Ok(None);
        }

        let key = ProcessorFeePolicy::derived_key(payment_id);
        let now = self.time.now();
        match self.writer.record_fee(&key, loan.id, installment_id, fee, now) {
            Ok(entry) => {
                self.events.emit(Event::ProcessorFeeCharged {
                    loan_id: loan.id,
                    idempotency_key: key,
                    fee,
                    timestamp: now,
                });
                Ok(Some(entry))
            }
            Err(e) if e.is_success_equivalent() => {
                debug!(idempotency_key = key.as_str(), "processor fee already recorded");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// `None` when the writer reports the key as already posted
    fn post(&self, posting: &PaymentPosting) -> Result<Option<Posted>> {
        match self.writer.apply_payment(posting) {
            Ok(posted) => Ok(Some(posted)),
            Err(e) if e.is_success_equivalent() => Ok(None),
            Err(e) => {
                if e.is_retryable() {
                    warn!(
                        idempotency_key = posting.idempotency_key.as_str(),
                        error = %e,
                        "posting failed, safe to retry"
                    );
                }
                Err(e)
            }
        }
    }

    fn check_duplicate(
        &mut self,
        installment_id: InstallmentId,
        idempotency_key: &str,
    ) -> Result<Option<PostingOutcome>> {
        if self.writer.store().find_entry(idempotency_key)?.is_some() {
            return Ok(Some(self.duplicate(installment_id, idempotency_key)));
        }
        Ok(None)
    }

    fn duplicate(&mut self, installment_id: InstallmentId, idempotency_key: &str) -> PostingOutcome {
        info!(
            installment_id = %installment_id,
            idempotency_key,
            "duplicate payment ignored"
        );
        self.events.emit(Event::DuplicatePaymentIgnored {
            installment_id,
            idempotency_key: idempotency_key.to_string(),
            timestamp: self.time.now(),
        });
        PostingOutcome::Duplicate {
            idempotency_key: idempotency_key.to_string(),
        }
    }

    fn emit_settled(&mut self, loan: &Loan, posted: &Posted) {
        if posted.installment.is_paid() {
            self.events.emit(Event::InstallmentSettled {
                loan_id: loan.id,
                installment_id: posted.installment.id,
                timestamp: posted.entry.recorded_at,
            });
        }
    }
}
