use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::errors::{PaymentError, Result};
use crate::state::Installment;
use crate::types::InstallmentId;

use super::{LedgerEntry, LedgerStore, LedgerTransaction};

#[derive(Debug, Default)]
struct Inner {
    entries: Vec<LedgerEntry>,
    by_key: HashMap<String, usize>,
    installments: HashMap<InstallmentId, Installment>,
    pending_failures: u32,
}

/// mutex-guarded store; one lock covers check, mutate and insert
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    inner: Mutex<Inner>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner.lock().map_err(|_| PaymentError::UpstreamUnavailable {
            message: "ledger lock poisoned".to_string(),
        })
    }

    /// seed an installment as the schedule generator would
    pub fn insert_installment(&self, installment: Installment) {
        if let Ok(mut inner) = self.lock() {
            inner.installments.insert(installment.id, installment);
        }
    }

    pub fn installment(&self, id: InstallmentId) -> Option<Installment> {
        self.lock().ok().and_then(|inner| inner.installments.get(&id).cloned())
    }

    /// entries in insertion order
    pub fn entries(&self) -> Vec<LedgerEntry> {
        self.lock().map(|inner| inner.entries.clone()).unwrap_or_default()
    }

    /// ledger as a JSON array of entries
    pub fn to_json_pretty(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.entries())
    }

    /// make the next `count` commits fail as if the backend were down
    #[cfg(test)]
    pub(crate) fn inject_unavailable(&self, count: u32) {
        if let Ok(mut inner) = self.lock() {
            inner.pending_failures = count;
        }
    }
}

impl LedgerStore for InMemoryLedger {
    fn find_entry(&self, idempotency_key: &str) -> Result<Option<LedgerEntry>> {
        let inner = self.lock()?;
        Ok(inner
            .by_key
            .get(idempotency_key)
            .map(|&index| inner.entries[index].clone()))
    }

    fn load_installment(&self, installment_id: InstallmentId) -> Result<Installment> {
        self.lock()?
            .installments
            .get(&installment_id)
            .cloned()
            .ok_or(PaymentError::InstallmentNotFound { installment_id })
    }

    fn commit(&self, transaction: LedgerTransaction) -> Result<()> {
        let mut inner = self.lock()?;

        if inner.pending_failures > 0 {
            inner.pending_failures -= 1;
            return Err(PaymentError::UpstreamUnavailable {
                message: "simulated backend outage".to_string(),
            });
        }

        let key = transaction.entry.idempotency_key.clone();
        if inner.by_key.contains_key(&key) {
            return Err(PaymentError::AlreadyProcessed { idempotency_key: key });
        }

        if let Some(update) = &transaction.installment {
            let stored = inner
                .installments
                .get(&update.expected.id)
                .ok_or(PaymentError::InstallmentNotFound {
                    installment_id: update.expected.id,
                })?;
            if *stored != update.expected {
                return Err(PaymentError::ConcurrencyConflict {
                    installment_id: update.expected.id,
                });
            }
        }

        // all checks passed; nothing below can fail
        if let Some(update) = transaction.installment {
            inner.installments.insert(update.updated.id, update.updated);
        }
        let index = inner.entries.len();
        inner.entries.push(transaction.entry);
        inner.by_key.insert(key, index);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Money;
    use crate::ledger::InstallmentUpdate;
    use crate::types::EntryKind;
    use chrono::{NaiveDate, Utc};
    use uuid::Uuid;

    fn installment() -> Installment {
        Installment::new(
            Uuid::new_v4(),
            1,
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            Money::from_major(100),
            Money::from_major(10),
        )
    }

    fn entry(key: &str, inst: &Installment) -> LedgerEntry {
        LedgerEntry {
            id: Uuid::new_v4(),
            idempotency_key: key.to_string(),
            loan_id: inst.loan_id,
            installment_id: inst.id,
            kind: EntryKind::Payment,
            late_fee_delta: Money::ZERO,
            interest_delta: Money::from_major(-10),
            principal_delta: Money::ZERO,
            amount: Money::from_major(10),
            recorded_at: Utc::now(),
        }
    }

    #[test]
    fn test_stale_snapshot_conflicts() {
        let store = InMemoryLedger::new();
        let inst = installment();
        store.insert_installment(inst.clone());

        let mut first = inst.clone();
        first.remaining_interest = Money::ZERO;
        store
            .commit(LedgerTransaction {
                entry: entry("a", &inst),
                installment: Some(InstallmentUpdate {
                    expected: inst.clone(),
                    updated: first.clone(),
                }),
            })
            .unwrap();

        // second writer computed from the pre-commit snapshot
        let result = store.commit(LedgerTransaction {
            entry: entry("b", &inst),
            installment: Some(InstallmentUpdate {
                expected: inst.clone(),
                updated: first,
            }),
        });
        assert!(matches!(result, Err(PaymentError::ConcurrencyConflict { .. })));
        assert_eq!(store.entries().len(), 1);
        assert!(store.find_entry("b").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_key_rejected_at_commit() {
        let store = InMemoryLedger::new();
        let inst = installment();
        store.insert_installment(inst.clone());

        store
            .commit(LedgerTransaction { entry: entry("k", &inst), installment: None })
            .unwrap();
        let again = store.commit(LedgerTransaction { entry: entry("k", &inst), installment: None });

        assert!(matches!(again, Err(PaymentError::AlreadyProcessed { .. })));
        assert_eq!(store.entries().len(), 1);
    }

    #[test]
    fn test_missing_installment() {
        let store = InMemoryLedger::new();
        let result = store.load_installment(Uuid::new_v4());
        assert!(matches!(result, Err(PaymentError::InstallmentNotFound { .. })));
    }

    #[test]
    fn test_json_export() {
        let store = InMemoryLedger::new();
        let inst = installment();
        store
            .commit(LedgerTransaction { entry: entry("json-1", &inst), installment: None })
            .unwrap();

        let json = store.to_json_pretty().unwrap();
        let parsed: Vec<LedgerEntry> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].idempotency_key, "json-1");
        assert!(json.contains("\"Payment\""));
    }
}
