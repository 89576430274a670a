use thiserror::Error;
use uuid::Uuid;

use crate::decimal::Money;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PaymentError {
    #[error("invalid input: {message}")]
    InvalidInput {
        message: String,
    },

    #[error("payment already processed: {idempotency_key}")]
    AlreadyProcessed {
        idempotency_key: String,
    },

    #[error("installment already settled: {installment_id}")]
    InstallmentAlreadySettled {
        installment_id: Uuid,
    },

    #[error("installment not found: {installment_id}")]
    InstallmentNotFound {
        installment_id: Uuid,
    },

    #[error("overpayment: {unapplied} left after settling every bucket")]
    Overpayment {
        unapplied: Money,
    },

    #[error("concurrent update on installment {installment_id}")]
    ConcurrencyConflict {
        installment_id: Uuid,
    },

    #[error("ledger store unavailable: {message}")]
    UpstreamUnavailable {
        message: String,
    },

    #[error("invalid webhook signature: {message}")]
    InvalidSignature {
        message: String,
    },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
    },
}

impl PaymentError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        PaymentError::InvalidInput {
            message: message.into(),
        }
    }

    /// transient failures that may be retried with the same idempotency key
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaymentError::UpstreamUnavailable { .. } | PaymentError::ConcurrencyConflict { .. }
        )
    }

    /// webhook retries treat an already applied key as done
    pub fn is_success_equivalent(&self) -> bool {
        matches!(self, PaymentError::AlreadyProcessed { .. })
    }
}

pub type Result<T> = std::result::Result<T, PaymentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_classification() {
        let id = Uuid::new_v4();

        assert!(PaymentError::UpstreamUnavailable { message: "timeout".into() }.is_retryable());
        assert!(PaymentError::ConcurrencyConflict { installment_id: id }.is_retryable());
        assert!(!PaymentError::InstallmentAlreadySettled { installment_id: id }.is_retryable());
        assert!(!PaymentError::invalid_input("negative principal").is_retryable());

        assert!(PaymentError::AlreadyProcessed { idempotency_key: "mp-1".into() }.is_success_equivalent());
        assert!(!PaymentError::Overpayment { unapplied: Money::from_major(5) }.is_success_equivalent());
    }
}
