pub mod config;
pub mod decimal;
pub mod errors;
pub mod events;
pub mod interest;
pub mod ledger;
pub mod payments;
pub mod policy;
pub mod service;
pub mod state;
pub mod types;
pub mod webhook;

// re-export key types
pub use config::CoreConfig;
pub use decimal::{Money, Rate};
pub use errors::{PaymentError, Result};
pub use events::{Event, EventStore};
pub use interest::{resolve, DebtBreakdown, DebtResolver, PenaltyConfig, PenaltyEngine};
pub use ledger::{InMemoryLedger, LedgerEntry, LedgerStore, LedgerWriter, PaymentPosting};
pub use payments::{
    allocate, allocate_breakdown, AllocationDeltas, BreakdownAllocation, ProcessorFeePolicy,
    SettlementPlan, SettlementPlanner,
};
pub use policy::{config_for, renewal_due_date, ModalityConfig};
pub use service::{PaymentReceipt, PaymentService, PostingOutcome};
pub use state::{Installment, Loan};
pub use types::{
    BillingCycle, DerivedStatus, EntryKind, Forgiveness, InstallmentId, InstallmentStatus, LoanId,
    SettlementAction,
};
pub use webhook::{PaymentNotification, SignatureHeader, WebhookVerifier};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
