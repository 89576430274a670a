use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// unique identifier for a loan
pub type LoanId = Uuid;

/// unique identifier for an installment
pub type InstallmentId = Uuid;

/// repayment structure of a loan
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BillingCycle {
    /// one installment per calendar month
    Monthly,
    /// open-ended daily loan, interest charged per 30-day cycle
    DailyFree,
    /// daily installments over a pre-agreed term and total
    DailyFixedTerm,
    /// kind not known to this crate, kept verbatim
    Unknown(String),
}

impl BillingCycle {
    /// wire label as stored by the backend
    pub fn as_str(&self) -> &str {
        match self {
            BillingCycle::Monthly => "MONTHLY",
            BillingCycle::DailyFree => "DAILY_FREE",
            BillingCycle::DailyFixedTerm => "DAILY_FIXED_TERM",
            BillingCycle::Unknown(raw) => raw.as_str(),
        }
    }
}

impl FromStr for BillingCycle {
    type Err = std::convert::Infallible;

    /// legacy daily labels collapse into `DailyFree`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_uppercase().as_str() {
            "MONTHLY" => BillingCycle::Monthly,
            "DAILY_FREE" | "DAILY_30_INTEREST" | "DAILY_30_CAPITAL" | "DAILY_FIXED" => {
                BillingCycle::DailyFree
            }
            "DAILY_FIXED_TERM" => BillingCycle::DailyFixedTerm,
            _ => BillingCycle::Unknown(s.to_string()),
        })
    }
}

impl fmt::Display for BillingCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// stored installment status; lateness is derived, never stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstallmentStatus {
    Open,
    Paid,
}

/// status as seen on a given day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DerivedStatus {
    Open,
    Late,
    Paid,
}

/// per-payment operator override of late penalties
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Forgiveness {
    #[default]
    None,
    /// zero the flat fine
    FineOnly,
    /// zero the daily mora; cycle interest is still owed
    InterestOnly,
    Both,
}

impl Forgiveness {
    pub fn waives_fine(&self) -> bool {
        matches!(self, Forgiveness::FineOnly | Forgiveness::Both)
    }

    pub fn waives_mora(&self) -> bool {
        matches!(self, Forgiveness::InterestOnly | Forgiveness::Both)
    }
}

/// how an operator settles an installment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettlementAction {
    /// pay penalties and cycle interest, push the due date one cycle
    RenewInterest,
    /// pay everything owed
    Full,
    /// pay any amount through the waterfall
    Partial,
}

/// kind of ledger movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    Payment,
    ProcessorFee,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_billing_labels_normalize() {
        for label in ["DAILY_30_INTEREST", "DAILY_30_CAPITAL", "DAILY_FIXED", "daily_free"] {
            assert_eq!(label.parse::<BillingCycle>().unwrap(), BillingCycle::DailyFree);
        }
        assert_eq!("MONTHLY".parse::<BillingCycle>().unwrap(), BillingCycle::Monthly);
        assert_eq!(
            "DAILY_FIXED_TERM".parse::<BillingCycle>().unwrap(),
            BillingCycle::DailyFixedTerm
        );
    }

    #[test]
    fn test_unknown_billing_label_kept() {
        let kind: BillingCycle = "WEEKLY".parse().unwrap();
        assert_eq!(kind, BillingCycle::Unknown("WEEKLY".to_string()));
        assert_eq!(kind.to_string(), "WEEKLY");
    }

    #[test]
    fn test_forgiveness_buckets() {
        assert!(!Forgiveness::None.waives_fine() && !Forgiveness::None.waives_mora());
        assert!(Forgiveness::FineOnly.waives_fine() && !Forgiveness::FineOnly.waives_mora());
        assert!(!Forgiveness::InterestOnly.waives_fine() && Forgiveness::InterestOnly.waives_mora());
        assert!(Forgiveness::Both.waives_fine() && Forgiveness::Both.waives_mora());
    }
}
