//! Provider webhook signature verification and payment intake.
//!
//! The provider signs `id:<paymentId>;request-id:<requestId>;ts:<timestamp>;`
//! with HMAC-SHA256 and delivers `ts=<timestamp>,v1=<hex digest>` in the
//! signature header. Nothing reaches the ledger before that check passes.

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::{info, warn};

use crate::config::CoreConfig;
use crate::decimal::Money;
use crate::errors::{PaymentError, Result};
use crate::ledger::LedgerStore;
use crate::service::{PaymentService, PostingOutcome};
use crate::state::Loan;
use crate::types::InstallmentId;

type HmacSha256 = Hmac<Sha256>;

/// signed string for one notification
pub fn signature_manifest(payment_id: &str, request_id: &str, timestamp: &str) -> String {
    format!("id:{};request-id:{};ts:{};", payment_id, request_id, timestamp)
}

/// hex HMAC-SHA256 of `message`
pub fn sign(secret: &str, message: &str) -> Result<String> {
    let mut mac = new_mac(secret)?;
    mac.update(message.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

fn new_mac(secret: &str) -> Result<HmacSha256> {
    HmacSha256::new_from_slice(secret.as_bytes()).map_err(|e| PaymentError::InvalidConfiguration {
        message: format!("webhook secret rejected: {}", e),
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    pub timestamp: String,
    pub v1: String,
}

impl SignatureHeader {
    /// parse `ts=<timestamp>,v1=<hex>`; order and spacing are not significant
    pub fn parse(raw: &str) -> Result<Self> {
        let mut timestamp = None;
        let mut v1 = None;

        for part in raw.split(',') {
            let (key, value) = part
                .split_once('=')
                .ok_or_else(|| invalid_signature(format!("malformed header part '{}'", part.trim())))?;
            match key.trim() {
                "ts" => timestamp = Some(value.trim().to_string()),
                "v1" => v1 = Some(value.trim().to_string()),
                _ => {}
            }
        }

        match (timestamp, v1) {
            (Some(timestamp), Some(v1)) if !timestamp.is_empty() && !v1.is_empty() => {
                Ok(Self { timestamp, v1 })
            }
            _ => Err(invalid_signature("header needs both ts and v1")),
        }
    }
}

fn invalid_signature(message: impl Into<String>) -> PaymentError {
    PaymentError::InvalidSignature {
        message: message.into(),
    }
}

/// checks provider signatures against the shared secret
#[derive(Debug, Clone)]
pub struct WebhookVerifier {
    secret: String,
}

impl WebhookVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    pub fn from_config(config: &CoreConfig) -> Result<Self> {
        Ok(Self::new(config.require_webhook_secret()?))
    }

    /// verify a raw signature header for one payment
    pub fn verify(&self, payment_id: &str, request_id: &str, header: &str) -> Result<SignatureHeader> {
        let header = SignatureHeader::parse(header)?;
        let expected = hex::decode(&header.v1).map_err(|_| invalid_signature("v1 is not hex"))?;

        let manifest = signature_manifest(payment_id, request_id, &header.timestamp);
        let mut mac = new_mac(&self.secret)?;
        mac.update(manifest.as_bytes());
        mac.verify_slice(&expected).map_err(|_| {
            warn!(payment_id, request_id, "webhook signature mismatch");
            invalid_signature("signature mismatch")
        })?;

        Ok(header)
    }
}

/// payment notification after the embedder has looked up the installment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentNotification {
    pub payment_id: String,
    pub request_id: String,
    /// raw `x-signature` style header value
    pub signature: String,
    pub installment_id: InstallmentId,
    pub amount: Money,
}

/// verify then apply; duplicates come back as `PostingOutcome::Duplicate`
pub fn handle_notification<S: LedgerStore>(
    verifier: &WebhookVerifier,
    service: &mut PaymentService<S>,
    loan: &Loan,
    notification: &PaymentNotification,
) -> Result<PostingOutcome> {
    verifier.verify(
        &notification.payment_id,
        &notification.request_id,
        &notification.signature,
    )?;

    info!(
        payment_id = notification.payment_id.as_str(),
        installment_id = %notification.installment_id,
        amount = %notification.amount,
        "webhook payment accepted"
    );

    service.apply_provider_payment(
        loan,
        notification.installment_id,
        &notification.payment_id,
        notification.amount,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Rate;
    use crate::ledger::InMemoryLedger;
    use crate::state::Installment;
    use crate::types::BillingCycle;
    use chrono::{NaiveDate, TimeZone, Utc};
    use hourglass_rs::{SafeTimeProvider, TimeSource};

    const SECRET: &str = "test-webhook-secret";

    fn header_for(payment_id: &str, request_id: &str, ts: &str) -> String {
        let digest = sign(SECRET, &signature_manifest(payment_id, request_id, ts)).unwrap();
        format!("ts={},v1={}", ts, digest)
    }

    #[test]
    fn test_manifest_format() {
        assert_eq!(
            signature_manifest("123", "req-9", "1704067200"),
            "id:123;request-id:req-9;ts:1704067200;"
        );
    }

    #[test]
    fn test_sign_known_vector() {
        // RFC 4231 test case 2
        assert_eq!(
            sign("Jefe", "what do ya want for nothing?").unwrap(),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_parse_header() {
        let header = SignatureHeader::parse("ts=1704067200, v1=abcd").unwrap();
        assert_eq!(header.timestamp, "1704067200");
        assert_eq!(header.v1, "abcd");

        let reordered = SignatureHeader::parse("v1=abcd,ts=1").unwrap();
        assert_eq!(reordered.timestamp, "1");

        assert!(matches!(
            SignatureHeader::parse("ts=1"),
            Err(PaymentError::InvalidSignature { .. })
        ));
        assert!(matches!(
            SignatureHeader::parse("garbage"),
            Err(PaymentError::InvalidSignature { .. })
        ));
    }

    #[test]
    fn test_verify_accepts_valid_signature() {
        let verifier = WebhookVerifier::new(SECRET);
        let header = header_for("555", "req-1", "1704067200");

        let parsed = verifier.verify("555", "req-1", &header).unwrap();
        assert_eq!(parsed.timestamp, "1704067200");
    }

    #[test]
    fn test_verify_rejects_tampering() {
        let verifier = WebhookVerifier::new(SECRET);
        let header = header_for("555", "req-1", "1704067200");

        for (payment_id, request_id) in [("556", "req-1"), ("555", "req-2")] {
            let result = verifier.verify(payment_id, request_id, &header);
            assert!(matches!(result, Err(PaymentError::InvalidSignature { .. })));
        }

        let other = WebhookVerifier::new("another-secret");
        assert!(other.verify("555", "req-1", &header).is_err());

        let not_hex = verifier.verify("555", "req-1", "ts=1704067200,v1=zz");
        assert!(matches!(not_hex, Err(PaymentError::InvalidSignature { .. })));
    }

    #[test]
    fn test_verifier_needs_configured_secret() {
        let result = WebhookVerifier::from_config(&CoreConfig::default());
        assert!(matches!(result, Err(PaymentError::InvalidConfiguration { .. })));

        let config = CoreConfig {
            webhook_secret: Some(SECRET.to_string()),
            ..CoreConfig::default()
        };
        assert!(WebhookVerifier::from_config(&config).is_ok());
    }

    #[test]
    fn test_handle_notification_applies_once() {
        let loan = Loan::new(
            BillingCycle::DailyFree,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            Rate::ZERO,
            Rate::ZERO,
        );
        let inst = Installment::new(
            loan.id,
            1,
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            Money::from_major(500),
            Money::from_major(100),
        );
        let store = InMemoryLedger::new();
        store.insert_installment(inst.clone());
        let time = SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(2024, 1, 20, 9, 0, 0).unwrap(),
        ));
        let mut service = PaymentService::new(store, time, CoreConfig::default());
        let verifier = WebhookVerifier::new(SECRET);

        let notification = PaymentNotification {
            payment_id: "98765".to_string(),
            request_id: "req-abc".to_string(),
            signature: header_for("98765", "req-abc", "1705741200"),
            installment_id: inst.id,
            amount: Money::from_major(100),
        };

        let first = handle_notification(&verifier, &mut service, &loan, &notification).unwrap();
        let receipt = first.receipt().unwrap();
        assert_eq!(receipt.deltas.interest_delta, Money::from_major(100));
        assert_eq!(receipt.installment.remaining_interest, Money::ZERO);

        let retry = handle_notification(&verifier, &mut service, &loan, &notification).unwrap();
        assert!(retry.is_duplicate());
        assert_eq!(service.store().entries().len(), 2);

        let forged = PaymentNotification {
            payment_id: "98766".to_string(),
            ..notification
        };
        let result = handle_notification(&verifier, &mut service, &loan, &forged);
        assert!(matches!(result, Err(PaymentError::InvalidSignature { .. })));
        assert_eq!(service.store().entries().len(), 2);
    }
}
