/// provider webhook - verify the signature, apply once, ignore the retry
use capitalflow_core::chrono::{NaiveDate, Utc};
use capitalflow_core::webhook::{handle_notification, sign, signature_manifest};
use capitalflow_core::{
    BillingCycle, CoreConfig, InMemoryLedger, Installment, Loan, Money, PaymentNotification,
    PaymentService, Rate, SafeTimeProvider, TimeSource, WebhookVerifier,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = CoreConfig {
        webhook_secret: Some("demo-secret".to_string()),
        ..CoreConfig::default()
    };

    let loan = Loan::new(
        BillingCycle::DailyFree,
        NaiveDate::from_ymd_opt(2024, 1, 1).ok_or("bad date")?,
        Rate::ZERO,
        Rate::ZERO,
    );
    let installment = Installment::new(
        loan.id,
        1,
        Utc::now().date_naive(),
        Money::from_major(500),
        Money::from_major(100),
    );
    let store = InMemoryLedger::new();
    store.insert_installment(installment.clone());

    let verifier = WebhookVerifier::from_config(&config)?;
    let mut service = PaymentService::new(store, SafeTimeProvider::new(TimeSource::System), config);

    // what the provider would send
    let ts = Utc::now().timestamp().to_string();
    let digest = sign("demo-secret", &signature_manifest("1319585", "req-1", &ts))?;
    let notification = PaymentNotification {
        payment_id: "1319585".to_string(),
        request_id: "req-1".to_string(),
        signature: format!("ts={},v1={}", ts, digest),
        installment_id: installment.id,
        amount: Money::from_major(150),
    };

    let first = handle_notification(&verifier, &mut service, &loan, &notification)?;
    let retry = handle_notification(&verifier, &mut service, &loan, &notification)?;
    println!("first applied: {}, retry duplicate: {}", !first.is_duplicate(), retry.is_duplicate());

    for event in service.take_events() {
        println!("{:?}", event);
    }
    Ok(())
}
