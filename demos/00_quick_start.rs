/// quick start - resolve a late installment and renew it
use capitalflow_core::chrono::{NaiveDate, TimeZone, Utc};
use capitalflow_core::{
    BillingCycle, CoreConfig, Decimal, Forgiveness, InMemoryLedger, Installment, Loan, Money,
    PaymentService, Rate, SafeTimeProvider, TimeSource,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // monthly loan: 2% fine, 0.5% mora per day late
    let loan = Loan::new(
        BillingCycle::Monthly,
        NaiveDate::from_ymd_opt(2024, 1, 1).ok_or("bad date")?,
        Rate::from_percentage(Decimal::from(2)),
        Rate::from_percentage(Decimal::new(5, 1)),
    );
    let installment = Installment::new(
        loan.id,
        1,
        NaiveDate::from_ymd_opt(2024, 2, 1).ok_or("bad date")?,
        Money::from_major(1_000),
        Money::from_major(50),
    );

    let store = InMemoryLedger::new();
    store.insert_installment(installment.clone());

    // ten days after the due date
    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 2, 11, 9, 0, 0).single().ok_or("bad time")?,
    ));
    let mut service = PaymentService::new(store, time, CoreConfig::default());

    let debt = capitalflow_core::resolve(
        &loan,
        &installment,
        NaiveDate::from_ymd_opt(2024, 2, 11).ok_or("bad date")?,
        Forgiveness::None,
    )?;
    println!("owed: {} (renew for {})", debt.total, debt.renew_amount());

    // default action for monthly loans is renewal
    let outcome = service.pay_installment(
        &loan,
        installment.id,
        Forgiveness::None,
        None,
        debt.renew_amount(),
        "counter-0001",
    )?;
    if let Some(receipt) = outcome.receipt() {
        println!("new due date: {}", receipt.installment.due_date);
    }

    println!("{}", service.store().to_json_pretty()?);
    Ok(())
}
