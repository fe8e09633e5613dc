/// repayment cycle - the recurring job settling a schedule under controlled time
use chrono::{Duration, TimeZone, Utc};
use peer_lending_rs::{LendingPlatform, Money, Rate, Role, SafeTimeProvider, TimeSource};
use rust_decimal_macros::dec;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    println!("=== repayment cycle example ===\n");

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
    ));
    let controller = time.test_control().unwrap();

    let platform = LendingPlatform::default();
    let borrower = platform.register_user("alice", Role::Borrower, Money::from_major(6_000))?;
    let lender = platform.register_user("bob", Role::Lender, Money::from_major(6_000))?;

    // fund a $5,000 loan over 6 months at 15%
    let loan = platform.request_loan(borrower, Money::from_major(5_000), 6, &time)?;
    let offer = platform.submit_offer(loan.id, lender, Rate::from_percentage(dec!(15)), &time)?;
    platform.accept_offer(offer.id, &time)?;
    println!("funded on {}", time.now().format("%Y-%m-%d"));

    let (_, payments) = platform.loan_details(loan.id)?;
    println!("schedule:");
    for payment in &payments {
        println!(
            "  #{} due {}  ${}",
            payment.payment_number, payment.due_date, payment.amount
        );
    }

    // run the recurring job month by month
    for month in 1..=6 {
        controller.advance(Duration::days(32));
        let report = platform.process_due_payments(&time);
        println!(
            "\nmonth {} ({}): {} due, {} settled, {} failed",
            month,
            time.now().format("%Y-%m-%d"),
            report.due_payments,
            report.processed_count(),
            report.failed_count(),
        );
        for loan_id in &report.completed_loans {
            println!("loan {} fully repaid", loan_id);
        }
    }

    let loan = platform.loan(loan.id)?;
    println!("\nfinal status: {:?}", loan.status);
    println!("borrower balance: ${}", platform.balance_of(borrower)?);
    println!("lender balance: ${}", platform.balance_of(lender)?);
    println!("platform revenue: ${}", platform.platform_funds());
    println!("events recorded: {}", platform.take_events().len());

    Ok(())
}
