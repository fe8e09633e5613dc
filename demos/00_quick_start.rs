/// quick start - minimal example to get started
use peer_lending_rs::{LendingPlatform, Money, Rate, Role, SafeTimeProvider, TimeSource};
use rust_decimal_macros::dec;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let time = SafeTimeProvider::new(TimeSource::System);
    let platform = LendingPlatform::default();

    // a borrower and a lender join the marketplace
    let borrower = platform.register_user("alice", Role::Borrower, Money::from_major(1_000))?;
    let lender = platform.register_user("bob", Role::Lender, Money::from_major(6_000))?;

    // alice asks for $5,000 over 6 months
    let loan = platform.request_loan(borrower, Money::from_major(5_000), 6, &time)?;
    println!("loans open for funding: {}", platform.available_loans().len());

    // bob offers to fund at 15% annual and alice accepts
    let offer = platform.submit_offer(loan.id, lender, Rate::from_percentage(dec!(15)), &time)?;
    platform.accept_offer(offer.id, &time)?;

    // funding debits bob for principal plus the platform fee
    println!("lender balance after funding: ${}", platform.balance_of(lender)?);

    // print the repayment schedule
    let (loan, payments) = platform.loan_details(loan.id)?;
    println!("loan status: {:?}", loan.status);
    for payment in &payments {
        println!(
            "  payment {} due {}: ${}",
            payment.payment_number, payment.due_date, payment.amount
        );
    }

    // full schedule as json
    println!("{}", serde_json::to_string_pretty(&payments)?);

    Ok(())
}
