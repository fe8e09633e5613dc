use chrono::{DateTime, Utc};
use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::errors::{LendingError, Result};
use crate::events::Event;
use crate::schedule::Payment;
use crate::store::{PlatformState, Store};
use crate::types::{LoanId, LoanStatus, PaymentId, PaymentStatus};

/// cadence the external scheduler is expected to invoke `run` at
pub const RUN_INTERVAL: std::time::Duration = std::time::Duration::from_secs(3600);

/// outcome of settling one payment
#[derive(Debug, Clone)]
pub enum SettlementOutcome {
    /// funds moved and the payment is now paid
    Applied {
        payment: Payment,
        loan_completed: bool,
    },
    /// the payment was already paid; nothing changed
    AlreadyPaid { payment: Payment },
}

impl SettlementOutcome {
    pub fn payment(&self) -> &Payment {
        match self {
            SettlementOutcome::Applied { payment, .. } => payment,
            SettlementOutcome::AlreadyPaid { payment } => payment,
        }
    }
}

/// one failed settlement inside a processor run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedSettlement {
    pub payment: PaymentId,
    pub loan: LoanId,
    pub reason: String,
}

/// summary of one processor run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepaymentRunReport {
    pub started_at: DateTime<Utc>,
    /// payments that were due when the scan ran
    pub due_payments: usize,
    pub processed: Vec<PaymentId>,
    pub failed: Vec<FailedSettlement>,
    pub completed_loans: Vec<LoanId>,
}

impl RepaymentRunReport {
    pub fn processed_count(&self) -> usize {
        self.processed.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }
}

/// Settle one payment inside an open transaction.
///
/// Debits the borrower for the full installment, credits the lender their
/// share, collects the fee share into the platform treasury, and marks the
/// payment paid. The loan completes when its last pending payment settles.
/// Settling an already-paid payment is a no-op, not an error.
pub(crate) fn settle_payment(
    state: &mut PlatformState,
    payment_id: PaymentId,
    now: DateTime<Utc>,
) -> Result<SettlementOutcome> {
    let payment = state.payment(payment_id)?.clone();
    if payment.is_paid() {
        return Ok(SettlementOutcome::AlreadyPaid { payment });
    }

    let loan = state.loan(payment.loan_id)?.clone();
    // a pending payment only exists on a funded loan
    let lender = loan.lender.ok_or(LendingError::LoanNotPending {
        status: loan.status,
    })?;

    state.ledger.debit(loan.borrower, payment.amount)?;
    state.ledger.credit(lender, payment.lender_share)?;
    state.ledger.credit_platform(payment.platform_fee_share);

    let paid = {
        let payment = state.payment_mut(payment_id)?;
        payment.status = PaymentStatus::Paid;
        payment.paid_at = Some(now);
        payment.clone()
    };
    state.events.emit(Event::PaymentSettled {
        payment: paid.id,
        loan: loan.id,
        amount: paid.amount,
        platform_fee_share: paid.platform_fee_share,
        lender_share: paid.lender_share,
        timestamp: now,
    });

    let loan_completed = state.pending_payment_count(loan.id) == 0;
    if loan_completed {
        state.loan_mut(loan.id)?.complete()?;
        state.events.emit(Event::LoanCompleted {
            loan: loan.id,
            timestamp: now,
        });
    }

    Ok(SettlementOutcome::Applied {
        payment: paid,
        loan_completed,
    })
}

/// Recurring job that settles due payments.
///
/// Runs on a fixed cadence driven by an external scheduler; see
/// [`RUN_INTERVAL`].
#[derive(Debug, Default)]
pub struct RepaymentProcessor;

impl RepaymentProcessor {
    pub fn new() -> Self {
        Self
    }

    /// Scan for pending payments on funded loans due on or before today
    /// and settle each one in its own transaction.
    ///
    /// A borrower who cannot cover an installment is reported and
    /// skipped, never blocking the rest of the run. Rerunning after an
    /// interruption is safe: committed settlements stay committed, and
    /// the scan simply picks up whatever is still pending.
    pub fn run(&self, store: &Store, time: &SafeTimeProvider) -> RepaymentRunReport {
        let now = time.now();
        let today = now.date_naive();

        let mut due: Vec<_> = store.read(|state| {
            state
                .payments
                .values()
                .filter(|payment| {
                    payment.status == PaymentStatus::Pending
                        && payment.due_date <= today
                        && state
                            .loans
                            .get(&payment.loan_id)
                            .map_or(false, |loan| loan.status == LoanStatus::Funded)
                })
                .map(|payment| {
                    (
                        payment.due_date,
                        payment.payment_number,
                        payment.id,
                        payment.loan_id,
                    )
                })
                .collect()
        });
        due.sort();

        let mut report = RepaymentRunReport {
            started_at: now,
            due_payments: due.len(),
            processed: Vec::new(),
            failed: Vec::new(),
            completed_loans: Vec::new(),
        };
        info!(due = report.due_payments, "repayment scan started");

        for (_, _, payment_id, loan_id) in due {
            match store.transaction(|state| settle_payment(state, payment_id, now)) {
                Ok(SettlementOutcome::Applied { loan_completed, .. }) => {
                    report.processed.push(payment_id);
                    if loan_completed {
                        report.completed_loans.push(loan_id);
                        info!(%loan_id, "loan completed");
                    }
                }
                // settled by a concurrent caller between the scan and here
                Ok(SettlementOutcome::AlreadyPaid { .. }) => {}
                Err(error) => {
                    warn!(%payment_id, %error, "settlement failed, payment left pending");
                    store.write(|state| {
                        state.events.emit(Event::PaymentFailed {
                            payment: payment_id,
                            loan: loan_id,
                            reason: error.to_string(),
                            timestamp: now,
                        });
                    });
                    report.failed.push(FailedSettlement {
                        payment: payment_id,
                        loan: loan_id,
                        reason: error.to_string(),
                    });
                }
            }
        }

        info!(
            processed = report.processed_count(),
            failed = report.failed_count(),
            completed = report.completed_loans.len(),
            "repayment run finished"
        );

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::{Money, Rate};
    use crate::loan::Loan;
    use crate::offers;
    use crate::types::Role;
    use chrono::{Duration, TimeZone};
    use hourglass_rs::TimeSource;
    use rust_decimal_macros::dec;

    fn test_time() -> SafeTimeProvider {
        SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap(),
        ))
    }

    struct Setup {
        store: Store,
        borrower: crate::types::UserId,
        lender: crate::types::UserId,
        loan_id: LoanId,
    }

    fn funded_loan(
        time: &SafeTimeProvider,
        borrower_balance: Money,
        principal: Money,
        period_months: u32,
    ) -> Setup {
        let store = Store::new();
        let now = time.now();
        let (borrower, lender, loan_id) = store
            .transaction(|state| {
                let borrower =
                    state
                        .ledger
                        .open_account("borrower", Role::Borrower, borrower_balance)?;
                let lender =
                    state
                        .ledger
                        .open_account("lender", Role::Lender, Money::from_major(6_000))?;
                let loan = Loan::new(
                    borrower,
                    principal,
                    period_months,
                    Money::from_decimal(dec!(3.75)),
                    now,
                )?;
                let loan_id = loan.id;
                state.loans.insert(loan_id, loan);
                let offer = offers::submit_offer(
                    state,
                    loan_id,
                    lender,
                    Rate::from_percentage(dec!(15)),
                    now,
                )?;
                offers::accept_offer(state, offer.id, now)?;
                Ok((borrower, lender, loan_id))
            })
            .unwrap();

        Setup {
            store,
            borrower,
            lender,
            loan_id,
        }
    }

    #[test]
    fn test_settles_due_payment_and_splits_funds() {
        let time = test_time();
        let setup = funded_loan(&time, Money::from_major(10_000), Money::from_major(5_000), 6);
        let control = time.test_control().unwrap();

        // 2024-02-15 due date reached
        control.advance(Duration::days(31));

        let processor = RepaymentProcessor::new();
        let report = processor.run(&setup.store, &time);

        assert_eq!(report.due_payments, 1);
        assert_eq!(report.processed_count(), 1);
        assert_eq!(report.failed_count(), 0);
        assert!(report.completed_loans.is_empty());

        setup.store.read(|state| {
            assert_eq!(
                state.ledger.balance_of(setup.borrower).unwrap(),
                Money::from_decimal(dec!(9103.49))
            );
            // 6000 - 5003.75 + 895.885
            assert_eq!(
                state.ledger.balance_of(setup.lender).unwrap(),
                Money::from_decimal(dec!(1892.135))
            );
            assert_eq!(state.ledger.platform_funds(), Money::from_decimal(dec!(0.625)));
        });
    }

    #[test]
    fn test_not_yet_due_payments_are_left_alone() {
        let time = test_time();
        let setup = funded_loan(&time, Money::from_major(10_000), Money::from_major(5_000), 6);

        // still 2024-01-15, first due date is a month away
        let processor = RepaymentProcessor::new();
        let report = processor.run(&setup.store, &time);

        assert_eq!(report.due_payments, 0);
        assert_eq!(report.processed_count(), 0);
        assert_eq!(
            setup.store.read(|state| state.pending_payment_count(setup.loan_id)),
            6
        );
    }

    #[test]
    fn test_insufficient_borrower_is_reported_and_skipped() {
        let time = test_time();
        let setup = funded_loan(&time, Money::from_major(100), Money::from_major(5_000), 6);
        let control = time.test_control().unwrap();
        control.advance(Duration::days(31));

        let processor = RepaymentProcessor::new();
        let report = processor.run(&setup.store, &time);

        assert_eq!(report.due_payments, 1);
        assert_eq!(report.processed_count(), 0);
        assert_eq!(report.failed_count(), 1);
        assert_eq!(report.failed[0].loan, setup.loan_id);
        assert!(report.failed[0].reason.contains("insufficient funds"));

        // nothing moved and the payment is still waiting
        setup.store.read(|state| {
            assert_eq!(
                state.ledger.balance_of(setup.borrower).unwrap(),
                Money::from_major(100)
            );
            assert_eq!(state.pending_payment_count(setup.loan_id), 6);
            assert_eq!(
                state.loan(setup.loan_id).unwrap().status,
                LoanStatus::Funded
            );
        });

        // the borrower tops up and the next run succeeds
        setup
            .store
            .transaction(|state| state.ledger.credit(setup.borrower, Money::from_major(1_000)))
            .unwrap();
        let report = processor.run(&setup.store, &time);
        assert_eq!(report.processed_count(), 1);
        assert_eq!(report.failed_count(), 0);
    }

    #[test]
    fn test_one_shortfall_never_blocks_other_loans() {
        let time = test_time();
        let now = time.now();
        let store = Store::new();

        let (broke, solvent, solvent_loan) = store
            .transaction(|state| {
                let broke = state
                    .ledger
                    .open_account("broke", Role::Borrower, Money::ZERO)?;
                let solvent =
                    state
                        .ledger
                        .open_account("solvent", Role::Borrower, Money::from_major(5_000))?;
                let lender =
                    state
                        .ledger
                        .open_account("lender", Role::Lender, Money::from_major(12_000))?;

                for borrower in [broke, solvent] {
                    let loan = Loan::new(
                        borrower,
                        Money::from_major(1_000),
                        6,
                        Money::from_decimal(dec!(3.75)),
                        now,
                    )?;
                    let loan_id = loan.id;
                    state.loans.insert(loan_id, loan);
                    let offer = offers::submit_offer(
                        state,
                        loan_id,
                        lender,
                        Rate::from_percentage(dec!(15)),
                        now,
                    )?;
                    offers::accept_offer(state, offer.id, now)?;
                }

                let solvent_loan = state
                    .loans
                    .values()
                    .find(|loan| loan.borrower == solvent)
                    .map(|loan| loan.id)
                    .ok_or(LendingError::UnknownUser { id: solvent })?;
                Ok((broke, solvent, solvent_loan))
            })
            .unwrap();

        let control = time.test_control().unwrap();
        control.advance(Duration::days(31));

        let report = RepaymentProcessor::new().run(&store, &time);

        assert_eq!(report.due_payments, 2);
        assert_eq!(report.processed_count(), 1);
        assert_eq!(report.failed_count(), 1);
        store.read(|state| {
            assert_eq!(state.pending_payment_count(solvent_loan), 5);
            assert!(state.ledger.balance_of(broke).unwrap().is_zero());
            assert!(state.ledger.balance_of(solvent).unwrap() < Money::from_major(5_000));
        });
    }

    #[test]
    fn test_rerun_after_settlement_is_idempotent() {
        let time = test_time();
        let setup = funded_loan(&time, Money::from_major(10_000), Money::from_major(5_000), 6);
        let control = time.test_control().unwrap();
        control.advance(Duration::days(31));

        let processor = RepaymentProcessor::new();
        let first = processor.run(&setup.store, &time);
        assert_eq!(first.processed_count(), 1);

        let borrower_after = setup
            .store
            .read(|state| state.ledger.balance_of(setup.borrower))
            .unwrap();

        let second = processor.run(&setup.store, &time);
        assert_eq!(second.due_payments, 0);
        assert_eq!(second.processed_count(), 0);
        assert_eq!(
            setup
                .store
                .read(|state| state.ledger.balance_of(setup.borrower))
                .unwrap(),
            borrower_after
        );
    }

    #[test]
    fn test_loan_completes_after_final_settlement() {
        let time = test_time();
        let setup = funded_loan(&time, Money::from_major(10_000), Money::from_major(1_000), 2);
        let control = time.test_control().unwrap();

        let before = setup.store.read(|state| state.ledger.total_funds());

        // past both due dates; one run settles the whole schedule
        control.advance(Duration::days(70));
        let report = RepaymentProcessor::new().run(&setup.store, &time);

        assert_eq!(report.due_payments, 2);
        assert_eq!(report.processed_count(), 2);
        assert_eq!(report.completed_loans, vec![setup.loan_id]);

        setup.store.read(|state| {
            assert_eq!(
                state.loan(setup.loan_id).unwrap().status,
                LoanStatus::Completed
            );
            assert_eq!(state.pending_payment_count(setup.loan_id), 0);
            // settlements move money around without creating or destroying it
            assert_eq!(state.ledger.total_funds(), before);
            assert_eq!(state.ledger.platform_funds(), Money::from_decimal(dec!(3.75)));
        });
    }
}
