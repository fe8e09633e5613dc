use chrono::{DateTime, Utc};
use hourglass_rs::SafeTimeProvider;

use crate::config::PlatformConfig;
use crate::decimal::{Money, Rate};
use crate::errors::{LendingError, Result};
use crate::events::Event;
use crate::loan::Loan;
use crate::offers::{self, Offer};
use crate::processor::{settle_payment, RepaymentProcessor, RepaymentRunReport};
use crate::schedule::Payment;
use crate::store::{PlatformState, Store};
use crate::types::{LoanId, OfferId, PaymentId, Role, UserId};

/// The lending platform facade.
///
/// Owns the store and wraps every operation in the transaction semantics
/// the components rely on. All methods take `&self`; concurrent callers
/// are serialized by the store's writer lock.
#[derive(Debug, Default)]
pub struct LendingPlatform {
    config: PlatformConfig,
    store: Store,
    processor: RepaymentProcessor,
}

impl LendingPlatform {
    pub fn new(config: PlatformConfig) -> Self {
        Self {
            config,
            store: Store::new(),
            processor: RepaymentProcessor::new(),
        }
    }

    /// register a user with an opening balance
    pub fn register_user(&self, name: &str, role: Role, opening_balance: Money) -> Result<UserId> {
        self.store.transaction(|state| {
            let user = state.ledger.open_account(name, role, opening_balance)?;
            state.events.emit(Event::UserRegistered {
                user,
                role,
                opening_balance,
            });
            Ok(user)
        })
    }

    /// create a pending loan request listed for funding
    pub fn request_loan(
        &self,
        borrower: UserId,
        principal: Money,
        period_months: u32,
        time: &SafeTimeProvider,
    ) -> Result<Loan> {
        let now = time.now();
        let platform_fee = self.config.platform_fee;
        self.store.transaction(|state| {
            let loan = Loan::new(borrower, principal, period_months, platform_fee, now)?;
            state.ledger.require_role(borrower, Role::Borrower)?;
            state.loans.insert(loan.id, loan.clone());
            state.events.emit(Event::LoanRequested {
                loan: loan.id,
                borrower,
                principal,
                period_months,
            });
            Ok(loan)
        })
    }

    /// all loans currently listed for funding, oldest first
    pub fn available_loans(&self) -> Vec<Loan> {
        self.store.read(|state| state.available_loans())
    }

    /// submit a funding offer against a pending loan
    pub fn submit_offer(
        &self,
        loan: LoanId,
        lender: UserId,
        annual_rate: Rate,
        time: &SafeTimeProvider,
    ) -> Result<Offer> {
        let now = time.now();
        self.store
            .transaction(|state| offers::submit_offer(state, loan, lender, annual_rate, now))
    }

    /// accept an offer, funding its loan and scheduling repayments
    pub fn accept_offer(&self, offer: OfferId, time: &SafeTimeProvider) -> Result<Loan> {
        let now = time.now();
        self.store
            .transaction(|state| offers::accept_offer(state, offer, now))
    }

    /// Settle one payment on demand.
    ///
    /// Restricted to the loan's borrower. Paying an already-paid payment
    /// changes nothing and returns it as-is.
    pub fn make_payment(
        &self,
        payment: PaymentId,
        borrower: UserId,
        time: &SafeTimeProvider,
    ) -> Result<Payment> {
        let now = time.now();
        self.store
            .transaction(|state| Self::pay_as_borrower(state, payment, borrower, now))
    }

    /// settle a payment addressed by loan and installment number
    pub fn make_payment_by_number(
        &self,
        loan: LoanId,
        payment_number: u32,
        borrower: UserId,
        time: &SafeTimeProvider,
    ) -> Result<Payment> {
        let now = time.now();
        self.store.transaction(|state| {
            state.loan(loan)?;
            let payment = state
                .payments
                .values()
                .find(|p| p.loan_id == loan && p.payment_number == payment_number)
                .map(|p| p.id)
                .ok_or(LendingError::UnknownPaymentNumber {
                    loan,
                    number: payment_number,
                })?;
            Self::pay_as_borrower(state, payment, borrower, now)
        })
    }

    fn pay_as_borrower(
        state: &mut PlatformState,
        payment_id: PaymentId,
        borrower: UserId,
        now: DateTime<Utc>,
    ) -> Result<Payment> {
        state.ledger.account(borrower)?;
        let payment = state.payment(payment_id)?.clone();
        let loan = state.loan(payment.loan_id)?.clone();
        if loan.borrower != borrower {
            return Err(LendingError::NotLoanBorrower {
                loan: loan.id,
                user: borrower,
            });
        }
        let outcome = settle_payment(state, payment_id, now)?;
        Ok(outcome.payment().clone())
    }

    /// run the repayment processor once over everything currently due
    pub fn process_due_payments(&self, time: &SafeTimeProvider) -> RepaymentRunReport {
        self.processor.run(&self.store, time)
    }

    pub fn loan(&self, id: LoanId) -> Result<Loan> {
        self.store.read(|state| state.loan(id).cloned())
    }

    /// a loan together with its schedule in installment order
    pub fn loan_details(&self, id: LoanId) -> Result<(Loan, Vec<Payment>)> {
        self.store.read(|state| {
            let loan = state.loan(id)?.clone();
            Ok((loan, state.payments_for_loan(id)))
        })
    }

    pub fn payments_for_loan(&self, id: LoanId) -> Result<Vec<Payment>> {
        self.store.read(|state| {
            state.loan(id)?;
            Ok(state.payments_for_loan(id))
        })
    }

    pub fn offers_for_loan(&self, id: LoanId) -> Result<Vec<Offer>> {
        self.store.read(|state| {
            state.loan(id)?;
            Ok(state.offers_for_loan(id))
        })
    }

    pub fn balance_of(&self, user: UserId) -> Result<Money> {
        self.store.read(|state| state.ledger.balance_of(user))
    }

    /// accumulated platform fee revenue
    pub fn platform_funds(&self) -> Money {
        self.store.read(|state| state.ledger.platform_funds())
    }

    /// drain the events committed so far
    pub fn take_events(&self) -> Vec<Event> {
        self.store.write(|state| state.events.take_events())
    }

    /// snapshot of the entire platform state
    pub fn snapshot(&self) -> PlatformState {
        self.store.read(|state| state.clone())
    }
}
