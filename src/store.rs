use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use crate::errors::{LendingError, Result};
use crate::events::EventStore;
use crate::ledger::Ledger;
use crate::loan::Loan;
use crate::offers::Offer;
use crate::schedule::Payment;
use crate::types::{LoanId, LoanStatus, OfferId, PaymentId, PaymentStatus};

/// everything the platform persists
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlatformState {
    pub ledger: Ledger,
    pub loans: HashMap<LoanId, Loan>,
    pub offers: HashMap<OfferId, Offer>,
    pub payments: HashMap<PaymentId, Payment>,
    pub events: EventStore,
}

impl PlatformState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn loan(&self, id: LoanId) -> Result<&Loan> {
        self.loans.get(&id).ok_or(LendingError::UnknownLoan { id })
    }

    pub(crate) fn loan_mut(&mut self, id: LoanId) -> Result<&mut Loan> {
        self.loans
            .get_mut(&id)
            .ok_or(LendingError::UnknownLoan { id })
    }

    pub fn offer(&self, id: OfferId) -> Result<&Offer> {
        self.offers.get(&id).ok_or(LendingError::UnknownOffer { id })
    }

    pub fn payment(&self, id: PaymentId) -> Result<&Payment> {
        self.payments
            .get(&id)
            .ok_or(LendingError::UnknownPayment { id })
    }

    pub(crate) fn payment_mut(&mut self, id: PaymentId) -> Result<&mut Payment> {
        self.payments
            .get_mut(&id)
            .ok_or(LendingError::UnknownPayment { id })
    }

    /// pending loans listed for funding, oldest first
    pub fn available_loans(&self) -> Vec<Loan> {
        let mut loans: Vec<Loan> = self
            .loans
            .values()
            .filter(|loan| loan.status == LoanStatus::Pending)
            .cloned()
            .collect();
        loans.sort_by_key(|loan| (loan.created_at, loan.id));
        loans
    }

    /// offers targeting a loan, oldest first
    pub fn offers_for_loan(&self, loan: LoanId) -> Vec<Offer> {
        let mut offers: Vec<Offer> = self
            .offers
            .values()
            .filter(|offer| offer.loan_id == loan)
            .cloned()
            .collect();
        offers.sort_by_key(|offer| (offer.created_at, offer.id));
        offers
    }

    /// schedule of a loan in installment order
    pub fn payments_for_loan(&self, loan: LoanId) -> Vec<Payment> {
        let mut payments: Vec<Payment> = self
            .payments
            .values()
            .filter(|payment| payment.loan_id == loan)
            .cloned()
            .collect();
        payments.sort_by_key(|payment| payment.payment_number);
        payments
    }

    /// unsettled payments remaining on a loan
    pub fn pending_payment_count(&self, loan: LoanId) -> usize {
        self.payments
            .values()
            .filter(|payment| payment.loan_id == loan && payment.status == PaymentStatus::Pending)
            .count()
    }
}

/// In-memory store with database-style transaction semantics.
///
/// A transaction takes the single writer lock, clones the committed state,
/// and runs its closure against the clone. On `Ok` the clone replaces the
/// committed state; on `Err` it is dropped and the committed state stays
/// untouched, so partially applied writes are never observable. Writers
/// are serialized, which makes a re-check inside a transaction immune to
/// interleaved commits.
#[derive(Debug, Default)]
pub struct Store {
    state: RwLock<PlatformState>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// run a read-only closure against the committed state
    pub fn read<T>(&self, f: impl FnOnce(&PlatformState) -> T) -> T {
        // the committed state is replaced wholesale on commit, so even a
        // poisoned lock holds a consistent snapshot
        let guard = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    /// run a fallible mutation with commit-or-rollback semantics
    pub fn transaction<T>(&self, f: impl FnOnce(&mut PlatformState) -> Result<T>) -> Result<T> {
        let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let mut draft = guard.clone();
        let value = f(&mut draft)?;
        *guard = draft;
        Ok(value)
    }

    /// run an infallible mutation directly against the committed state
    pub fn write<T>(&self, f: impl FnOnce(&mut PlatformState) -> T) -> T {
        let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }
}
