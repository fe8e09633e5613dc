use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Rate;
use crate::errors::{LendingError, Result};
use crate::events::Event;
use crate::loan::Loan;
use crate::schedule::InstallmentSchedule;
use crate::store::PlatformState;
use crate::types::{LoanId, LoanStatus, OfferId, OfferStatus, Role, UserId};

/// a lender's offer to fund a pending loan at a proposed rate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Offer {
    pub id: OfferId,
    pub loan_id: LoanId,
    pub lender: UserId,
    pub annual_rate: Rate,
    pub status: OfferStatus,
    pub created_at: DateTime<Utc>,
}

impl Offer {
    pub fn is_open(&self) -> bool {
        self.status == OfferStatus::Open
    }

    pub fn is_accepted(&self) -> bool {
        self.status == OfferStatus::Accepted
    }
}

/// Submit an offer against a pending loan.
///
/// The lender must hold enough balance to cover principal plus fee at
/// submission time. This check is advisory: nothing is reserved, and the
/// balance is verified again by the debit at acceptance.
pub(crate) fn submit_offer(
    state: &mut PlatformState,
    loan_id: LoanId,
    lender: UserId,
    annual_rate: Rate,
    now: DateTime<Utc>,
) -> Result<Offer> {
    let loan = state.loan(loan_id)?.clone();
    state.ledger.require_role(lender, Role::Lender)?;

    if loan.status != LoanStatus::Pending {
        return Err(LendingError::LoanNotPending { status: loan.status });
    }

    let total_due = loan.total_due();
    if !state.ledger.check_sufficient(lender, total_due)? {
        return Err(LendingError::InsufficientFunds {
            available: state.ledger.balance_of(lender)?,
            requested: total_due,
        });
    }

    let offer = Offer {
        id: Uuid::new_v4(),
        loan_id,
        lender,
        annual_rate,
        status: OfferStatus::Open,
        created_at: now,
    };
    state.offers.insert(offer.id, offer.clone());
    state.events.emit(Event::OfferSubmitted {
        offer: offer.id,
        loan: loan_id,
        lender,
        annual_rate,
    });

    Ok(offer)
}

/// Accept an offer, funding its loan.
///
/// Runs as one unit inside a store transaction: the lender is debited for
/// the full total due, the winning offer is accepted and every sibling
/// permanently rejected, the loan transitions to funded, and the repayment
/// schedule is materialized. Any failure rolls all of it back.
pub(crate) fn accept_offer(
    state: &mut PlatformState,
    offer_id: OfferId,
    now: DateTime<Utc>,
) -> Result<Loan> {
    let offer = state.offer(offer_id)?.clone();
    if offer.is_accepted() {
        return Err(LendingError::AlreadyAccepted { offer: offer_id });
    }

    let loan = state.loan(offer.loan_id)?.clone();
    if loan.status != LoanStatus::Pending {
        return Err(LendingError::LoanNotPending { status: loan.status });
    }

    // the debit doubles as the balance re-check; a stale submission-time
    // check cannot overdraw here
    state.ledger.debit(offer.lender, loan.total_due())?;

    for sibling in state.offers.values_mut().filter(|o| o.loan_id == loan.id) {
        if sibling.id == offer_id {
            sibling.status = OfferStatus::Accepted;
            state.events.emit(Event::OfferAccepted {
                offer: sibling.id,
                loan: loan.id,
                timestamp: now,
            });
        } else if sibling.is_open() {
            sibling.status = OfferStatus::Rejected;
            state.events.emit(Event::OfferRejected {
                offer: sibling.id,
                loan: loan.id,
                timestamp: now,
            });
        }
    }

    let funded = {
        let loan = state.loan_mut(offer.loan_id)?;
        loan.fund(offer.lender, offer.annual_rate, now)?;
        loan.clone()
    };

    let schedule = InstallmentSchedule::generate(
        funded.id,
        funded.principal,
        offer.annual_rate,
        funded.period_months,
        funded.platform_fee,
        now,
    )?;
    state.events.emit(Event::LoanFunded {
        loan: funded.id,
        lender: offer.lender,
        annual_rate: offer.annual_rate,
        total_due: funded.total_due(),
        timestamp: now,
    });
    state.events.emit(Event::ScheduleCreated {
        loan: funded.id,
        installments: funded.period_months,
        installment: schedule.installment,
        total_interest: schedule.total_interest,
    });
    for payment in schedule.payments {
        state.payments.insert(payment.id, payment);
    }

    Ok(funded)
}
