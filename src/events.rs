use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::types::{LoanId, OfferId, PaymentId, Role, UserId};

/// all events the platform can emit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // account events
    UserRegistered {
        user: UserId,
        role: Role,
        opening_balance: Money,
    },

    // loan lifecycle events
    LoanRequested {
        loan: LoanId,
        borrower: UserId,
        principal: Money,
        period_months: u32,
    },
    LoanFunded {
        loan: LoanId,
        lender: UserId,
        annual_rate: Rate,
        total_due: Money,
        timestamp: DateTime<Utc>,
    },
    LoanCompleted {
        loan: LoanId,
        timestamp: DateTime<Utc>,
    },

    // offer events
    OfferSubmitted {
        offer: OfferId,
        loan: LoanId,
        lender: UserId,
        annual_rate: Rate,
    },
    OfferAccepted {
        offer: OfferId,
        loan: LoanId,
        timestamp: DateTime<Utc>,
    },
    OfferRejected {
        offer: OfferId,
        loan: LoanId,
        timestamp: DateTime<Utc>,
    },

    // repayment events
    ScheduleCreated {
        loan: LoanId,
        installments: u32,
        installment: Money,
        total_interest: Money,
    },
    PaymentSettled {
        payment: PaymentId,
        loan: LoanId,
        amount: Money,
        platform_fee_share: Money,
        lender_share: Money,
        timestamp: DateTime<Utc>,
    },
    PaymentFailed {
        payment: PaymentId,
        loan: LoanId,
        reason: String,
        timestamp: DateTime<Utc>,
    },
}

/// event store for collecting events during operations
///
/// Lives inside the platform state, so events emitted by a transaction
/// that rolls back are discarded with the rest of its writes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
