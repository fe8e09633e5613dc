use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// unique identifier for a platform user
pub type UserId = Uuid;

/// unique identifier for a loan request
pub type LoanId = Uuid;

/// unique identifier for a funding offer
pub type OfferId = Uuid;

/// unique identifier for a scheduled payment
pub type PaymentId = Uuid;

/// side of the market a user participates on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// requests loans and repays them
    Borrower,
    /// funds loans and collects repayments
    Lender,
}

/// loan lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoanStatus {
    /// requested, listed for funding, no lender yet
    Pending,
    /// an offer was accepted and the schedule exists
    Funded,
    /// every scheduled payment has settled
    Completed,
}

/// funding offer status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OfferStatus {
    /// submitted and awaiting the borrower's decision
    Open,
    /// chosen by the borrower; the loan it targets is funded
    Accepted,
    /// a sibling offer won; terminal
    Rejected,
}

/// scheduled payment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    /// not yet settled
    Pending,
    /// settled, funds moved
    Paid,
}
