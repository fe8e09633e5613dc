use thiserror::Error;

use crate::decimal::Money;
use crate::types::{LoanId, LoanStatus, OfferId, PaymentId, Role, UserId};

#[derive(Error, Debug)]
pub enum LendingError {
    #[error("invalid transition: {from:?} -> {to:?}")]
    InvalidTransition { from: LoanStatus, to: LoanStatus },

    #[error("insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds { available: Money, requested: Money },

    #[error("loan not pending: current status is {status:?}")]
    LoanNotPending { status: LoanStatus },

    #[error("offer already accepted: {offer}")]
    AlreadyAccepted { offer: OfferId },

    #[error("unknown user: {id}")]
    UnknownUser { id: UserId },

    #[error("unknown loan: {id}")]
    UnknownLoan { id: LoanId },

    #[error("unknown offer: {id}")]
    UnknownOffer { id: OfferId },

    #[error("unknown payment: {id}")]
    UnknownPayment { id: PaymentId },

    #[error("loan {loan} has no payment number {number}")]
    UnknownPaymentNumber { loan: LoanId, number: u32 },

    #[error("invalid amount: {amount}")]
    InvalidAmount { amount: Money },

    #[error("invalid period: {months} months")]
    InvalidPeriod { months: u32 },

    #[error("user {user} does not hold the {required:?} role")]
    WrongRole { user: UserId, required: Role },

    #[error("user {user} is not the borrower of loan {loan}")]
    NotLoanBorrower { loan: LoanId, user: UserId },
}

pub type Result<T> = std::result::Result<T, LendingError>;
