use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::{Money, Rate};
use crate::errors::{LendingError, Result};
use crate::types::{LoanId, LoanStatus, UserId};

/// A loan request and its lifecycle.
///
/// The only legal transitions are `Pending -> Funded` and
/// `Funded -> Completed`. Funding attaches the winning lender and the
/// agreed rate; completion happens once every scheduled payment settles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Loan {
    pub id: LoanId,
    pub borrower: UserId,
    pub lender: Option<UserId>,
    /// amount the borrower asked for and receives on funding
    pub principal: Money,
    pub period_months: u32,
    /// agreed annual rate, set when an offer is accepted
    pub annual_rate: Option<Rate>,
    /// flat platform fee, fixed when the loan is requested
    pub platform_fee: Money,
    pub status: LoanStatus,
    pub created_at: DateTime<Utc>,
    pub funded_at: Option<DateTime<Utc>>,
}

impl Loan {
    pub fn new(
        borrower: UserId,
        principal: Money,
        period_months: u32,
        platform_fee: Money,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        if !principal.is_positive() {
            return Err(LendingError::InvalidAmount { amount: principal });
        }
        if period_months == 0 {
            return Err(LendingError::InvalidPeriod {
                months: period_months,
            });
        }

        Ok(Loan {
            id: Uuid::new_v4(),
            borrower,
            lender: None,
            principal,
            period_months,
            annual_rate: None,
            platform_fee,
            status: LoanStatus::Pending,
            created_at: now,
            funded_at: None,
        })
    }

    /// principal plus the platform fee, the amount a lender must put up
    pub fn total_due(&self) -> Money {
        self.principal + self.platform_fee
    }

    /// transition to funded, recording lender, rate, and funding time
    pub fn fund(&mut self, lender: UserId, annual_rate: Rate, now: DateTime<Utc>) -> Result<()> {
        if self.status != LoanStatus::Pending {
            return Err(LendingError::InvalidTransition {
                from: self.status,
                to: LoanStatus::Funded,
            });
        }

        self.lender = Some(lender);
        self.annual_rate = Some(annual_rate);
        self.funded_at = Some(now);
        self.status = LoanStatus::Funded;
        Ok(())
    }

    /// transition to completed
    pub fn complete(&mut self) -> Result<()> {
        if self.status != LoanStatus::Funded {
            return Err(LendingError::InvalidTransition {
                from: self.status,
                to: LoanStatus::Completed,
            });
        }

        self.status = LoanStatus::Completed;
        Ok(())
    }
}
