use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;
use crate::errors::{LendingError, Result};
use crate::types::{Role, UserId};

/// a platform user with a cash balance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: UserId,
    pub name: String,
    pub role: Role,
    balance: Money,
}

impl Account {
    /// current cash balance
    pub fn balance(&self) -> Money {
        self.balance
    }
}

/// Cash balances for every user plus the platform's own fee treasury.
///
/// Balances are only reachable through `debit` and `credit`, so the
/// insufficient-funds check cannot be bypassed and no balance ever
/// goes below zero.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ledger {
    accounts: HashMap<UserId, Account>,
    platform_funds: Money,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// open an account with an opening balance
    pub fn open_account(&mut self, name: &str, role: Role, opening_balance: Money) -> Result<UserId> {
        if opening_balance.is_negative() {
            return Err(LendingError::InvalidAmount {
                amount: opening_balance,
            });
        }
        let id = Uuid::new_v4();
        self.accounts.insert(
            id,
            Account {
                id,
                name: name.to_string(),
                role,
                balance: opening_balance,
            },
        );
        Ok(id)
    }

    pub fn account(&self, id: UserId) -> Result<&Account> {
        self.accounts.get(&id).ok_or(LendingError::UnknownUser { id })
    }

    /// look up an account and require it to hold the given role
    pub fn require_role(&self, id: UserId, required: Role) -> Result<&Account> {
        let account = self.account(id)?;
        if account.role != required {
            return Err(LendingError::WrongRole { user: id, required });
        }
        Ok(account)
    }

    pub fn balance_of(&self, id: UserId) -> Result<Money> {
        Ok(self.account(id)?.balance)
    }

    /// whether the account balance covers the amount
    pub fn check_sufficient(&self, id: UserId, amount: Money) -> Result<bool> {
        Ok(self.account(id)?.balance >= amount)
    }

    /// withdraw from an account, returning the new balance
    ///
    /// Fails without touching the balance when it cannot cover the amount.
    pub fn debit(&mut self, id: UserId, amount: Money) -> Result<Money> {
        if amount.is_negative() {
            return Err(LendingError::InvalidAmount { amount });
        }
        let account = self
            .accounts
            .get_mut(&id)
            .ok_or(LendingError::UnknownUser { id })?;
        if account.balance < amount {
            return Err(LendingError::InsufficientFunds {
                available: account.balance,
                requested: amount,
            });
        }
        account.balance -= amount;
        Ok(account.balance)
    }

    /// deposit into an account, returning the new balance
    pub fn credit(&mut self, id: UserId, amount: Money) -> Result<Money> {
        if amount.is_negative() {
            return Err(LendingError::InvalidAmount { amount });
        }
        let account = self
            .accounts
            .get_mut(&id)
            .ok_or(LendingError::UnknownUser { id })?;
        account.balance += amount;
        Ok(account.balance)
    }

    /// collect a fee share into the platform treasury
    pub fn credit_platform(&mut self, amount: Money) {
        self.platform_funds += amount;
    }

    /// accumulated platform fee revenue
    pub fn platform_funds(&self) -> Money {
        self.platform_funds
    }

    /// sum of every user balance plus the treasury
    ///
    /// Settlements move money between accounts without creating or
    /// destroying it, so this total is constant across them.
    pub fn total_funds(&self) -> Money {
        self.accounts
            .values()
            .fold(self.platform_funds, |total, account| total + account.balance)
    }
}
