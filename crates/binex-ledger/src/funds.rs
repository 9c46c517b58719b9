//! INR funds ledger.
//!
//! The [`FundsLedger`] tracks per-user funds with two components:
//! - **balance**: disposable, usable for new orders
//! - **locked**: reserved by resting buy liquidity
//!
//! The lifecycle of a buy reservation:
//! 1. `onramp` → funds arrive (balance increases)
//! 2. `lock` → order placed, `quantity × price` moves balance → locked
//! 3. `consume_locked` → fill executed, reservation leaves the user
//! 4. `release` → price improvement, cancel or settlement refund (locked → balance)
//!
//! Every operation validates before it mutates.

use std::collections::BTreeMap;

use binex_types::{BinexError, InrBalance, Paise, Result, UserId};

/// Funds of every registered user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FundsLedger {
    balances: BTreeMap<UserId, InrBalance>,
    /// Total paise ever onramped, for conservation audits.
    onramped: u128,
}

impl FundsLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_parts(balances: BTreeMap<UserId, InrBalance>, onramped: u128) -> Self {
        Self { balances, onramped }
    }

    pub(crate) fn balances(&self) -> &BTreeMap<UserId, InrBalance> {
        &self.balances
    }

    // =================================================================
    // Users
    // =================================================================

    /// Register a user with an empty balance.
    ///
    /// # Errors
    /// `UserAlreadyExists` if the id is taken.
    pub fn create_user(&mut self, user_id: &UserId) -> Result<InrBalance> {
        if self.balances.contains_key(user_id) {
            return Err(BinexError::UserAlreadyExists(user_id.clone()));
        }
        let entry = InrBalance::default();
        self.balances.insert(user_id.clone(), entry);
        Ok(entry)
    }

    #[must_use]
    pub fn contains(&self, user_id: &UserId) -> bool {
        self.balances.contains_key(user_id)
    }

    /// Funds of a user.
    ///
    /// # Errors
    /// `UserNotFound` for unknown users.
    pub fn get(&self, user_id: &UserId) -> Result<InrBalance> {
        self.balances
            .get(user_id)
            .copied()
            .ok_or_else(|| BinexError::UserNotFound(user_id.clone()))
    }

    fn entry_mut(&mut self, user_id: &UserId) -> Result<&mut InrBalance> {
        self.balances
            .get_mut(user_id)
            .ok_or_else(|| BinexError::UserNotFound(user_id.clone()))
    }

    // =================================================================
    // Core operations
    // =================================================================

    /// Credit external funds to a user's balance.
    ///
    /// # Errors
    /// `InvalidAmount` for zero, `UserNotFound`, or `BalanceOverflow`.
    pub fn onramp(&mut self, user_id: &UserId, amount: Paise) -> Result<InrBalance> {
        if amount == 0 {
            return Err(BinexError::InvalidAmount {
                reason: "onramp amount must be positive".into(),
            });
        }
        let entry = self.entry_mut(user_id)?;
        entry.balance = entry
            .balance
            .checked_add(amount)
            .ok_or_else(|| BinexError::BalanceOverflow {
                reason: format!("onramp of {amount} to {user_id}"),
            })?;
        let result = *entry;
        self.onramped += u128::from(amount);
        Ok(result)
    }

    /// Move `amount` from balance to locked.
    ///
    /// # Errors
    /// `InsufficientFunds` if the balance is too small.
    pub fn lock(&mut self, user_id: &UserId, amount: Paise) -> Result<()> {
        let entry = self.entry_mut(user_id)?;
        if entry.balance < amount {
            return Err(BinexError::InsufficientFunds {
                needed: amount,
                available: entry.balance,
            });
        }
        entry.balance -= amount;
        entry.locked += amount;
        Ok(())
    }

    /// Move `amount` from locked back to balance.
    ///
    /// # Errors
    /// `BalanceUnderflow` if less than `amount` is locked.
    pub fn release(&mut self, user_id: &UserId, amount: Paise) -> Result<()> {
        let entry = self.entry_mut(user_id)?;
        if entry.locked < amount {
            return Err(BinexError::BalanceUnderflow {
                reason: format!(
                    "release {amount} from {user_id}, only {} locked",
                    entry.locked
                ),
            });
        }
        entry.locked -= amount;
        entry.balance += amount;
        Ok(())
    }

    /// Permanently remove `amount` from locked (a fill consumed it).
    ///
    /// # Errors
    /// `BalanceUnderflow` if less than `amount` is locked.
    pub fn consume_locked(&mut self, user_id: &UserId, amount: Paise) -> Result<()> {
        let entry = self.entry_mut(user_id)?;
        if entry.locked < amount {
            return Err(BinexError::BalanceUnderflow {
                reason: format!(
                    "consume {amount} from {user_id}, only {} locked",
                    entry.locked
                ),
            });
        }
        entry.locked -= amount;
        Ok(())
    }

    /// Add `amount` to balance (sale proceeds, payout).
    ///
    /// # Errors
    /// `UserNotFound` or `BalanceOverflow`.
    pub fn credit(&mut self, user_id: &UserId, amount: Paise) -> Result<()> {
        let entry = self.entry_mut(user_id)?;
        entry.balance = entry
            .balance
            .checked_add(amount)
            .ok_or_else(|| BinexError::BalanceOverflow {
                reason: format!("credit of {amount} to {user_id}"),
            })?;
        Ok(())
    }

    // =================================================================
    // Aggregates
    // =================================================================

    /// Σ(balance + locked) over all users.
    #[must_use]
    pub fn total(&self) -> u128 {
        self.balances
            .values()
            .map(|b| u128::from(b.balance) + u128::from(b.locked))
            .sum()
    }

    #[must_use]
    pub fn total_onramped(&self) -> u128 {
        self.onramped
    }

    #[must_use]
    pub fn user_count(&self) -> usize {
        self.balances.len()
    }
}
