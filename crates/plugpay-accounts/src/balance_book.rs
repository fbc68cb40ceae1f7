//! Author balance accounting.
//!
//! Exactly two mutators exist in the whole system: the purchase ledger
//! credits an author's share when a purchase completes, and the withdrawal
//! manager debits amount + fee when a withdrawal completes. Both are
//! synchronous and never suspend, so once an operation reaches its
//! credit/debit step it completes atomically with respect to other handlers.

use std::collections::HashMap;

use parking_lot::Mutex;
use plugpay_types::{AccountId, PlugpayError, Result};

/// Per-author accrued earnings, in the smallest currency unit.
///
/// The book is the source of truth for withdrawable balances. Absence means
/// zero, not an error.
#[derive(Debug, Default)]
pub struct BalanceBook {
    balances: Mutex<HashMap<AccountId, u64>>,
}

impl BalanceBook {
    /// Create an empty balance book.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accrue earnings for an author. Creates the entry on first use.
    pub fn credit(&self, author: AccountId, amount: u64) {
        let mut balances = self.balances.lock();
        *balances.entry(author).or_insert(0) += amount;
    }

    /// Remove earnings from an author's balance.
    ///
    /// Callers must have verified sufficiency already; a would-be-negative
    /// result is an invariant breach, surfaced as `BalanceUnderflow` with
    /// the balance left untouched.
    pub fn debit(&self, author: AccountId, amount: u64) -> Result<()> {
        let mut balances = self.balances.lock();
        let entry = balances.entry(author).or_insert(0);
        *entry = entry
            .checked_sub(amount)
            .ok_or(PlugpayError::BalanceUnderflow)?;
        Ok(())
    }

    /// The author's current accrued balance. Zero for unknown authors.
    #[must_use]
    pub fn balance_of(&self, author: &AccountId) -> u64 {
        self.balances.lock().get(author).copied().unwrap_or(0)
    }

    /// Sum of all authors' accrued balances.
    #[must_use]
    pub fn total_accrued(&self) -> u64 {
        self.balances.lock().values().sum()
    }

    /// Snapshot of every non-zero balance, for the admin listing surface.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(AccountId, u64)> {
        self.balances
            .lock()
            .iter()
            .filter(|(_, amount)| **amount > 0)
            .map(|(author, amount)| (*author, *amount))
            .collect()
    }
}
