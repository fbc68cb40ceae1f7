//! Configuration types for the payment core.

use serde::{Deserialize, Serialize};

use crate::{PlugpayError, Result, constants};

/// Limits and timing for the withdrawal manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutConfig {
    /// Minimum withdrawal amount.
    pub min_withdrawal: u64,
    /// Maximum withdrawal amount.
    pub max_withdrawal: u64,
    /// Fixed fee debited on top of every completed withdrawal.
    pub fee: u64,
    /// Cooldown between two requests by the same author, in milliseconds.
    pub cooldown_ms: i64,
}

impl Default for PayoutConfig {
    fn default() -> Self {
        Self {
            min_withdrawal: constants::MIN_WITHDRAWAL,
            max_withdrawal: constants::MAX_WITHDRAWAL,
            fee: constants::WITHDRAWAL_FEE,
            cooldown_ms: constants::WITHDRAWAL_COOLDOWN_MS,
        }
    }
}

/// Fixed-percentage division of a purchase amount between the plugin author
/// and the registry operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevenueSplit {
    /// The author's percentage (0..=100).
    pub author_percent: u64,
}

impl RevenueSplit {
    /// Create a split giving the author `author_percent` of every purchase.
    ///
    /// # Errors
    /// Returns `Internal` if `author_percent` exceeds 100.
    pub fn new(author_percent: u64) -> Result<Self> {
        if author_percent > 100 {
            return Err(PlugpayError::Internal(format!(
                "revenue split {author_percent}% exceeds 100%"
            )));
        }
        Ok(Self { author_percent })
    }

    /// Split an amount into (author share, registry share).
    ///
    /// Integer truncation favors the registry; the two shares always sum to
    /// `amount` exactly.
    #[must_use]
    pub fn split(&self, amount: u64) -> (u64, u64) {
        // Widened so the product cannot overflow for amounts near u64::MAX.
        let share = u128::from(amount) * u128::from(self.author_percent) / 100;
        let author = u64::try_from(share).expect("author share never exceeds amount");
        let registry = amount - author;
        (author, registry)
    }
}

impl Default for RevenueSplit {
    fn default() -> Self {
        Self {
            author_percent: constants::AUTHOR_SHARE_PERCENT,
        }
    }
}
