//! # Purchase journal types
//!
//! A [`PurchaseRecord`] is the durable, append-only history of purchase
//! attempts for one (plugin, buyer) pair. Attempts are never reordered or
//! deleted; the record's current state is the **last** attempt's status.
//!
//! ## Attempt State Machine
//!
//! ```text
//!                 ┌───────────┐
//!      ┌─────────▶│ COMPLETED │  (plugin owned, record closed)
//!      │          └───────────┘
//! ┌────┴────┐     ┌───────────────┐
//! │ PENDING ├────▶│ CALL_REJECTED │  (transport failure, retryable)
//! └────┬────┘     └───────────────┘
//!      │          ┌────────┐
//!      └─────────▶│ FAILED │  (ledger-reported failure, retryable)
//!                 └────────┘
//! ```
//!
//! A retryable outcome permits a **new** attempt to be appended, re-entering
//! PENDING; the resolved attempt itself never changes again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AccountId, BlockIndex, LedgerError, PlugpayError, PluginId, PurchaseKey, Result};

/// The resolution state of one purchase attempt.
///
/// Transitions are **monotonic**: `Pending` is the only non-terminal state,
/// and every terminal state is final for that attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttemptStatus {
    /// The attempt is persisted and the ledger call is (or is about to be)
    /// in flight. Blocks any concurrent attempt for the same record.
    Pending,
    /// The transfer landed. `block_index` is absent for free plugins,
    /// which never touch the ledger.
    Completed { block_index: Option<BlockIndex> },
    /// The ledger call was rejected before producing a reply.
    CallRejected { reason: String },
    /// The ledger completed the call and reported a transfer failure.
    Failed { error: LedgerError },
}

impl AttemptStatus {
    /// Can this status transition to the given target?
    #[must_use]
    pub fn can_transition_to(&self, target: &Self) -> bool {
        matches!(
            (self, target),
            (
                Self::Pending,
                Self::Completed { .. } | Self::CallRejected { .. } | Self::Failed { .. }
            )
        )
    }

    /// Whether the attempt has resolved (anything but `Pending`).
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Whether a new attempt may be appended after this one.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::CallRejected { .. } | Self::Failed { .. })
    }
}

impl std::fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Completed { .. } => write!(f, "COMPLETED"),
            Self::CallRejected { .. } => write!(f, "CALL_REJECTED"),
            Self::Failed { .. } => write!(f, "FAILED"),
        }
    }
}

/// One try at paying for a purchase.
///
/// The status is the only field that ever changes after creation; it resolves
/// exactly once, via the `mark_*` transition methods.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseAttempt {
    /// The account that pays for this attempt.
    pub payer: AccountId,
    /// Amount in the smallest currency unit (the plugin's price at attempt time).
    pub amount: u64,
    /// When the attempt was created and persisted.
    pub created_at: DateTime<Utc>,
    /// Current resolution state.
    pub status: AttemptStatus,
}

impl PurchaseAttempt {
    /// Create a new attempt in `Pending` state.
    #[must_use]
    pub fn pending(payer: AccountId, amount: u64, created_at: DateTime<Utc>) -> Self {
        Self {
            payer,
            amount,
            created_at,
            status: AttemptStatus::Pending,
        }
    }

    fn transition(&mut self, target: AttemptStatus) -> Result<()> {
        if !self.status.can_transition_to(&target) {
            return Err(PlugpayError::InvalidAttemptStatus {
                from: self.status.to_string(),
                to: target.to_string(),
            });
        }
        self.status = target;
        Ok(())
    }

    /// Resolve the attempt as completed.
    ///
    /// # Errors
    /// Returns `InvalidAttemptStatus` if the attempt is not `Pending`.
    pub fn mark_completed(&mut self, block_index: Option<BlockIndex>) -> Result<()> {
        self.transition(AttemptStatus::Completed { block_index })
    }

    /// Resolve the attempt as rejected at the call layer.
    ///
    /// # Errors
    /// Returns `InvalidAttemptStatus` if the attempt is not `Pending`.
    pub fn mark_call_rejected(&mut self, reason: impl Into<String>) -> Result<()> {
        self.transition(AttemptStatus::CallRejected {
            reason: reason.into(),
        })
    }

    /// Resolve the attempt as failed by the ledger.
    ///
    /// # Errors
    /// Returns `InvalidAttemptStatus` if the attempt is not `Pending`.
    pub fn mark_failed(&mut self, error: LedgerError) -> Result<()> {
        self.transition(AttemptStatus::Failed { error })
    }
}

/// The append-only purchase history for one (plugin, buyer) pair.
///
/// Created on the first attempt, never deleted. Later attempts for the same
/// pair append here rather than creating a new record. The last attempt's
/// status decides whether the plugin is owned (`Completed`) or purchasable
/// again (`CallRejected` / `Failed`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseRecord {
    /// Deterministic record key (`hash(plugin, buyer)`).
    pub key: PurchaseKey,
    /// The plugin being purchased.
    pub plugin_id: PluginId,
    /// The buyer who will own the plugin.
    pub buyer: AccountId,
    /// The plugin's author (credited on completion).
    pub author: AccountId,
    /// Ordered attempt journal; insertion order is chronological.
    pub attempts: Vec<PurchaseAttempt>,
}

impl PurchaseRecord {
    /// Create an empty record for a (plugin, buyer) pair.
    #[must_use]
    pub fn new(plugin_id: PluginId, buyer: AccountId, author: AccountId) -> Self {
        let key = PurchaseKey::derive(&plugin_id, &buyer);
        Self {
            key,
            plugin_id,
            buyer,
            author,
            attempts: Vec::new(),
        }
    }

    /// The most recent attempt, if any.
    #[must_use]
    pub fn last_attempt(&self) -> Option<&PurchaseAttempt> {
        self.attempts.last()
    }

    /// Mutable access to the most recent attempt.
    pub fn last_attempt_mut(&mut self) -> Option<&mut PurchaseAttempt> {
        self.attempts.last_mut()
    }

    /// Whether the plugin is currently owned by the buyer.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(
            self.last_attempt().map(|a| &a.status),
            Some(AttemptStatus::Completed { .. })
        )
    }

    /// Whether an attempt is currently in flight.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        matches!(
            self.last_attempt().map(|a| &a.status),
            Some(AttemptStatus::Pending)
        )
    }

    /// Number of attempts ever made for this pair.
    #[must_use]
    pub fn attempt_count(&self) -> usize {
        self.attempts.len()
    }
}

/// Returned to the caller when a purchase completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseReceipt {
    /// The purchase record this receipt settles.
    pub key: PurchaseKey,
    /// Ledger block the payment landed in; absent for free plugins.
    pub block_index: Option<BlockIndex>,
    /// Portion of the price credited to the author.
    pub author_share: u64,
    /// Portion of the price accrued by the registry.
    pub registry_share: u64,
}

/// Aggregate purchase-ledger statistics for the admin surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseStats {
    /// Total (plugin, buyer) records ever created.
    pub records: usize,
    /// Records whose last attempt is Completed.
    pub completed: usize,
    /// Records with an attempt currently in flight.
    pub pending: usize,
    /// Records whose last attempt failed or was rejected.
    pub failed: usize,
    /// Sum of all completed purchase amounts.
    pub gross_volume: u64,
}
