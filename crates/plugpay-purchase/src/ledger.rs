//! The purchase ledger — journal, payment state machine, and the only
//! component that talks to the external ledger service for purchases.
//!
//! ## Purchase Flow
//!
//! ```text
//! catalog lookup → append PENDING attempt (persisted) → ledger transfer
//!       │                                                    │
//!       └─ missing: PluginNotFound,                          ├─ Ok(block)       → COMPLETED + commit
//!          ledger never called                               ├─ call rejected   → CALL_REJECTED
//!                                                            └─ ledger failure  → FAILED
//! ```
//!
//! The PENDING attempt is written **before** the transfer is awaited. While
//! the call is in flight other handlers run; they observe the pending attempt
//! and are rejected with `AlreadyProcessing` instead of racing. No lock is
//! ever held across the await.

use std::collections::HashMap;

use chrono::Utc;
use parking_lot::Mutex;
use plugpay_accounts::BalanceBook;
use plugpay_ledger::LedgerClient;
use plugpay_types::{
    AccountId, AttemptStatus, BlockIndex, PlugpayError, PluginCatalog, PluginId, PurchaseAttempt,
    PurchaseKey, PurchaseReceipt, PurchaseRecord, PurchaseStats, Result, RevenueSplit,
    TransferArgs, TransferFailure, constants,
};

/// Everything the purchase ledger owns, guarded by one lock.
#[derive(Debug, Default)]
struct PurchaseState {
    /// The append-only journal, one record per (plugin, buyer) pair.
    records: HashMap<PurchaseKey, PurchaseRecord>,
    /// Completed purchases by buyer, for the listing surface.
    by_buyer: HashMap<AccountId, Vec<PurchaseKey>>,
    /// Completed purchases by plugin, for the analytics surface.
    by_plugin: HashMap<PluginId, Vec<PurchaseKey>>,
    /// Registry's accumulated share of completed purchases.
    registry_earned: u64,
}

/// Owns the per-(plugin, buyer) purchase journal and reconciles transfer
/// outcomes into it. Credits `BalanceBook` on completion only.
#[derive(Debug)]
pub struct PurchaseLedger {
    state: Mutex<PurchaseState>,
    split: RevenueSplit,
    /// Custody account purchases are paid into.
    registry_account: AccountId,
}

impl PurchaseLedger {
    /// Create a purchase ledger with the default revenue split.
    #[must_use]
    pub fn new(registry_account: AccountId) -> Self {
        Self::with_split(registry_account, RevenueSplit::default())
    }

    /// Create a purchase ledger with a custom revenue split.
    #[must_use]
    pub fn with_split(registry_account: AccountId, split: RevenueSplit) -> Self {
        Self {
            state: Mutex::new(PurchaseState::default()),
            split,
            registry_account,
        }
    }

    /// Purchase a plugin for `buyer`, paid by `payer`.
    ///
    /// Validates against the catalog, persists a `Pending` attempt, invokes
    /// the ledger (free plugins skip the call), and reconciles the outcome.
    /// The attempt's resolved status and the returned error always agree.
    ///
    /// # Errors
    /// - `PluginNotFound` if the catalog has no such plugin (ledger not called)
    /// - `AlreadyPurchased` if the buyer already owns the plugin
    /// - `AlreadyProcessing` if an attempt for this pair is in flight
    /// - `AsyncCallFailed` / `TransferFailed` for the two transfer-failure layers
    pub async fn purchase<C, L>(
        &self,
        catalog: &C,
        ledger: &L,
        balances: &BalanceBook,
        plugin_id: PluginId,
        buyer: AccountId,
        payer: AccountId,
    ) -> Result<PurchaseReceipt>
    where
        C: PluginCatalog,
        L: LedgerClient,
    {
        let listing = catalog
            .get_plugin(&plugin_id)
            .ok_or_else(|| PlugpayError::PluginNotFound(plugin_id.clone()))?;

        let now = Utc::now();
        let key = PurchaseKey::derive(&plugin_id, &buyer);

        // Persist the PENDING attempt before any suspension point, so an
        // interleaved handler sees "in flight" rather than "absent".
        let attempt_index = {
            let mut state = self.state.lock();
            let record = state
                .records
                .entry(key)
                .or_insert_with(|| PurchaseRecord::new(plugin_id.clone(), buyer, listing.author));
            match record.last_attempt().map(|a| &a.status) {
                Some(AttemptStatus::Completed { .. }) => {
                    return Err(PlugpayError::AlreadyPurchased(plugin_id));
                }
                Some(AttemptStatus::Pending) => {
                    return Err(PlugpayError::AlreadyProcessing);
                }
                _ => {}
            }
            record
                .attempts
                .push(PurchaseAttempt::pending(payer, listing.price, now));
            record.attempts.len() - 1
        };

        // Free plugins complete without contacting the ledger.
        if listing.price == 0 {
            let mut state = self.state.lock();
            return Self::commit_completed(&mut state, &self.split, balances, key, attempt_index, None);
        }

        let args = TransferArgs {
            from: payer,
            to: self.registry_account,
            amount: listing.price,
            memo: format!("{}{plugin_id}", constants::PURCHASE_MEMO_PREFIX),
            created_at: now,
        };
        // Suspension point: other handlers may run until the transfer resolves.
        let outcome = ledger.transfer(args).await;

        self.resolve_transfer(balances, key, attempt_index, outcome)
    }

    /// Privileged: re-run the transfer for a record whose last attempt did
    /// not complete. Ownership and catalog checks are not re-validated; the
    /// new attempt reuses the original payer and amount.
    ///
    /// A stuck `Pending` attempt is first resolved as superseded so the
    /// one-pending-per-record invariant holds across the retry.
    ///
    /// # Errors
    /// - `NotFound` if no record exists for the key
    /// - `AlreadyPurchased` if the last attempt completed
    pub async fn retry_purchase<L>(
        &self,
        ledger: &L,
        balances: &BalanceBook,
        key: PurchaseKey,
    ) -> Result<PurchaseReceipt>
    where
        L: LedgerClient,
    {
        let now = Utc::now();
        let (payer, amount, plugin_id, attempt_index) = {
            let mut state = self.state.lock();
            let record = state
                .records
                .get_mut(&key)
                .ok_or_else(|| PlugpayError::NotFound(key.to_string()))?;
            let last = record
                .last_attempt_mut()
                .ok_or_else(|| PlugpayError::Internal(format!("record {key} has no attempts")))?;
            match &last.status {
                AttemptStatus::Completed { .. } => {
                    return Err(PlugpayError::AlreadyPurchased(record.plugin_id.clone()));
                }
                AttemptStatus::Pending => {
                    last.mark_call_rejected("superseded by operator retry")?;
                }
                _ => {}
            }
            let (payer, amount) = (last.payer, last.amount);
            record
                .attempts
                .push(PurchaseAttempt::pending(payer, amount, now));
            (
                payer,
                amount,
                record.plugin_id.clone(),
                record.attempts.len() - 1,
            )
        };

        if amount == 0 {
            let mut state = self.state.lock();
            return Self::commit_completed(&mut state, &self.split, balances, key, attempt_index, None);
        }

        let args = TransferArgs {
            from: payer,
            to: self.registry_account,
            amount,
            memo: format!("{}{plugin_id}", constants::PURCHASE_MEMO_PREFIX),
            created_at: now,
        };
        let outcome = ledger.transfer(args).await;

        self.resolve_transfer(balances, key, attempt_index, outcome)
    }

    /// Reconcile a transfer outcome into the attempt the call created.
    /// Status mutation and error return happen together, never one without
    /// the other.
    ///
    /// The outcome is written onto `attempt_index` exactly — never onto
    /// whatever attempt happens to be last. If an operator retry superseded
    /// this attempt while the call was in flight, its late outcome leaves the
    /// journal untouched.
    fn resolve_transfer(
        &self,
        balances: &BalanceBook,
        key: PurchaseKey,
        attempt_index: usize,
        outcome: std::result::Result<BlockIndex, TransferFailure>,
    ) -> Result<PurchaseReceipt> {
        let mut state = self.state.lock();

        {
            let attempt = Self::attempt_mut(&mut state, key, attempt_index)?;
            if attempt.status != AttemptStatus::Pending {
                let actual = attempt.status.to_string();
                tracing::warn!(
                    key = %key,
                    attempt = attempt_index,
                    status = %actual,
                    outcome = ?outcome,
                    "Transfer resolved for a superseded attempt"
                );
                return match outcome {
                    Ok(_) => Err(PlugpayError::InvalidAttemptStatus {
                        from: actual,
                        to: AttemptStatus::Completed { block_index: None }.to_string(),
                    }),
                    Err(failure) => Err(failure.into()),
                };
            }
        }

        match outcome {
            Ok(block) => Self::commit_completed(
                &mut state,
                &self.split,
                balances,
                key,
                attempt_index,
                Some(block),
            ),
            Err(TransferFailure::CallRejected(reason)) => {
                Self::attempt_mut(&mut state, key, attempt_index)?
                    .mark_call_rejected(reason.clone())?;
                tracing::warn!(key = %key, reason = %reason, "Purchase call rejected");
                Err(PlugpayError::AsyncCallFailed(reason))
            }
            Err(TransferFailure::Ledger(error)) => {
                Self::attempt_mut(&mut state, key, attempt_index)?.mark_failed(error.clone())?;
                tracing::warn!(key = %key, error = %error, "Purchase transfer failed");
                Err(PlugpayError::TransferFailed(error))
            }
        }
    }

    fn attempt_mut(
        state: &mut PurchaseState,
        key: PurchaseKey,
        attempt_index: usize,
    ) -> Result<&mut PurchaseAttempt> {
        state
            .records
            .get_mut(&key)
            .and_then(|record| record.attempts.get_mut(attempt_index))
            .ok_or_else(|| {
                PlugpayError::Internal(format!("no attempt {attempt_index} to resolve for {key}"))
            })
    }

    /// Completion side effects, shared by the free and paid paths and by
    /// retries. Runs exactly once per successful attempt: resolves the
    /// attempt, indexes the record, splits the amount, credits the author.
    fn commit_completed(
        state: &mut PurchaseState,
        split: &RevenueSplit,
        balances: &BalanceBook,
        key: PurchaseKey,
        attempt_index: usize,
        block_index: Option<BlockIndex>,
    ) -> Result<PurchaseReceipt> {
        let (buyer, plugin_id, author, amount) = {
            let record = state
                .records
                .get_mut(&key)
                .ok_or_else(|| PlugpayError::NotFound(key.to_string()))?;
            let attempt = record.attempts.get_mut(attempt_index).ok_or_else(|| {
                PlugpayError::Internal(format!("record {key} has no attempt {attempt_index}"))
            })?;
            attempt.mark_completed(block_index)?;
            let amount = attempt.amount;
            (record.buyer, record.plugin_id.clone(), record.author, amount)
        };

        // Indexing is idempotent: a key is listed at most once.
        let buyer_keys = state.by_buyer.entry(buyer).or_default();
        if !buyer_keys.contains(&key) {
            buyer_keys.push(key);
        }
        let plugin_keys = state.by_plugin.entry(plugin_id.clone()).or_default();
        if !plugin_keys.contains(&key) {
            plugin_keys.push(key);
        }

        let (author_share, registry_share) = split.split(amount);
        balances.credit(author, author_share);
        state.registry_earned += registry_share;

        tracing::info!(
            key = %key,
            plugin = %plugin_id,
            buyer = %buyer,
            amount,
            author_share,
            registry_share,
            block = ?block_index,
            "Purchase settled"
        );

        Ok(PurchaseReceipt {
            key,
            block_index,
            author_share,
            registry_share,
        })
    }

    /// Whether `buyer` currently owns `plugin_id` (last attempt Completed).
    #[must_use]
    pub fn is_purchased(&self, plugin_id: &PluginId, buyer: &AccountId) -> bool {
        let key = PurchaseKey::derive(plugin_id, buyer);
        self.state
            .lock()
            .records
            .get(&key)
            .is_some_and(PurchaseRecord::is_completed)
    }

    /// The full journal for one (plugin, buyer) pair, if it exists.
    #[must_use]
    pub fn record(&self, key: &PurchaseKey) -> Option<PurchaseRecord> {
        self.state.lock().records.get(key).cloned()
    }

    /// All completed purchases of a buyer.
    #[must_use]
    pub fn purchases_of_buyer(&self, buyer: &AccountId) -> Vec<PurchaseRecord> {
        let state = self.state.lock();
        state
            .by_buyer
            .get(buyer)
            .into_iter()
            .flatten()
            .filter_map(|key| state.records.get(key).cloned())
            .collect()
    }

    /// All completed purchases of a plugin.
    #[must_use]
    pub fn purchases_of_plugin(&self, plugin_id: &PluginId) -> Vec<PurchaseRecord> {
        let state = self.state.lock();
        state
            .by_plugin
            .get(plugin_id)
            .into_iter()
            .flatten()
            .filter_map(|key| state.records.get(key).cloned())
            .collect()
    }

    /// The registry's accumulated share of completed purchases.
    #[must_use]
    pub fn registry_earned(&self) -> u64 {
        self.state.lock().registry_earned
    }

    /// Aggregate journal statistics for the admin surface.
    #[must_use]
    pub fn stats(&self) -> PurchaseStats {
        let state = self.state.lock();
        let mut stats = PurchaseStats {
            records: state.records.len(),
            ..PurchaseStats::default()
        };
        for record in state.records.values() {
            match record.last_attempt().map(|a| &a.status) {
                Some(AttemptStatus::Completed { .. }) => {
                    stats.completed += 1;
                    if let Some(attempt) = record.last_attempt() {
                        stats.gross_volume += attempt.amount;
                    }
                }
                Some(AttemptStatus::Pending) => stats.pending += 1,
                Some(_) => stats.failed += 1,
                None => {}
            }
        }
        stats
    }
}
