//! The withdrawal manager — request validation, rate limiting, and the
//! processing guard around the external transfer.
//!
//! ## Processing Flow
//!
//! ```text
//! request (validated, PENDING) ──▶ process: status check + guard acquire
//!                                        │        (no await in between)
//!                                        ▼
//!                                  ledger transfer  ── suspension point
//!                                        │
//!                      ┌─────────────────┼──────────────────┐
//!                      ▼                 ▼                  ▼
//!                debit + COMPLETED    FAILED (ledger)   FAILED (call)
//!                      └─────────────────┴──────────────────┘
//!                                        │
//!                              guard release (unconditional)
//! ```
//!
//! The guard set is the only mechanism preventing two interleaved
//! `process_withdrawal` calls for the same author from both debiting the
//! balance. Every exit path — success, expected failure, internal error —
//! flows through the single release point.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use plugpay_accounts::BalanceBook;
use plugpay_ledger::LedgerClient;
use plugpay_types::{
    AccountId, BlockIndex, PayoutConfig, PlugpayError, Result, TransferArgs, TransferFailure,
    WithdrawalId, WithdrawalRequest, WithdrawalStats, WithdrawalStatus, constants,
};

/// Everything the withdrawal manager owns, guarded by one lock.
#[derive(Debug, Default)]
struct PayoutState {
    /// All withdrawal requests ever made.
    requests: HashMap<WithdrawalId, WithdrawalRequest>,
    /// Rate-limit clock: per-author timestamp of the last *request*
    /// (not completion), so rapid successive requests can't bypass it.
    last_request: HashMap<AccountId, DateTime<Utc>>,
    /// Monotonic sequence mixed into withdrawal ids.
    sequence: u64,
}

/// Owns withdrawal requests, the rate-limit clock, and the mutual-exclusion
/// guard. Debits `BalanceBook` on completion only.
#[derive(Debug)]
pub struct WithdrawalManager {
    state: Mutex<PayoutState>,
    /// Authors currently undergoing processing. In-memory by design: it
    /// polices interleaving within the lifetime of one processing call.
    processing: Mutex<HashSet<AccountId>>,
    config: PayoutConfig,
    /// Custody account withdrawals are paid out of.
    registry_account: AccountId,
}

impl WithdrawalManager {
    /// Create a manager with the default limits.
    #[must_use]
    pub fn new(registry_account: AccountId) -> Self {
        Self::with_config(registry_account, PayoutConfig::default())
    }

    /// Create a manager with custom limits.
    #[must_use]
    pub fn with_config(registry_account: AccountId, config: PayoutConfig) -> Self {
        Self {
            state: Mutex::new(PayoutState::default()),
            processing: Mutex::new(HashSet::new()),
            config,
            registry_account,
        }
    }

    /// Request a withdrawal of `amount` to `recipient`.
    ///
    /// # Errors
    /// In validation order, first failure wins:
    /// `BelowMinimum`, `AboveMaximum`, `InsufficientFunds` (balance must
    /// cover amount + fee), `CooldownActive`, `AlreadyProcessing`.
    pub fn request_withdrawal(
        &self,
        balances: &BalanceBook,
        author: AccountId,
        amount: u64,
        recipient: AccountId,
    ) -> Result<WithdrawalId> {
        self.request_withdrawal_at(balances, author, amount, recipient, Utc::now())
    }

    /// [`Self::request_withdrawal`] with an explicit clock, for tests.
    pub fn request_withdrawal_at(
        &self,
        balances: &BalanceBook,
        author: AccountId,
        amount: u64,
        recipient: AccountId,
        now: DateTime<Utc>,
    ) -> Result<WithdrawalId> {
        if amount < self.config.min_withdrawal {
            return Err(PlugpayError::BelowMinimum {
                amount,
                minimum: self.config.min_withdrawal,
            });
        }
        if amount > self.config.max_withdrawal {
            return Err(PlugpayError::AboveMaximum {
                amount,
                maximum: self.config.max_withdrawal,
            });
        }

        let required = amount + self.config.fee;
        let available = balances.balance_of(&author);
        if available < required {
            return Err(PlugpayError::InsufficientFunds {
                required,
                available,
            });
        }

        let mut state = self.state.lock();
        if let Some(last) = state.last_request.get(&author) {
            let elapsed_ms = (now - *last).num_milliseconds();
            if elapsed_ms < self.config.cooldown_ms {
                return Err(PlugpayError::CooldownActive {
                    remaining_ms: self.config.cooldown_ms - elapsed_ms,
                });
            }
        }
        if self.processing.lock().contains(&author) {
            return Err(PlugpayError::AlreadyProcessing);
        }

        let sequence = state.sequence;
        state.sequence += 1;
        let id = WithdrawalId::derive(&author, now.timestamp_millis(), sequence);
        let request =
            WithdrawalRequest::new(id, author, amount, self.config.fee, recipient, now);
        state.requests.insert(id, request);
        state.last_request.insert(author, now);
        Ok(id)
    }

    /// Privileged: execute a pending withdrawal against the ledger.
    ///
    /// Acquires the author's processing guard before suspending and releases
    /// it on every exit path. On success the balance is debited amount + fee
    /// and the request completes; on any failure the request is marked
    /// `Failed` and the balance is left untouched.
    ///
    /// # Errors
    /// - `NotFound` if no such request
    /// - `InvalidStatus` if the request is not `Pending`
    /// - `AlreadyProcessing` if the author's guard is already held
    /// - `AsyncCallFailed` / `TransferFailed` for the two transfer-failure layers
    pub async fn process_withdrawal<L>(
        &self,
        ledger: &L,
        balances: &BalanceBook,
        id: WithdrawalId,
    ) -> Result<BlockIndex>
    where
        L: LedgerClient,
    {
        // Status check and guard acquire happen with no suspension point in
        // between, so no other handler can slip through.
        let (author, amount, fee, recipient) = {
            let state = self.state.lock();
            let request = state
                .requests
                .get(&id)
                .ok_or_else(|| PlugpayError::NotFound(id.to_string()))?;
            if request.status != WithdrawalStatus::Pending {
                return Err(PlugpayError::InvalidStatus {
                    expected: WithdrawalStatus::Pending.to_string(),
                    actual: request.status.to_string(),
                });
            }
            (
                request.author,
                request.amount,
                request.fee,
                request.recipient,
            )
        };
        if !self.processing.lock().insert(author) {
            return Err(PlugpayError::AlreadyProcessing);
        }

        // Guard held. Errors are values, so expected and unexpected failures
        // alike flow back here, and release happens exactly once.
        let result = self
            .execute_transfer(ledger, balances, id, author, amount, fee, recipient)
            .await;
        self.processing.lock().remove(&author);
        result
    }

    async fn execute_transfer<L>(
        &self,
        ledger: &L,
        balances: &BalanceBook,
        id: WithdrawalId,
        author: AccountId,
        amount: u64,
        fee: u64,
        recipient: AccountId,
    ) -> Result<BlockIndex>
    where
        L: LedgerClient,
    {
        let args = TransferArgs {
            from: self.registry_account,
            to: recipient,
            amount,
            memo: format!("{}{id}", constants::WITHDRAWAL_MEMO_PREFIX),
            created_at: Utc::now(),
        };
        // Suspension point: other handlers may run until the transfer resolves.
        let outcome = ledger.transfer(args).await;

        let now = Utc::now();
        let mut state = self.state.lock();
        let request = state
            .requests
            .get_mut(&id)
            .ok_or_else(|| PlugpayError::Internal(format!("request {id} vanished")))?;

        // A manual override may have resolved the request while the transfer
        // was in flight; its late outcome must not touch the balance.
        if request.status != WithdrawalStatus::Pending {
            tracing::warn!(
                id = %id,
                author = %author,
                status = %request.status,
                outcome = ?outcome,
                "Transfer resolved after manual override"
            );
            return Err(PlugpayError::InvalidStatus {
                expected: WithdrawalStatus::Pending.to_string(),
                actual: request.status.to_string(),
            });
        }

        match outcome {
            Ok(block) => match balances.debit(author, amount + fee) {
                Ok(()) => {
                    request.mark_completed(now)?;
                    tracing::info!(
                        id = %id,
                        author = %author,
                        amount,
                        fee,
                        block,
                        "Withdrawal completed"
                    );
                    Ok(block)
                }
                // The transfer landed but the debit broke an invariant.
                // Record the failure and surface it, never suppress.
                Err(err) => {
                    request.mark_failed(format!("debit after transfer: {err}"), now)?;
                    tracing::warn!(id = %id, author = %author, %err, "Withdrawal debit failed");
                    Err(err)
                }
            },
            Err(TransferFailure::CallRejected(reason)) => {
                request.mark_failed(&reason, now)?;
                tracing::warn!(id = %id, author = %author, reason = %reason, "Withdrawal call rejected");
                Err(PlugpayError::AsyncCallFailed(reason))
            }
            Err(TransferFailure::Ledger(error)) => {
                request.mark_failed(error.to_string(), now)?;
                tracing::warn!(id = %id, author = %author, error = %error, "Withdrawal transfer failed");
                Err(PlugpayError::TransferFailed(error))
            }
        }
    }

    /// Cancel a pending withdrawal. Only the requesting author may cancel,
    /// and not while the request is being processed.
    ///
    /// # Errors
    /// - `NotFound` if no such request
    /// - `UnauthorizedAccess` if `caller` is not the requesting author
    /// - `AlreadyProcessing` if the author's guard is held
    /// - `InvalidStatus` if the request is not `Pending`
    pub fn cancel_withdrawal(&self, id: WithdrawalId, caller: AccountId) -> Result<()> {
        let mut state = self.state.lock();
        let request = state
            .requests
            .get_mut(&id)
            .ok_or_else(|| PlugpayError::NotFound(id.to_string()))?;
        if request.author != caller {
            return Err(PlugpayError::UnauthorizedAccess);
        }
        if self.processing.lock().contains(&request.author) {
            return Err(PlugpayError::AlreadyProcessing);
        }
        request.mark_cancelled()?;
        tracing::info!(id = %id, author = %caller, "Withdrawal cancelled");
        Ok(())
    }

    /// Privileged emergency override: resolve a stuck request without the
    /// guard or the ledger. `success` debits the balance and marks the
    /// request `Completed`; otherwise it is marked `Failed("manual
    /// override")`. May overwrite a terminal status.
    ///
    /// # Errors
    /// - `NotFound` if no such request
    /// - `BalanceUnderflow` if `success` and the balance can't cover the debit
    pub fn force_complete_withdrawal(
        &self,
        balances: &BalanceBook,
        id: WithdrawalId,
        success: bool,
    ) -> Result<()> {
        let now = Utc::now();
        let mut state = self.state.lock();
        let request = state
            .requests
            .get_mut(&id)
            .ok_or_else(|| PlugpayError::NotFound(id.to_string()))?;

        if success {
            balances.debit(request.author, request.total_debit())?;
            request.force_status(WithdrawalStatus::Completed, None, now);
        } else {
            request.force_status(
                WithdrawalStatus::Failed,
                Some("manual override".to_string()),
                now,
            );
        }
        tracing::warn!(id = %id, author = %request.author, success, "Withdrawal force-completed");
        Ok(())
    }

    /// Look up one request.
    #[must_use]
    pub fn request(&self, id: &WithdrawalId) -> Option<WithdrawalRequest> {
        self.state.lock().requests.get(id).cloned()
    }

    /// All requests ever made by an author, newest last.
    #[must_use]
    pub fn withdrawals_of(&self, author: &AccountId) -> Vec<WithdrawalRequest> {
        let state = self.state.lock();
        let mut requests: Vec<WithdrawalRequest> = state
            .requests
            .values()
            .filter(|r| r.author == *author)
            .cloned()
            .collect();
        requests.sort_by_key(|r| r.requested_at);
        requests
    }

    /// Whether the author's processing guard is currently held.
    #[must_use]
    pub fn is_processing(&self, author: &AccountId) -> bool {
        self.processing.lock().contains(author)
    }

    /// Number of authors currently undergoing processing.
    #[must_use]
    pub fn processing_count(&self) -> usize {
        self.processing.lock().len()
    }

    /// Aggregate withdrawal statistics for the admin surface.
    #[must_use]
    pub fn stats(&self) -> WithdrawalStats {
        let state = self.state.lock();
        let mut stats = WithdrawalStats::default();
        for request in state.requests.values() {
            match request.status {
                WithdrawalStatus::Pending => stats.pending += 1,
                WithdrawalStatus::Completed => {
                    stats.completed += 1;
                    stats.total_paid_out += request.amount;
                    stats.total_fees += request.fee;
                }
                WithdrawalStatus::Failed => stats.failed += 1,
                WithdrawalStatus::Cancelled => stats.cancelled += 1,
            }
        }
        stats
    }
}
