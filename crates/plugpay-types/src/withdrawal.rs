//! # Withdrawal request types
//!
//! ## State Machine
//!
//! ```text
//!                ┌───────────┐
//!     ┌─────────▶│ COMPLETED │
//!     │          └───────────┘
//! ┌───┴─────┐    ┌────────┐
//! │ PENDING ├───▶│ FAILED │
//! └───┬─────┘    └────────┘
//!     │          ┌───────────┐
//!     └─────────▶│ CANCELLED │
//!                └───────────┘
//! ```
//!
//! All three exits are terminal. A terminal request is never mutated again,
//! with one sanctioned exception: the operator emergency override
//! ([`WithdrawalRequest::force_status`]).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AccountId, PlugpayError, Result, WithdrawalId};

/// The lifecycle state of a withdrawal request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WithdrawalStatus {
    /// Requested, not yet processed. The only state that can be
    /// processed or cancelled.
    Pending,
    /// The transfer landed and the balance was debited.
    Completed,
    /// Processing failed; the balance was left untouched.
    Failed,
    /// The author cancelled before processing picked the request up.
    Cancelled,
}

impl WithdrawalStatus {
    /// Can this status transition to the given target?
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        matches!(
            (self, target),
            (
                Self::Pending,
                Self::Completed | Self::Failed | Self::Cancelled
            )
        )
    }

    /// Whether the request has reached a final state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl std::fmt::Display for WithdrawalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Failed => write!(f, "FAILED"),
            Self::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// An author's request to withdraw accrued earnings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalRequest {
    /// Unique id derived from author + request time.
    pub id: WithdrawalId,
    /// The author withdrawing earnings.
    pub author: AccountId,
    /// Amount to transfer, in the smallest currency unit (fee not included).
    pub amount: u64,
    /// Fixed processing fee, debited on top of `amount`.
    pub fee: u64,
    /// Where the funds go.
    pub recipient: AccountId,
    /// When the request was created (also the rate-limit clock stamp).
    pub requested_at: DateTime<Utc>,
    /// Current lifecycle state.
    pub status: WithdrawalStatus,
    /// When processing resolved the request, if it has.
    pub processed_at: Option<DateTime<Utc>>,
    /// Why processing failed, if it did.
    pub error_message: Option<String>,
}

impl WithdrawalRequest {
    /// Create a new request in `Pending` state.
    #[must_use]
    pub fn new(
        id: WithdrawalId,
        author: AccountId,
        amount: u64,
        fee: u64,
        recipient: AccountId,
        requested_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            author,
            amount,
            fee,
            recipient,
            requested_at,
            status: WithdrawalStatus::Pending,
            processed_at: None,
            error_message: None,
        }
    }

    /// Total the author's balance must cover: amount plus fee.
    #[must_use]
    pub fn total_debit(&self) -> u64 {
        self.amount + self.fee
    }

    fn transition(&mut self, target: WithdrawalStatus) -> Result<()> {
        if !self.status.can_transition_to(target) {
            return Err(PlugpayError::InvalidStatus {
                expected: WithdrawalStatus::Pending.to_string(),
                actual: self.status.to_string(),
            });
        }
        self.status = target;
        Ok(())
    }

    /// Resolve the request as completed.
    ///
    /// # Errors
    /// Returns `InvalidStatus` if the request is not `Pending`.
    pub fn mark_completed(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.transition(WithdrawalStatus::Completed)?;
        self.processed_at = Some(now);
        Ok(())
    }

    /// Resolve the request as failed, recording the reason.
    ///
    /// # Errors
    /// Returns `InvalidStatus` if the request is not `Pending`.
    pub fn mark_failed(&mut self, reason: impl Into<String>, now: DateTime<Utc>) -> Result<()> {
        self.transition(WithdrawalStatus::Failed)?;
        self.processed_at = Some(now);
        self.error_message = Some(reason.into());
        Ok(())
    }

    /// Cancel the request.
    ///
    /// # Errors
    /// Returns `InvalidStatus` if the request is not `Pending`.
    pub fn mark_cancelled(&mut self) -> Result<()> {
        self.transition(WithdrawalStatus::Cancelled)
    }

    /// Emergency override: set the status without a transition check.
    ///
    /// This is the only way a terminal request can change, reserved for
    /// operator recovery of a stuck request.
    pub fn force_status(
        &mut self,
        status: WithdrawalStatus,
        error_message: Option<String>,
        now: DateTime<Utc>,
    ) {
        self.status = status;
        self.processed_at = Some(now);
        self.error_message = error_message;
    }
}

/// Aggregate withdrawal statistics for the admin surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalStats {
    /// Requests awaiting processing.
    pub pending: usize,
    /// Requests that completed.
    pub completed: usize,
    /// Requests that failed during processing.
    pub failed: usize,
    /// Requests cancelled by their author.
    pub cancelled: usize,
    /// Sum of completed withdrawal amounts (fees excluded).
    pub total_paid_out: u64,
    /// Sum of fees collected on completed withdrawals.
    pub total_fees: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_request() -> WithdrawalRequest {
        let author = AccountId([5u8; 32]);
        let now = Utc::now();
        WithdrawalRequest::new(
            WithdrawalId::derive(&author, now.timestamp_millis(), 0),
            author,
            1_000,
            10,
            AccountId([6u8; 32]),
            now,
        )
    }

    #[test]
    fn pending_exits_three_ways() {
        assert!(WithdrawalStatus::Pending.can_transition_to(WithdrawalStatus::Completed));
        assert!(WithdrawalStatus::Pending.can_transition_to(WithdrawalStatus::Failed));
        assert!(WithdrawalStatus::Pending.can_transition_to(WithdrawalStatus::Cancelled));
    }

    #[test]
    fn terminal_states_are_final() {
        for status in [
            WithdrawalStatus::Completed,
            WithdrawalStatus::Failed,
            WithdrawalStatus::Cancelled,
        ] {
            assert!(status.is_terminal());
            assert!(!status.can_transition_to(WithdrawalStatus::Pending));
            assert!(!status.can_transition_to(WithdrawalStatus::Completed));
        }
    }

    #[test]
    fn total_debit_includes_fee() {
        let req = make_request();
        assert_eq!(req.total_debit(), 1_010);
    }

    #[test]
    fn mark_completed_stamps_processed_at() {
        let mut req = make_request();
        let now = Utc::now();
        req.mark_completed(now).unwrap();
        assert_eq!(req.status, WithdrawalStatus::Completed);
        assert_eq!(req.processed_at, Some(now));
        assert!(req.error_message.is_none());
    }

    #[test]
    fn mark_failed_records_reason() {
        let mut req = make_request();
        req.mark_failed("ledger call rejected", Utc::now()).unwrap();
        assert_eq!(req.status, WithdrawalStatus::Failed);
        assert_eq!(req.error_message.as_deref(), Some("ledger call rejected"));
    }

    #[test]
    fn cancel_after_completion_blocked() {
        let mut req = make_request();
        req.mark_completed(Utc::now()).unwrap();
        let err = req.mark_cancelled().unwrap_err();
        assert!(matches!(err, PlugpayError::InvalidStatus { .. }));
    }

    #[test]
    fn force_status_overrides_terminal() {
        let mut req = make_request();
        req.mark_failed("stuck", Utc::now()).unwrap();
        // Normal transitions are blocked, the override is not.
        req.force_status(WithdrawalStatus::Completed, None, Utc::now());
        assert_eq!(req.status, WithdrawalStatus::Completed);
        assert!(req.error_message.is_none());
    }

    #[test]
    fn serde_roundtrip() {
        let req = make_request();
        let json = serde_json::to_string(&req).unwrap();
        let back: WithdrawalRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, req.id);
        assert_eq!(back.status, WithdrawalStatus::Pending);
        assert_eq!(back.total_debit(), req.total_debit());
    }
}
