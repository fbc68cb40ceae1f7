//! Transfer arguments and failure layers for the external ledger service.
//!
//! A transfer can fail at two distinguishable layers:
//!
//! 1. **Call layer** — the call never produced a reply (network failure,
//!    call rejection). Modeled as [`TransferFailure::CallRejected`].
//! 2. **Ledger layer** — the call completed and the ledger reported a typed
//!    failure. Modeled as [`TransferFailure::Ledger`] wrapping [`LedgerError`].
//!
//! The third outcome is success: the block index in which the transfer landed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{AccountId, BlockIndex};

/// Arguments for one ledger transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferArgs {
    /// Account the funds leave.
    pub from: AccountId,
    /// Account the funds arrive at.
    pub to: AccountId,
    /// Amount in the smallest currency unit.
    pub amount: u64,
    /// Free-form memo recorded with the transfer.
    pub memo: String,
    /// When the caller created the transfer.
    pub created_at: DateTime<Utc>,
}

/// A failure the ledger itself reported after the call completed.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum LedgerError {
    /// The payer's ledger balance cannot cover the transfer.
    #[error("ledger balance too low: {balance}")]
    InsufficientFunds { balance: u64 },

    /// The fee attached to the transfer didn't match the ledger's fee.
    #[error("bad fee, ledger expects {expected_fee}")]
    BadFee { expected_fee: u64 },

    /// The transfer's `created_at` is outside the ledger's accepted window.
    #[error("transfer too old")]
    TooOld,

    /// The ledger already processed an identical transfer.
    #[error("duplicate of block {of}")]
    Duplicate { of: BlockIndex },

    /// Any other ledger-reported failure.
    #[error("{0}")]
    Other(String),
}

/// Why a [`TransferArgs`] did not land in a block.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferFailure {
    /// The call itself was rejected before the ledger produced a reply.
    /// No statement about the transfer's fate can be made from this alone.
    #[error("ledger call rejected: {0}")]
    CallRejected(String),

    /// The call completed and the ledger reported a failure.
    /// The transfer definitively did not happen.
    #[error("ledger reported: {0}")]
    Ledger(LedgerError),
}
