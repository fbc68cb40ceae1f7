//! Error types for the PlugPay payment core.
//!
//! All errors use the `PP_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Purchase errors
//! - 2xx: Balance errors
//! - 3xx: Withdrawal errors
//! - 4xx: Transfer errors
//! - 9xx: General / internal errors

use thiserror::Error;

use crate::{LedgerError, PluginId, TransferFailure};

/// Central error enum for all PlugPay operations.
#[derive(Debug, Error)]
pub enum PlugpayError {
    // =================================================================
    // Purchase Errors (1xx)
    // =================================================================
    /// The plugin is not listed in the catalog.
    #[error("PP_ERR_100: Plugin not found: {0}")]
    PluginNotFound(PluginId),

    /// The buyer already owns this plugin (last attempt Completed).
    #[error("PP_ERR_101: Plugin already purchased: {0}")]
    AlreadyPurchased(PluginId),

    /// The buyer has not purchased this plugin.
    #[error("PP_ERR_102: Plugin not purchased: {0}")]
    PluginNotPurchased(PluginId),

    /// The requested plugin version does not exist.
    #[error("PP_ERR_103: Invalid plugin version: {version}")]
    InvalidVersion { version: String },

    /// An attempt transition that the state machine forbids.
    #[error("PP_ERR_104: Invalid attempt transition: {from} -> {to}")]
    InvalidAttemptStatus { from: String, to: String },

    // =================================================================
    // Balance Errors (2xx)
    // =================================================================
    /// Not enough accrued balance for the operation.
    #[error("PP_ERR_200: Insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: u64, available: u64 },

    /// A debit would take a balance below zero.
    #[error("PP_ERR_201: Balance underflow")]
    BalanceUnderflow,

    // =================================================================
    // Withdrawal Errors (3xx)
    // =================================================================
    /// Withdrawal amount is below the configured minimum.
    #[error("PP_ERR_300: Withdrawal {amount} below minimum {minimum}")]
    BelowMinimum { amount: u64, minimum: u64 },

    /// Withdrawal amount is above the configured maximum.
    #[error("PP_ERR_301: Withdrawal {amount} above maximum {maximum}")]
    AboveMaximum { amount: u64, maximum: u64 },

    /// The author's withdrawal cooldown has not elapsed.
    #[error("PP_ERR_302: Cooldown active: {remaining_ms}ms remaining")]
    CooldownActive { remaining_ms: i64 },

    /// Another operation is in flight for the same subject
    /// (a pending purchase attempt, or an author's withdrawal being processed).
    #[error("PP_ERR_303: Already processing")]
    AlreadyProcessing,

    /// The request is not in the status the operation requires.
    #[error("PP_ERR_304: Invalid status: expected {expected}, got {actual}")]
    InvalidStatus { expected: String, actual: String },

    /// The caller is not allowed to perform this operation.
    #[error("PP_ERR_305: Unauthorized access")]
    UnauthorizedAccess,

    // =================================================================
    // Transfer Errors (4xx)
    // =================================================================
    /// The ledger completed the call and reported a transfer failure.
    #[error("PP_ERR_400: Transfer failed: {0}")]
    TransferFailed(LedgerError),

    /// The ledger call was rejected before producing a reply.
    #[error("PP_ERR_401: Async call failed: {0}")]
    AsyncCallFailed(String),

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// The referenced entity does not exist.
    #[error("PP_ERR_900: Not found: {0}")]
    NotFound(String),

    /// Unrecoverable internal error.
    #[error("PP_ERR_901: Internal error: {0}")]
    Internal(String),

    /// Serialization / deserialization error.
    #[error("PP_ERR_902: Serialization error: {0}")]
    Serialization(String),
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, PlugpayError>;

// The two transfer-failure layers map onto the two transfer error kinds.
impl From<TransferFailure> for PlugpayError {
    fn from(failure: TransferFailure) -> Self {
        match failure {
            TransferFailure::CallRejected(reason) => Self::AsyncCallFailed(reason),
            TransferFailure::Ledger(err) => Self::TransferFailed(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_contains_prefix() {
        let err = PlugpayError::PluginNotFound(PluginId::new("a.b.c"));
        let msg = format!("{err}");
        assert!(msg.starts_with("PP_ERR_100"), "Got: {msg}");
    }

    #[test]
    fn insufficient_funds_reports_both_amounts() {
        let err = PlugpayError::InsufficientFunds {
            required: 110,
            available: 50,
        };
        let msg = format!("{err}");
        assert!(msg.contains("PP_ERR_200"));
        assert!(msg.contains("110"));
        assert!(msg.contains("50"));
    }

    #[test]
    fn cooldown_reports_remaining() {
        let err = PlugpayError::CooldownActive { remaining_ms: 3600 };
        assert!(format!("{err}").contains("3600ms"));
    }

    #[test]
    fn transfer_failure_maps_by_layer() {
        let call: PlugpayError = TransferFailure::CallRejected("boom".into()).into();
        assert!(matches!(call, PlugpayError::AsyncCallFailed(_)));

        let ledger: PlugpayError = TransferFailure::Ledger(LedgerError::TooOld).into();
        assert!(matches!(ledger, PlugpayError::TransferFailed(LedgerError::TooOld)));
    }

    #[test]
    fn all_errors_have_pp_err_prefix() {
        let errors: Vec<Box<dyn std::error::Error>> = vec![
            Box::new(PlugpayError::AlreadyProcessing),
            Box::new(PlugpayError::BalanceUnderflow),
            Box::new(PlugpayError::UnauthorizedAccess),
            Box::new(PlugpayError::Internal("test".into())),
            Box::new(PlugpayError::InvalidStatus {
                expected: "PENDING".into(),
                actual: "COMPLETED".into(),
            }),
        ];
        for err in errors {
            let msg = format!("{err}");
            assert!(
                msg.starts_with("PP_ERR_"),
                "Error missing PP_ERR_ prefix: {msg}"
            );
        }
    }
}
