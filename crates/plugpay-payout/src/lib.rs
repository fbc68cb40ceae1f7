//! # plugpay-payout
//!
//! **Withdrawal Processing**: the withdrawal request state machine, per-author
//! rate limiting, and the mutual-exclusion guard that keeps concurrent
//! processing of the same author's earnings from double-debiting.
//!
//! Requests are validated and recorded synchronously; processing suspends on
//! the external ledger transfer with the author's guard held, and releases it
//! on every exit path.

pub mod manager;

pub use manager::WithdrawalManager;
