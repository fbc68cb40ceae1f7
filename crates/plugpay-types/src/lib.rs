//! # plugpay-types
//!
//! Shared types, errors, and configuration for the **PlugPay** plugin-registry
//! payment core.
//!
//! This crate is the leaf dependency of the workspace — every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`AccountId`], [`PluginId`], [`PurchaseKey`], [`WithdrawalId`], [`BlockIndex`]
//! - **Purchase model**: [`PurchaseRecord`], [`PurchaseAttempt`], [`AttemptStatus`], [`PurchaseReceipt`]
//! - **Withdrawal model**: [`WithdrawalRequest`], [`WithdrawalStatus`], [`WithdrawalStats`]
//! - **Transfer model**: [`TransferArgs`], [`LedgerError`], [`TransferFailure`]
//! - **Catalog seam**: [`PluginCatalog`], [`PluginListing`]
//! - **Configuration**: [`PayoutConfig`], [`RevenueSplit`]
//! - **Errors**: [`PlugpayError`] with `PP_ERR_` prefix codes
//! - **Constants**: withdrawal limits, fees, cooldown, revenue split

pub mod catalog;
pub mod config;
pub mod constants;
pub mod error;
pub mod ids;
pub mod purchase;
pub mod transfer;
pub mod withdrawal;

// Re-export all primary types at crate root for ergonomic imports:
//   use plugpay_types::{PurchaseRecord, WithdrawalRequest, PlugpayError, ...};

pub use catalog::*;
pub use config::*;
pub use error::*;
pub use ids::*;
pub use purchase::*;
pub use transfer::*;
pub use withdrawal::*;

// Constants are accessed via `plugpay_types::constants::FOO`
// (not re-exported to avoid name collisions).
