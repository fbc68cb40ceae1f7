//! # plugpay-purchase
//!
//! **Purchase Settlement**: the append-only per-(plugin, buyer) purchase
//! journal, the attempt state machine, and revenue-split settlement into
//! author balances.
//!
//! A `Pending` attempt is persisted before the ledger transfer is awaited,
//! so concurrent handlers observe in-flight purchases instead of racing them.

pub mod ledger;

pub use ledger::PurchaseLedger;
