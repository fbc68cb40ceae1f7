//! # plugpay-ledger
//!
//! The external ledger-service seam for the PlugPay payment core.
//!
//! The ledger is an opaque, asynchronous collaborator with exactly one
//! operation: [`LedgerClient::transfer`]. The purchase ledger and the
//! withdrawal manager are its only consumers, and awaiting it is the only
//! place a handler suspends.
//!
//! [`MockLedger`] (behind the `test-helpers` feature) scripts outcomes and
//! can hold a transfer in flight so tests can interleave other handlers
//! deterministically.

pub mod client;
#[cfg(any(test, feature = "test-helpers"))]
pub mod mock;

pub use client::LedgerClient;
#[cfg(any(test, feature = "test-helpers"))]
pub use mock::{MockLedger, MockOutcome};
