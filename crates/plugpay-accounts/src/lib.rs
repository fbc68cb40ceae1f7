//! # plugpay-accounts
//!
//! **Balance Accounting**: per-author accrued earnings for the PlugPay
//! payment core. Mutated only by the purchase ledger (credit on completed
//! purchase) and the withdrawal manager (debit on completed withdrawal).

pub mod balance_book;

pub use balance_book::BalanceBook;
