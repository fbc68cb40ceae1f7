//! System-wide constants for the PlugPay payment core.
//!
//! All amounts are in the smallest currency unit.

/// Minimum amount an author may withdraw in one request.
pub const MIN_WITHDRAWAL: u64 = 100_000;

/// Maximum amount an author may withdraw in one request.
pub const MAX_WITHDRAWAL: u64 = 1_000_000_000;

/// Fixed fee debited on top of every completed withdrawal.
pub const WITHDRAWAL_FEE: u64 = 10_000;

/// Minimum elapsed time between two withdrawal requests by the same author.
/// Keyed off request time, not completion time.
pub const WITHDRAWAL_COOLDOWN_MS: i64 = 86_400_000; // 24h

/// Author's percentage of every completed purchase. The registry keeps the
/// remainder; integer truncation favors the registry.
pub const AUTHOR_SHARE_PERCENT: u64 = 70;

/// Memo prefix recorded on purchase transfers.
pub const PURCHASE_MEMO_PREFIX: &str = "plugpay:purchase:";

/// Memo prefix recorded on withdrawal transfers.
pub const WITHDRAWAL_MEMO_PREFIX: &str = "plugpay:withdrawal:";

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Registry name.
pub const REGISTRY_NAME: &str = "PlugPay";
