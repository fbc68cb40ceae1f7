//! Identifiers used throughout PlugPay.
//!
//! Account identifiers are raw 32-byte values (the payment network's account
//! representation). Purchase and withdrawal keys are derived deterministically
//! with SHA-256 so the same logical entity always maps to the same key.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Index of the ledger block in which a transfer landed.
pub type BlockIndex = u64;

// ---------------------------------------------------------------------------
// AccountId
// ---------------------------------------------------------------------------

/// A payment-network account: buyer, payer, author, or withdrawal recipient.
/// Raw 32-byte account identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct AccountId(pub [u8; 32]);

impl AccountId {
    #[must_use]
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "acct:{}", hex::encode(&self.0[..8]))
    }
}

/// Random accounts for testing. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
impl AccountId {
    /// Create a random account id for unit tests.
    #[must_use]
    pub fn random() -> Self {
        Self(rand::random::<[u8; 32]>())
    }
}

// ---------------------------------------------------------------------------
// PluginId
// ---------------------------------------------------------------------------

/// Identifier of a published plugin (e.g., `"dev.plugpay.linter"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct PluginId(pub String);

impl PluginId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PluginId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// PurchaseKey
// ---------------------------------------------------------------------------

/// Deterministic key for a purchase record: at most one record exists per
/// (plugin, buyer) pair, ever. Repeat attempts append to the same record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct PurchaseKey(pub Uuid);

impl PurchaseKey {
    /// Derive the key for a (plugin, buyer) pair.
    ///
    /// Every caller derives the **exact same** key for the same pair, which
    /// is what collapses all attempts for one pair into one journal.
    #[must_use]
    pub fn derive(plugin_id: &PluginId, buyer: &AccountId) -> Self {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(b"plugpay:purchase_key:v1:");
        hasher.update(plugin_id.as_str().as_bytes());
        hasher.update(buyer.as_bytes());
        let hash = hasher.finalize();
        let bytes: [u8; 16] = hash[..16].try_into().expect("SHA-256 produces 32 bytes");
        Self(Uuid::from_bytes(bytes))
    }
}

impl fmt::Display for PurchaseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pk:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// WithdrawalId
// ---------------------------------------------------------------------------

/// Unique identifier for a withdrawal request, derived from the author and
/// the request time. The sequence number disambiguates requests created in
/// the same millisecond.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct WithdrawalId(pub Uuid);

impl WithdrawalId {
    #[must_use]
    pub fn derive(author: &AccountId, requested_at_ms: i64, sequence: u64) -> Self {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(b"plugpay:withdrawal_id:v1:");
        hasher.update(author.as_bytes());
        hasher.update(requested_at_ms.to_le_bytes());
        hasher.update(sequence.to_le_bytes());
        let hash = hasher.finalize();
        let bytes: [u8; 16] = hash[..16].try_into().expect("SHA-256 produces 32 bytes");
        Self(Uuid::from_bytes(bytes))
    }
}

impl fmt::Display for WithdrawalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "wd:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
