//! The plugin catalog seam.
//!
//! The catalog (create/list/version plugins) lives outside the payment core;
//! the purchase ledger only needs a plugin's current price and author. A
//! missing plugin means the ledger is never called.

use serde::{Deserialize, Serialize};

use crate::{AccountId, PluginId};

/// What the purchase ledger needs to know about a listed plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginListing {
    /// Current published version (e.g., `"1.4.2"`).
    pub version: String,
    /// Price in the smallest currency unit. Zero means free.
    pub price: u64,
    /// The author credited on every completed purchase.
    pub author: AccountId,
}

/// Read-only view of the plugin catalog.
pub trait PluginCatalog {
    /// Look up a plugin's current listing. `None` if the plugin is not listed.
    fn get_plugin(&self, plugin_id: &PluginId) -> Option<PluginListing>;
}

/// Simple map-backed catalog for tests. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    listings: std::collections::HashMap<PluginId, PluginListing>,
}

#[cfg(any(test, feature = "test-helpers"))]
impl InMemoryCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// List a plugin at the given price.
    pub fn publish(&mut self, plugin_id: PluginId, version: &str, price: u64, author: AccountId) {
        self.listings.insert(
            plugin_id,
            PluginListing {
                version: version.to_string(),
                price,
                author,
            },
        );
    }
}

#[cfg(any(test, feature = "test-helpers"))]
impl PluginCatalog for InMemoryCatalog {
    fn get_plugin(&self, plugin_id: &PluginId) -> Option<PluginListing> {
        self.listings.get(plugin_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_plugin_is_none() {
        let catalog = InMemoryCatalog::new();
        assert!(catalog.get_plugin(&PluginId::new("no.such.plugin")).is_none());
    }

    #[test]
    fn published_plugin_is_listed() {
        let mut catalog = InMemoryCatalog::new();
        let author = AccountId([4u8; 32]);
        catalog.publish(PluginId::new("dev.plugpay.linter"), "1.0.0", 100, author);

        let listing = catalog
            .get_plugin(&PluginId::new("dev.plugpay.linter"))
            .unwrap();
        assert_eq!(listing.price, 100);
        assert_eq!(listing.author, author);
        assert_eq!(listing.version, "1.0.0");
    }
}
