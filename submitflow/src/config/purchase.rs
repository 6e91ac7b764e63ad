//! Configuration of the authenticated-purchase action.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A webhook notified after a successful purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookTarget {
    /// Destination URL.
    pub url: String,
    /// HTTP method.
    #[serde(default = "default_method")]
    pub method: String,
    /// Extra request headers.
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

fn default_method() -> String {
    "POST".to_string()
}

impl WebhookTarget {
    /// Creates a POST webhook target.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: default_method(),
            headers: HashMap::new(),
        }
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }
}

/// Backend item identifiers for the known placement choices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementItems {
    /// Item for story placements (`story` / `1`).
    #[serde(default = "default_story_item")]
    pub story: String,
    /// Item for five-day placements.
    #[serde(default = "default_five_item")]
    pub five: String,
    /// Item for ten-day placements.
    #[serde(default = "default_ten_item")]
    pub ten: String,
}

fn default_story_item() -> String {
    "sticky_story".to_string()
}

fn default_five_item() -> String {
    "sticky_5_days".to_string()
}

fn default_ten_item() -> String {
    "sticky_10_days".to_string()
}

impl Default for PlacementItems {
    fn default() -> Self {
        Self {
            story: default_story_item(),
            five: default_five_item(),
            ten: default_ten_item(),
        }
    }
}

/// Settings for the `purchase_authenticated` action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseAuthConfig {
    /// Whether a validated identity is required before purchasing.
    #[serde(default)]
    pub require_authentication: bool,
    /// Base URL of the identity collaborator.
    #[serde(default)]
    pub auth_api_base_url: String,
    /// Device id sent on login.
    #[serde(default)]
    pub device_id: String,
    /// Application signature registered with the marketplace.
    #[serde(default)]
    pub app_signature: String,
    /// App version sent on login.
    #[serde(default)]
    pub version_number: String,
    /// Upstream purchase API, passed to the purchase proxy.
    #[serde(default)]
    pub purchase_api_url: String,
    /// Answer field holding the listing id.
    #[serde(default = "default_adv_id_field")]
    pub adv_id_field: String,
    /// Answer field holding the placement choice.
    #[serde(default = "default_item_id_field")]
    pub item_id_field: String,
    /// Answer field holding the category id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id_field: Option<String>,
    /// Answer field holding the district id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district_id_field: Option<String>,
    /// Payment method requested from the purchase API.
    #[serde(default = "default_payment_method")]
    pub payment_method: String,
    /// Language for purchase-side messages.
    #[serde(default = "default_user_lang")]
    pub user_lang: String,
    /// Webhooks notified after a successful purchase.
    #[serde(default)]
    pub additional_webhooks: Vec<WebhookTarget>,
    /// Placement to item mapping.
    #[serde(default)]
    pub placement_items: PlacementItems,
}

fn default_adv_id_field() -> String {
    "adv_id".to_string()
}

fn default_item_id_field() -> String {
    "item_id".to_string()
}

fn default_payment_method() -> String {
    "CARD".to_string()
}

fn default_user_lang() -> String {
    "ar".to_string()
}

impl Default for PurchaseAuthConfig {
    fn default() -> Self {
        Self {
            require_authentication: false,
            auth_api_base_url: String::new(),
            device_id: String::new(),
            app_signature: String::new(),
            version_number: String::new(),
            purchase_api_url: String::new(),
            adv_id_field: default_adv_id_field(),
            item_id_field: default_item_id_field(),
            category_id_field: None,
            district_id_field: None,
            payment_method: default_payment_method(),
            user_lang: default_user_lang(),
            additional_webhooks: Vec::new(),
            placement_items: PlacementItems::default(),
        }
    }
}

impl PurchaseAuthConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requires an authenticated user.
    #[must_use]
    pub fn with_authentication(mut self, base_url: impl Into<String>) -> Self {
        self.require_authentication = true;
        self.auth_api_base_url = base_url.into();
        self
    }

    /// Sets the upstream purchase API URL.
    #[must_use]
    pub fn with_purchase_api_url(mut self, url: impl Into<String>) -> Self {
        self.purchase_api_url = url.into();
        self
    }

    /// Adds a post-purchase webhook.
    #[must_use]
    pub fn with_webhook(mut self, webhook: WebhookTarget) -> Self {
        self.additional_webhooks.push(webhook);
        self
    }

    /// App version sent on login, with the marketplace default.
    #[must_use]
    pub fn version_number_or_default(&self) -> &str {
        if self.version_number.is_empty() {
            "26.0.0"
        } else {
            &self.version_number
        }
    }
}
