//! Content records - cached extraction results.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::types::identity::UrlIdentity;

/// Default freshness window for content records.
pub const DEFAULT_CONTENT_TTL_DAYS: i64 = 30;

/// One extracted line item (e.g. "2 cups flour").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    /// Quantity, if the source gave one
    pub amount: Option<Decimal>,

    /// Unit of the amount, if any
    pub unit: Option<String>,

    /// What the item is; never blank
    pub label: String,
}

impl ContentItem {
    /// Create an item. The label must not be blank.
    pub fn new(
        amount: Option<Decimal>,
        unit: Option<String>,
        label: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let label = label.into();
        if label.trim().is_empty() {
            return Err(ValidationError::BlankItemLabel);
        }
        Ok(Self {
            amount,
            unit,
            label,
        })
    }

    /// Item with only a label (e.g. "salt to taste").
    pub fn labeled(label: impl Into<String>) -> Result<Self, ValidationError> {
        Self::new(None, None, label)
    }

    /// Human-readable rendering, e.g. `"2 cups flour"`.
    pub fn display(&self) -> String {
        let mut parts: Vec<String> = Vec::with_capacity(3);
        if let Some(amount) = self.amount {
            parts.push(amount.normalize().to_string());
        }
        if let Some(unit) = self.unit.as_deref().filter(|u| !u.trim().is_empty()) {
            parts.push(unit.to_string());
        }
        parts.push(self.label.clone());
        parts.join(" ").trim().to_string()
    }
}

/// Cached extraction result for one URL identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRecord {
    pub identity: UrlIdentity,
    pub title: Option<String>,
    pub items: Vec<ContentItem>,
    pub produced_at: DateTime<Utc>,
}

impl ContentRecord {
    /// Record produced now.
    pub fn new(identity: UrlIdentity, title: Option<String>, items: Vec<ContentItem>) -> Self {
        Self {
            identity,
            title,
            items,
            produced_at: Utc::now(),
        }
    }

    /// Set the production timestamp.
    pub fn with_produced_at(mut self, produced_at: DateTime<Utc>) -> Self {
        self.produced_at = produced_at;
        self
    }

    /// `true` while the record is younger than `ttl` at `now`.
    ///
    /// A record exactly `ttl` old is stale.
    pub fn is_fresh_at(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        now - self.produced_at < ttl
    }

    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.is_fresh_at(ttl, Utc::now())
    }
}
